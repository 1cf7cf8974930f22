use std::net::Ipv4Addr;
use std::time::Duration;

/// Outcome of feeding one measured reply into a host's classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Normal,
    Down,
    /// `elapsed` since the host went down.
    StillDown { elapsed: Duration },
    Recovered { downtime: Duration },
}

#[derive(Debug, Clone)]
pub struct HostRecord {
    pub name: String,
    pub ip: Ipv4Addr,
    sequence: u16,
    last_sent: Option<Duration>,
    failing: bool,
    failing_since: f64,
}

impl HostRecord {
    pub fn new(name: impl Into<String>, ip: Ipv4Addr) -> Self {
        HostRecord { name: name.into(), ip, sequence: 1, last_sent: None, failing: false, failing_since: 0.0 }
    }

    /// Sequence number the next probe will carry.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn is_failing(&self) -> bool {
        self.failing
    }

    /// Wall-clock time the host went down, if it is down.
    pub fn failing_since(&self) -> Option<f64> {
        self.failing.then_some(self.failing_since)
    }

    pub fn is_due(&self, now: Duration, interval: Duration) -> bool {
        match self.last_sent {
            Some(last) => now.saturating_sub(last) >= interval,
            None => true,
        }
    }

    /// Time left until a probe is due; zero when it already is.
    pub fn due_in(&self, now: Duration, interval: Duration) -> Duration {
        match self.last_sent {
            Some(last) => interval.saturating_sub(now.saturating_sub(last)),
            None => Duration::ZERO,
        }
    }

    pub fn mark_sent(&mut self, now: Duration) {
        self.last_sent = Some(now);
        self.sequence = self.sequence.wrapping_add(1);
    }

    /// Holds the next attempt back by one interval after a failed send,
    /// without consuming a sequence number.
    pub fn defer(&mut self, now: Duration) {
        self.last_sent = Some(now);
    }

    /// Applies the up/down hysteresis to a reply with a known RTT.
    /// `now` is wall-clock seconds.
    pub fn classify(&mut self, rtt_ms: f64, threshold_ms: f64, now: f64) -> Transition {
        match (self.failing, rtt_ms > threshold_ms) {
            (false, false) => Transition::Normal,
            (false, true) => {
                self.failing = true;
                self.failing_since = now;
                Transition::Down
            }
            (true, true) => Transition::StillDown { elapsed: since(self.failing_since, now) },
            (true, false) => {
                self.failing = false;
                Transition::Recovered { downtime: since(self.failing_since, now) }
            }
        }
    }
}

fn since(start: f64, now: f64) -> Duration {
    Duration::try_from_secs_f64(now - start).unwrap_or(Duration::ZERO)
}
