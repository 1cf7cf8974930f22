#[derive(Debug, Clone, PartialEq)]
pub struct StatsEntry {
    pub sent: u64,
    pub received: u64,
    pub rtt_sum: f64,
    pub min_rtt: f64,
    pub max_rtt: f64,
}

impl Default for StatsEntry {
    fn default() -> Self {
        StatsEntry { sent: 0, received: 0, rtt_sum: 0.0, min_rtt: f64::INFINITY, max_rtt: 0.0 }
    }
}

impl StatsEntry {
    pub fn record_sent(&mut self) {
        self.sent += 1;
    }

    pub fn record_reply(&mut self, rtt_ms: f64) {
        self.received += 1;
        self.rtt_sum += rtt_ms;
        self.min_rtt = self.min_rtt.min(rtt_ms);
        self.max_rtt = self.max_rtt.max(rtt_ms);
    }

    /// Goes negative when more replies than probes were counted, e.g. on
    /// loopback where our own echo requests come back with a matching
    /// identifier.
    pub fn loss_percent(&self) -> f64 {
        if self.sent == 0 {
            0.0
        } else {
            100.0 * (1.0 - self.received as f64 / self.sent as f64)
        }
    }

    pub fn average_rtt(&self) -> Option<f64> {
        (self.received > 0).then(|| self.rtt_sum / self.received as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_entry() {
        let stats = StatsEntry::default();
        assert_eq!(stats.loss_percent(), 0.0);
        assert_eq!(stats.average_rtt(), None);
        assert!(stats.min_rtt.is_infinite());
        assert_eq!(stats.max_rtt, 0.0);
    }

    #[test]
    fn aggregates_replies() {
        let mut stats = StatsEntry::default();
        for _ in 0..10 {
            stats.record_sent();
        }
        for rtt in [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0] {
            stats.record_reply(rtt);
        }

        assert_eq!(stats.sent, 10);
        assert_eq!(stats.received, 8);
        assert!((stats.loss_percent() - 20.0).abs() < 1e-9);
        assert_eq!(stats.min_rtt, 10.0);
        assert_eq!(stats.max_rtt, 80.0);
        assert_eq!(stats.average_rtt(), Some(45.0));
    }

    #[test]
    fn surplus_replies_give_negative_loss() {
        let mut stats = StatsEntry::default();
        stats.record_sent();
        stats.record_sent();
        for rtt in [1.0, 1.0, 2.0, 2.0] {
            stats.record_reply(rtt);
        }
        assert_eq!(stats.loss_percent(), -100.0);
        assert_eq!(stats.average_rtt(), Some(1.5));
    }

    #[test]
    fn total_loss() {
        let mut stats = StatsEntry::default();
        stats.record_sent();
        stats.record_sent();
        assert_eq!(stats.loss_percent(), 100.0);
    }
}
