use crate::host::{HostRecord, Transition};
use crate::messages::MonitorEvent;
use crate::stats::StatsEntry;
use crossterm::style::Print;
use crossterm::{cursor, terminal, QueueableCommand};
use std::io::{self, Write};

pub trait OutputSink {
    /// Writes a complete line, replacing any pending in-place line.
    fn append_line(&mut self, line: &str) -> io::Result<()>;
    /// Replaces the current line in place without ending it.
    fn overwrite_line(&mut self, line: &str) -> io::Result<()>;
}

/// Renders lines on a terminal, using cursor control for in-place updates.
pub struct TerminalSink<W: Write> {
    out: W,
    overwriting: bool,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        TerminalSink { out, overwriting: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn clear_line(&mut self) -> io::Result<()> {
        self.out.queue(cursor::MoveToColumn(0))?;
        self.out.queue(terminal::Clear(terminal::ClearType::CurrentLine))?;
        Ok(())
    }
}

impl<W: Write> OutputSink for TerminalSink<W> {
    fn append_line(&mut self, line: &str) -> io::Result<()> {
        if self.overwriting {
            self.clear_line()?;
            self.overwriting = false;
        }
        self.out.queue(Print(line))?;
        self.out.queue(Print("\n"))?;
        self.out.flush()
    }

    fn overwrite_line(&mut self, line: &str) -> io::Result<()> {
        self.clear_line()?;
        self.out.queue(Print(line))?;
        self.overwriting = true;
        self.out.flush()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Append(String),
    Overwrite(String),
}

/// Turns monitor events into status lines.
pub struct Reporter<O: OutputSink> {
    sink: O,
    threshold_ms: f64,
    verbose: bool,
}

impl<O: OutputSink> Reporter<O> {
    pub fn new(sink: O, threshold_ms: f64, verbose: bool) -> Self {
        Reporter { sink, threshold_ms, verbose }
    }

    pub fn into_sink(self) -> O {
        self.sink
    }

    pub fn banner<'a>(&mut self, identifier: u16, hosts: impl IntoIterator<Item = &'a HostRecord>) -> io::Result<()> {
        let hosts = hosts
            .into_iter()
            .map(|h| format!("{}/{}", h.name, h.ip))
            .collect::<Vec<String>>()
            .join(", ");
        self.sink.append_line(&format!("PID: {identifier}, Monitoring hosts: {hosts}"))
    }

    pub fn report(&mut self, event: &MonitorEvent) -> io::Result<()> {
        match self.format(event, &timestamp()) {
            Some(Line::Append(line)) => self.sink.append_line(&line),
            Some(Line::Overwrite(line)) => self.sink.overwrite_line(&line),
            None => Ok(()),
        }
    }

    /// Formats `event` stamped with `ts`; `None` when the event is hidden at
    /// the current verbosity.
    pub fn format(&self, event: &MonitorEvent, ts: &str) -> Option<Line> {
        let threshold = self.threshold_ms;
        let line = match event {
            MonitorEvent::Reply { name, ip, sequence, rtt_ms, transition } => {
                let output = format!("[{ts}] [{name}/{ip}] icmp_seq={sequence} time={rtt_ms:.2} ms");
                match transition {
                    Transition::Normal if self.verbose => Line::Append(output),
                    Transition::Normal => return None,
                    Transition::Down => Line::Append(format!("{output} DOWN (threshold={threshold} ms)")),
                    Transition::StillDown { elapsed } => Line::Overwrite(format!(
                        "{output} Missing pings. Down for {:.6} secs",
                        elapsed.as_secs_f64()
                    )),
                    Transition::Recovered { downtime } => Line::Append(format!(
                        "{output} UP (recovered<={threshold} ms, down for {:.6} secs)",
                        downtime.as_secs_f64()
                    )),
                }
            }
            MonitorEvent::NoRtt { name, ip, sequence } => {
                Line::Append(format!("[{ts}] [{name}/{ip}] icmp_seq={sequence} received (no RTT info)"))
            }
            MonitorEvent::SendFailed { name, ip, error } => Line::Append(format!("[{ts}] [{name}/{ip}] Send failed: {error}")),
            MonitorEvent::ShortSend { sent, expected } => {
                Line::Append(format!("Warning: Only sent {sent} of {expected} bytes"))
            }
            MonitorEvent::ReceiveError { error } => Line::Append(format!("[{ts}] Receive error: {error}")),
        };
        Some(line)
    }

    /// Final per-host statistics, printed once the loop has stopped.
    pub fn summary<'a>(&mut self, entries: impl IntoIterator<Item = (&'a HostRecord, &'a StatsEntry)>) -> io::Result<()> {
        self.sink.append_line("")?;
        self.sink.append_line("--- Ping statistics ---")?;
        for (host, stats) in entries {
            for line in summary_lines(host, stats) {
                self.sink.append_line(&line)?;
            }
        }
        self.sink.append_line("")?;
        self.sink.append_line("Exiting...")
    }
}

pub fn summary_lines(host: &HostRecord, stats: &StatsEntry) -> Vec<String> {
    let mut lines = vec![
        format!("{} ({}):", host.name, host.ip),
        format!(
            "  {} packets transmitted, {} received, {:.1}% packet loss",
            stats.sent,
            stats.received,
            stats.loss_percent()
        ),
    ];
    if let Some(avg) = stats.average_rtt() {
        lines.push(format!("  rtt min/avg/max = {:.3}/{:.3}/{:.3} ms", stats.min_rtt, avg, stats.max_rtt));
    }
    lines
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    const TS: &str = "2024-01-02 03:04:05";

    fn reply(transition: Transition) -> MonitorEvent {
        MonitorEvent::Reply {
            name: "gw".to_string(),
            ip: Ipv4Addr::new(10, 0, 0, 1),
            sequence: 4,
            rtt_ms: 150.256,
            transition,
        }
    }

    fn reporter(verbose: bool) -> Reporter<TerminalSink<Vec<u8>>> {
        Reporter::new(TerminalSink::new(Vec::new()), 100.0, verbose)
    }

    #[test]
    fn normal_replies_need_verbose() {
        assert_eq!(reporter(false).format(&reply(Transition::Normal), TS), None);
        assert_eq!(
            reporter(true).format(&reply(Transition::Normal), TS),
            Some(Line::Append("[2024-01-02 03:04:05] [gw/10.0.0.1] icmp_seq=4 time=150.26 ms".to_string()))
        );
    }

    #[test]
    fn state_changes_always_print() {
        let reporter = reporter(false);
        assert_eq!(
            reporter.format(&reply(Transition::Down), TS),
            Some(Line::Append(
                "[2024-01-02 03:04:05] [gw/10.0.0.1] icmp_seq=4 time=150.26 ms DOWN (threshold=100 ms)".to_string()
            ))
        );
        assert_eq!(
            reporter.format(&reply(Transition::StillDown { elapsed: Duration::from_millis(2500) }), TS),
            Some(Line::Overwrite(
                "[2024-01-02 03:04:05] [gw/10.0.0.1] icmp_seq=4 time=150.26 ms Missing pings. Down for 2.500000 secs"
                    .to_string()
            ))
        );
        assert_eq!(
            reporter.format(&reply(Transition::Recovered { downtime: Duration::from_secs(3) }), TS),
            Some(Line::Append(
                "[2024-01-02 03:04:05] [gw/10.0.0.1] icmp_seq=4 time=150.26 ms UP (recovered<=100 ms, down for 3.000000 secs)"
                    .to_string()
            ))
        );
    }

    #[test]
    fn failures_print_with_context() {
        let reporter = reporter(false);
        let event = MonitorEvent::SendFailed {
            name: "gw".to_string(),
            ip: Ipv4Addr::new(10, 0, 0, 1),
            error: "Network is unreachable".to_string(),
        };
        assert_eq!(
            reporter.format(&event, TS),
            Some(Line::Append("[2024-01-02 03:04:05] [gw/10.0.0.1] Send failed: Network is unreachable".to_string()))
        );
        assert_eq!(
            reporter.format(&MonitorEvent::ShortSend { sent: 10, expected: 64 }, TS),
            Some(Line::Append("Warning: Only sent 10 of 64 bytes".to_string()))
        );
        let no_rtt = MonitorEvent::NoRtt { name: "gw".to_string(), ip: Ipv4Addr::new(10, 0, 0, 1), sequence: 9 };
        assert_eq!(
            reporter.format(&no_rtt, TS),
            Some(Line::Append("[2024-01-02 03:04:05] [gw/10.0.0.1] icmp_seq=9 received (no RTT info)".to_string()))
        );
    }

    #[test]
    fn summary_lines_include_rtt_only_with_replies() {
        let host = HostRecord::new("gw", Ipv4Addr::new(10, 0, 0, 1));
        let mut stats = StatsEntry::default();
        stats.record_sent();
        stats.record_sent();
        assert_eq!(
            summary_lines(&host, &stats),
            vec!["gw (10.0.0.1):", "  2 packets transmitted, 0 received, 100.0% packet loss"]
        );

        stats.record_reply(10.0);
        stats.record_reply(30.0);
        assert_eq!(
            summary_lines(&host, &stats),
            vec![
                "gw (10.0.0.1):",
                "  2 packets transmitted, 2 received, 0.0% packet loss",
                "  rtt min/avg/max = 10.000/20.000/30.000 ms",
            ]
        );
    }

    #[test]
    fn banner_events_and_summary_reach_the_sink() {
        let gw = HostRecord::new("gw", Ipv4Addr::new(10, 0, 0, 1));
        let dns = HostRecord::new("dns", Ipv4Addr::new(10, 0, 0, 53));
        let mut stats = StatsEntry::default();
        stats.record_sent();

        let mut reporter = reporter(false);
        reporter.banner(7, [&gw, &dns]).unwrap();
        reporter.report(&MonitorEvent::ShortSend { sent: 20, expected: 64 }).unwrap();
        reporter.report(&reply(Transition::Normal)).unwrap();
        reporter.summary([(&gw, &stats)]).unwrap();

        let out = String::from_utf8(reporter.into_sink().into_inner()).unwrap();
        assert_eq!(
            out,
            "PID: 7, Monitoring hosts: gw/10.0.0.1, dns/10.0.0.53\n\
             Warning: Only sent 20 of 64 bytes\n\
             \n\
             --- Ping statistics ---\n\
             gw (10.0.0.1):\n\
             \x20 1 packets transmitted, 0 received, 100.0% packet loss\n\
             \n\
             Exiting...\n"
        );
    }

    #[test]
    fn appending_clears_in_place_line() {
        let mut sink = TerminalSink::new(Vec::new());
        sink.overwrite_line("still down").unwrap();
        sink.append_line("recovered").unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();

        let still = out.find("still down").unwrap();
        let recovered = out.find("recovered").unwrap();
        assert!(still < recovered);
        assert!(out.ends_with("recovered\n"));
        // the line is cleared twice: before the status and before the append
        assert_eq!(out.matches("\u{1b}[2K").count(), 2);
    }
}
