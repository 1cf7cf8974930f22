use crate::host::Transition;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    Reply { name: String, ip: Ipv4Addr, sequence: u16, rtt_ms: f64, transition: Transition },
    /// Payload too short to carry a timestamp.
    NoRtt { name: String, ip: Ipv4Addr, sequence: u16 },
    SendFailed { name: String, ip: Ipv4Addr, error: String },
    ShortSend { sent: usize, expected: usize },
    ReceiveError { error: String },
}
