use std::io;
use thiserror::Error;

/// Fatal errors raised while setting up the monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// A host name could not be turned into an IPv4 address.
    #[error("unable to resolve host {host}: {reason}")]
    Resolve { host: String, reason: String },
    /// The raw ICMP socket could not be opened.
    #[error("unable to open raw ICMP socket (root privileges required?): {0}")]
    Socket(#[source] io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("unable to install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A received datagram too short to hold an IP header plus an ICMP header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed packet: {len} bytes, need at least {needed}")]
pub struct MalformedPacket {
    pub len: usize,
    pub needed: usize,
}
