use crate::error::MonitorError;
use log::info;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::mem::MaybeUninit;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::os::fd::AsFd;
use std::time::Duration;

const RECV_BUFFER_SIZE: usize = 65_536;

/// A datagram as captured on the socket, IP header included.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub bytes: Vec<u8>,
    pub source: Ipv4Addr,
}

pub trait IcmpSocket {
    fn send_to(&mut self, packet: &[u8], destination: Ipv4Addr) -> io::Result<usize>;
    /// Waits at most `timeout` for a datagram and reads one if available.
    fn recv_timeout(&mut self, timeout: Duration) -> io::Result<Option<Datagram>>;
}

/// Raw IPv4 ICMP socket. Sends block, receives go through `poll(2)`; the
/// socket is never put into non-blocking mode.
pub struct RawIcmpSocket {
    socket: Socket,
    buffer: Vec<MaybeUninit<u8>>,
}

impl RawIcmpSocket {
    pub fn open() -> Result<Self, MonitorError> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4)).map_err(MonitorError::Socket)?;
        info!("opened raw ICMP socket");
        Ok(RawIcmpSocket { socket, buffer: vec![MaybeUninit::uninit(); RECV_BUFFER_SIZE] })
    }

    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        let mut fds = [PollFd::new(self.socket.as_fd(), PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(millis)) {
            Ok(0) => Ok(false),
            Ok(_) => Ok(fds[0].revents().is_some_and(|r| r.intersects(PollFlags::POLLIN | PollFlags::POLLERR))),
            Err(nix::errno::Errno::EINTR) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl IcmpSocket for RawIcmpSocket {
    fn send_to(&mut self, packet: &[u8], destination: Ipv4Addr) -> io::Result<usize> {
        let address = SockAddr::from(SocketAddrV4::new(destination, 0));
        self.socket.send_to(packet, &address)
    }

    fn recv_timeout(&mut self, timeout: Duration) -> io::Result<Option<Datagram>> {
        if !self.wait_readable(timeout)? {
            return Ok(None);
        }
        let (len, address) = self.socket.recv_from(&mut self.buffer)?;
        // SAFETY: recv_from initialised the first `len` bytes of the buffer
        let bytes = unsafe { std::slice::from_raw_parts(self.buffer.as_ptr() as *const u8, len) }.to_vec();
        let source = address
            .as_socket_ipv4()
            .map(|a| *a.ip())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "datagram from a non-IPv4 address"))?;
        Ok(Some(Datagram { bytes, source }))
    }
}
