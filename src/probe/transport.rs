//! Raw ICMP transport.
//!
//! The prober only talks to [`Transport`], so tests can swap in a fake
//! without needing raw-socket privileges.

use std::io::{self, Read};
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};

/// Socket timeouts have microsecond resolution and a zero timeval means
/// "block forever", so anything shorter counts as expired.
const MIN_SOCKET_TIMEOUT: Duration = Duration::from_micros(1);

/// A connected, datagram-oriented ICMP channel.
pub trait Transport: Send {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Read one datagram into `buf`, returning its length.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Absolute deadline applied to every subsequent read and write.
    fn set_deadline(&mut self, deadline: Instant) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()>;
}

/// Opens a fresh transport per probe.
pub trait Dialer: Send + Sync + 'static {
    type Transport: Transport;

    fn dial(&self, addr: IpAddr) -> io::Result<Self::Transport>;
}

/// Dials ICMP sockets with socket2.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcmpDialer;

impl Dialer for IcmpDialer {
    type Transport = IcmpSocket;

    fn dial(&self, addr: IpAddr) -> io::Result<IcmpSocket> {
        let (domain, protocol) = match addr {
            IpAddr::V4(_) => (Domain::IPV4, Protocol::ICMPV4),
            IpAddr::V6(_) => (Domain::IPV6, Protocol::ICMPV6),
        };

        // RAW needs CAP_NET_RAW; DGRAM works unprivileged where the OS allows it.
        let socket = Socket::new(domain, Type::RAW, Some(protocol))
            .or_else(|_| Socket::new(domain, Type::DGRAM, Some(protocol)))?;
        socket.connect(&SocketAddr::new(addr, 0).into())?;

        Ok(IcmpSocket {
            socket: Some(socket),
            deadline: None,
        })
    }
}

/// A connected ICMP socket with an absolute deadline.
#[derive(Debug)]
pub struct IcmpSocket {
    socket: Option<Socket>,
    deadline: Option<Instant>,
}

impl IcmpSocket {
    fn socket(&mut self) -> io::Result<&mut Socket> {
        self.socket
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "socket closed"))
    }

    /// Time left before the deadline; errors once it has passed.
    fn remaining(&self) -> io::Result<Option<Duration>> {
        let Some(deadline) = self.deadline else {
            return Ok(None);
        };
        match deadline.checked_duration_since(Instant::now()) {
            Some(left) if left >= MIN_SOCKET_TIMEOUT => Ok(Some(left)),
            _ => Err(io::Error::new(io::ErrorKind::TimedOut, "deadline exceeded")),
        }
    }
}

impl Transport for IcmpSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let timeout = self.remaining()?;
        let socket = self.socket()?;
        socket.set_write_timeout(timeout)?;
        socket.send(buf)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let timeout = self.remaining()?;
        let socket = self.socket()?;
        socket.set_read_timeout(timeout)?;
        socket.read(buf).map_err(|e| match e.kind() {
            io::ErrorKind::WouldBlock => io::Error::new(io::ErrorKind::TimedOut, e),
            _ => e,
        })
    }

    fn set_deadline(&mut self, deadline: Instant) -> io::Result<()> {
        self.deadline = Some(deadline);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        // Dropping the socket closes the descriptor.
        self.socket.take();
        Ok(())
    }
}
