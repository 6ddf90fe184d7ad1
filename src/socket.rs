//! The datagram transport the client exchanges messages over.
//!
//! Grounded on `kwap::socket::Socket` and its `std::net::UdpSocket` impl
//! (`kwap::std::net`), but narrowed to a single connected peer: this
//! crate is a client with one upstream at a time, not the teacher's
//! general-purpose addressed-datagram abstraction, so there's no
//! `Addressed<T>`/`Dgram` wrapper here — `recv` just returns a byte
//! count against a caller-owned buffer, same as `std::net::UdpSocket`
//! itself.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

/// A connected datagram transport.
///
/// A trait (rather than using `UdpSocket` directly) so tests can swap in
/// an in-memory fake (see [`crate::test_support`]) instead of binding a
/// real socket, the same role `kwap::socket::Socket` plays for
/// `kwap::test::SockMock`.
pub trait DatagramEndpoint: std::fmt::Debug {
  /// Send a datagram to the connected peer. The whole of `buf` must be
  /// transmitted atomically (spec.md §4.4); implementations that can only
  /// report a partial write must turn that into an `io::Error` rather
  /// than returning success.
  fn send(&self, buf: &[u8]) -> io::Result<()>;

  /// Receive a datagram from the connected peer into `buf`, returning the
  /// number of bytes written. Blocks for up to the endpoint's current
  /// read timeout (spec.md §4.3: "a single blocking wait", driven here by
  /// [`crate::mux::wait`] adjusting the timeout before each call).
  ///
  /// On timeout, returns an `io::Error` of kind `WouldBlock` or
  /// `TimedOut` — the two kinds a real `UdpSocket` can surface for an
  /// expired read timeout depending on platform.
  fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

  /// Bound the duration the next [`Self::recv`] call may block for.
  /// `None` means block with no timeout.
  fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
}

/// A standard-library UDP socket connected to a single peer.
#[derive(Debug)]
pub struct UdpEndpoint {
  socket: UdpSocket,
}

impl UdpEndpoint {
  /// Bind an ephemeral local socket and connect it to `peer`. `peer`
  /// accepts anything `ToSocketAddrs` does, so both IPv4 and IPv6
  /// targets work (spec.md's own choice to support both despite the
  /// IPv6-only example in spec.md §2).
  pub fn connect(peer: impl ToSocketAddrs) -> io::Result<Self> {
    let peer = peer.to_socket_addrs()?
                    .next()
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no address resolved"))?;

    let local: SocketAddr = match peer {
      | SocketAddr::V4(_) => "0.0.0.0:0".parse().unwrap(),
      | SocketAddr::V6(_) => "[::]:0".parse().unwrap(),
    };

    let socket = UdpSocket::bind(local)?;
    socket.connect(peer)?;
    Ok(Self { socket })
  }

  /// The address this endpoint is bound to locally.
  pub fn local_addr(&self) -> io::Result<SocketAddr> {
    self.socket.local_addr()
  }
}

impl DatagramEndpoint for UdpEndpoint {
  fn send(&self, buf: &[u8]) -> io::Result<()> {
    let n = self.socket.send(buf)?;
    if n != buf.len() {
      return Err(io::Error::new(io::ErrorKind::WriteZero,
                                 "datagram was not transmitted atomically (short write)"));
    }
    Ok(())
  }

  fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
    self.socket.recv(buf)
  }

  fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
    self.socket.set_read_timeout(timeout)
  }
}
