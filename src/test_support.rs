//! Deterministic test doubles for the clock and the transport.
//!
//! Grounded on `kwap::test::ClockMock` (a `Cell<u64>` driving
//! `embedded_time::Clock`) and `kwap::test::SockMock` (`Mutex<Vec<...>>`
//! inbound/outbound queues standing in for a real socket) — ported to
//! this crate's [`crate::timer::Clock`] and [`crate::socket::DatagramEndpoint`]
//! traits so exchange-engine tests run with no real sleeping and no real
//! network I/O.

use std::cell::Cell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::timer::Clock;
use crate::socket::DatagramEndpoint;

/// A clock that only advances when told to.
#[derive(Debug)]
pub struct FakeClock(Cell<Instant>);

impl FakeClock {
  /// A fresh clock reading "now".
  pub fn new() -> Self {
    Self(Cell::new(Instant::now()))
  }

  /// Move the clock forward by `d`.
  pub fn advance(&self, d: Duration) {
    self.0.set(self.0.get() + d);
  }
}

impl Default for FakeClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for FakeClock {
  fn now(&self) -> Instant {
    self.0.get()
  }
}

/// A transport with explicit inbound/outbound queues instead of a real
/// socket. [`Self::deliver`] simulates a peer datagram arriving;
/// [`Self::sent`] inspects what the code under test has sent.
///
/// When linked to a [`FakeClock`] (via [`Self::linked`]), an empty
/// `recv` advances that clock by whatever duration was last passed to
/// `set_read_timeout` before reporting `WouldBlock` — standing in for a
/// real socket actually blocking for that long, so exchange-engine tests
/// that exercise retransmission or RESP_TIMEOUT never need to sleep in
/// wall-clock time.
#[derive(Debug)]
pub struct FakeEndpoint {
  rx: Mutex<VecDeque<Vec<u8>>>,
  tx: Mutex<Vec<Vec<u8>>>,
  clock: Option<Rc<FakeClock>>,
  read_timeout: Cell<Option<Duration>>,
}

impl FakeEndpoint {
  /// An endpoint with nothing queued in either direction and no linked
  /// clock — `recv` on an empty queue returns `WouldBlock` without
  /// advancing any time.
  pub fn new() -> Self {
    Self { rx: Mutex::new(VecDeque::new()),
           tx: Mutex::new(Vec::new()),
           clock: None,
           read_timeout: Cell::new(None) }
  }

  /// An endpoint whose empty-`recv` timeouts advance `clock` by the
  /// requested read timeout, simulating blocking for exactly that long.
  pub fn linked(clock: Rc<FakeClock>) -> Self {
    Self { clock: Some(clock), ..Self::new() }
  }

  /// Queue a datagram as if it arrived from the peer.
  pub fn deliver(&self, datagram: Vec<u8>) {
    self.rx.lock().unwrap().push_back(datagram);
  }

  /// The datagrams sent so far, in send order.
  pub fn sent(&self) -> Vec<Vec<u8>> {
    self.tx.lock().unwrap().clone()
  }

  /// How many datagrams have been sent so far.
  pub fn sent_count(&self) -> usize {
    self.tx.lock().unwrap().len()
  }
}

impl Default for FakeEndpoint {
  fn default() -> Self {
    Self::new()
  }
}

impl DatagramEndpoint for FakeEndpoint {
  fn send(&self, buf: &[u8]) -> io::Result<()> {
    self.tx.lock().unwrap().push(buf.to_vec());
    Ok(())
  }

  fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
    match self.rx.lock().unwrap().pop_front() {
      | Some(datagram) => {
        let n = datagram.len();
        buf[..n].copy_from_slice(&datagram);
        Ok(n)
      },
      | None => {
        if let Some(clock) = &self.clock {
          clock.advance(self.read_timeout.get().unwrap_or(Duration::ZERO));
        }
        Err(io::Error::new(io::ErrorKind::WouldBlock, "no datagram queued"))
      },
    }
  }

  fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
    self.read_timeout.set(timeout);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fake_endpoint_roundtrips() {
    let endpoint = FakeEndpoint::new();
    endpoint.deliver(vec![1, 2, 3]);

    let mut buf = [0u8; 8];
    let n = endpoint.recv(&mut buf).unwrap();
    assert_eq!(&buf[..n], &[1, 2, 3]);

    endpoint.send(&[9, 9]).unwrap();
    assert_eq!(endpoint.sent(), vec![vec![9, 9]]);
  }

  #[test]
  fn fake_clock_advances_on_demand() {
    let clock = FakeClock::new();
    let t0 = clock.now();
    clock.advance(Duration::from_secs(5));
    assert_eq!(clock.now(), t0 + Duration::from_secs(5));
  }
}
