//! The multiplex primitive: a single blocking wait for "the socket has a
//! datagram" or "a timer expired", with no busy-spin and no spurious
//! wakes (spec.md §4.3, §6, §9).
//!
//! `std::net::UdpSocket` has no `select`-style "wait on either of these"
//! operation, and this crate deliberately avoids pulling in `mio` or
//! spawning a thread (spec.md §9, "Blocking receive through a
//! non-blocking socket"). Instead, grounded on the same inversion the
//! teacher's `nb`-based sockets use (`kwap::socket::Socket::recv`
//! returning `nb::Result` rather than blocking outright): a single
//! `recv` call is given a read timeout equal to the time remaining until
//! the next timer deadline, so the OS itself performs the wait.

use std::time::Duration;

use crate::socket::DatagramEndpoint;
use crate::timer::{Clock, Timer};

/// The outcome of a call to [`wait`].
#[derive(Debug)]
pub enum Event {
  /// A datagram was received; its length is given.
  Readable(usize),
  /// The timer passed to `wait` expired before a datagram arrived.
  TimedOut,
}

/// Block until either `endpoint` has a datagram waiting (read into
/// `buf`) or `timer` expires, whichever happens first.
///
/// Implemented as a loop over short, timer-bounded `recv` calls rather
/// than a single one: `set_read_timeout` is a lower bound on some
/// platforms, and a `recv` can also return early for reasons unrelated
/// to either event (e.g. an interrupted syscall) — the loop re-checks
/// the timer and retries rather than treating that as `TimedOut`.
pub fn wait(endpoint: &impl DatagramEndpoint,
            clock: &impl Clock,
            timer: &Timer,
            buf: &mut [u8])
            -> std::io::Result<Event> {
  loop {
    let remaining = match timer.remaining(clock) {
      | Some(d) if d.is_zero() => return Ok(Event::TimedOut),
      | Some(d) => d,
      | None => Duration::from_secs(3600),
    };

    endpoint.set_read_timeout(Some(remaining))?;

    match endpoint.recv(buf) {
      | Ok(n) => return Ok(Event::Readable(n)),
      | Err(e) if is_timeout(&e) => {
        if timer.ready(clock) {
          return Ok(Event::TimedOut);
        }
        continue;
      },
      | Err(e) => return Err(e),
    }
  }
}

fn is_timeout(e: &std::io::Error) -> bool {
  matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::{FakeClock, FakeEndpoint};

  #[test]
  fn returns_readable_when_data_arrives() {
    let endpoint = FakeEndpoint::new();
    endpoint.deliver(b"hello".to_vec());
    let clock = FakeClock::new();
    let mut timer = Timer::new();
    timer.arm(&clock, Duration::from_secs(10));

    let mut buf = [0u8; 16];
    match wait(&endpoint, &clock, &timer, &mut buf).unwrap() {
      | Event::Readable(n) => assert_eq!(&buf[..n], b"hello"),
      | Event::TimedOut => panic!("expected Readable"),
    }
  }

  #[test]
  fn times_out_when_nothing_arrives() {
    let endpoint = FakeEndpoint::new();
    let clock = FakeClock::new();
    let mut timer = Timer::new();
    timer.arm(&clock, Duration::from_millis(0));

    let mut buf = [0u8; 16];
    match wait(&endpoint, &clock, &timer, &mut buf).unwrap() {
      | Event::TimedOut => {},
      | Event::Readable(_) => panic!("expected TimedOut"),
    }
  }
}
