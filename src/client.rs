//! The client-side request/response exchange engine (spec.md §4.5).
//!
//! Grounded on `kwap::core::Core` and `kwap::blocking::client::Client`,
//! but collapsed from the teacher's event-bus architecture (`Core::fire`
//! dispatching to registered listeners for `RecvDgram`/`RecvMsg`/etc.)
//! into a single straight-line state machine: this crate drives exactly
//! one exchange at a time to completion rather than multiplexing many
//! in-flight exchanges through a shared event loop, so the indirection
//! of listener registration buys nothing here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::config::Config;
use crate::error::ExchangeError;
use crate::msg::{self, Message, Type};
use crate::mux::{self, Event};
use crate::rand::Rand;
use crate::socket::DatagramEndpoint;
use crate::timer::{Clock, RetransmitTimer, SystemClock, Timer};

/// A handle a caller can use to abort an in-flight [`Client::exchange`]
/// call from another thread (spec.md §5: "a robust implementation
/// SHOULD accept a cancellation signal ... tolerate mid-wait
/// cancellation"). Not present in the teacher, which has no
/// cancellation story at all; added because spec.md calls it out as the
/// expected direction for a non-reference implementation.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
  /// A signal that starts uncancelled.
  pub fn new() -> Self {
    Self::default()
  }

  /// Request cancellation of whatever exchange holds this signal.
  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  /// Whether cancellation has been requested.
  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

/// A CoAP client bound to a single peer.
///
/// Not reentrant (spec.md §5: "a client instance is not reentrant —
/// callers must serialize calls to `exchange`"): `&mut self` on
/// [`Client::exchange`] enforces this at compile time.
#[derive(Debug)]
pub struct Client<E: DatagramEndpoint, C: Clock = SystemClock> {
  endpoint: E,
  clock: C,
  rand: Rand,
  config: Config,
}

impl<E: DatagramEndpoint> Client<E, SystemClock> {
  /// Build a client around `endpoint` using the real system clock and
  /// default RFC 7252 timing parameters.
  pub fn new(endpoint: E) -> Self {
    Self::with_config(endpoint, Config::default())
  }

  /// As [`Self::new`], with custom timing parameters.
  pub fn with_config(endpoint: E, config: Config) -> Self {
    Self { endpoint, clock: SystemClock, rand: Rand::new(), config }
  }
}

impl<E: DatagramEndpoint, C: Clock> Client<E, C> {
  /// Build a client with an explicit clock (and, implicitly, a
  /// deterministic random seed) for testing.
  pub fn with_clock(endpoint: E, clock: C, config: Config, rand: Rand) -> Self {
    Self { endpoint, clock, rand, config }
  }

  /// Send `request` and wait for its response, per the ACK_WAIT /
  /// RESP_WAIT state machine (spec.md §4.5). Blocks the calling thread
  /// until the exchange reaches DONE or FAILED.
  pub fn exchange(&mut self, request: Message) -> Result<Message, ExchangeError> {
    self.exchange_cancellable(request, None)
  }

  /// As [`Self::exchange`], but checked against `cancel` between wait
  /// iterations (spec.md §5 cancellation).
  pub fn exchange_cancellable(&mut self,
                               mut request: Message,
                               cancel: Option<&CancelSignal>)
                               -> Result<Message, ExchangeError> {
    if !matches!(request.ty, Type::Con | Type::Non) {
      return Err(ExchangeError::InvalidArgument("request type must be CON or NON"));
    }
    if !request.code.is_request() {
      return Err(ExchangeError::InvalidArgument("request code must be a request method"));
    }
    if request.token.len() > 8 {
      return Err(ExchangeError::InvalidArgument("token must be at most 8 bytes"));
    }

    request.message_id = self.rand.message_id();
    request.token = self.rand.token();

    let mut out = vec![0u8; self.config.max_buffer];
    let n = msg::serialize(&request, &mut out).map_err(|e| {
               ExchangeError::InvalidArgument(match e {
                 | crate::error::EncodeError::BufferTooSmall => "request too large for configured buffer",
                 | crate::error::EncodeError::InvalidTokenLength => "token must be at most 8 bytes",
                 | crate::error::EncodeError::OptionValueTooLong => "an option value exceeds the wire limit",
               })
             })?;

    debug!("sending {:?} request, message_id={:#06x}", request.ty, request.message_id);
    self.endpoint.send(&out[..n])?;

    match request.ty {
      | Type::Non => self.resp_wait(&request, cancel),
      | Type::Con => self.ack_wait(&request, &out[..n], cancel),
      | _ => unreachable!("validated above"),
    }
  }

  /// Ping a peer with an empty CON message and wait for the RST
  /// (spec.md's supplemental CoAP ping feature, grounded on
  /// `kwap::core::Core::{ping, poll_ping}`). Succeeds when the RST
  /// arrives before ACK_WAIT's retransmission budget is exhausted.
  pub fn ping(&mut self) -> Result<(), ExchangeError> {
    let mut request = Message::new(Type::Con, crate::msg::Code::EMPTY, 0);
    request.message_id = self.rand.message_id();

    let mut out = vec![0u8; self.config.max_buffer];
    let n = msg::serialize(&request, &mut out).expect("empty message always fits");
    self.endpoint.send(&out[..n])?;

    match self.ack_wait(&request, &out[..n], None) {
      | Err(ExchangeError::PeerReset) => Ok(()),
      | Err(e) => Err(e),
      | Ok(_) => Err(ExchangeError::InvalidArgument("peer answered ping with data instead of RST")),
    }
  }

  fn ack_wait(&mut self,
              request: &Message,
              serialized: &[u8],
              cancel: Option<&CancelSignal>)
              -> Result<Message, ExchangeError> {
    let initial_ms = self.rand.ack_timeout_ms(self.config.ack_timeout.as_millis() as u64,
                                               self.config.ack_random_factor);
    let mut retry = RetransmitTimer::new(Duration::from_millis(initial_ms), self.config.max_retransmit);

    let mut timer = Timer::new();
    timer.arm(&self.clock, retry.current_timeout());

    let mut buf = vec![0u8; self.config.max_buffer];

    loop {
      if let Some(cancelled) = check_cancelled(cancel) {
        return cancelled;
      }

      match mux::wait(&self.endpoint, &self.clock, &timer, &mut buf)? {
        | Event::TimedOut => match retry.retry() {
          | None => return Err(ExchangeError::Timeout),
          | Some(next) => {
            debug!("ACK_TIMEOUT elapsed, retransmitting (attempt {})", retry.attempt());
            self.endpoint.send(serialized)?;
            timer.arm(&self.clock, next);
          },
        },
        | Event::Readable(n) => {
          match self.handle_ack_wait_datagram(&buf[..n], request)? {
            | AckOutcome::Continue => continue,
            | AckOutcome::ToRespWait => return self.resp_wait(request, cancel),
            | AckOutcome::Done(resp) => return Ok(resp),
          }
        },
      }
    }
  }

  fn handle_ack_wait_datagram(&mut self,
                               bytes: &[u8],
                               request: &Message)
                               -> Result<AckOutcome, ExchangeError> {
    let parsed = match msg::parse(bytes) {
      | Ok(m) => m,
      | Err(e) => {
        self.absorb_parse_error(bytes, e)?;
        return Ok(AckOutcome::Continue);
      },
    };

    if parsed.message_id == request.message_id {
      return match (parsed.ty, parsed.code.is_empty()) {
        | (Type::Ack, true) => Ok(AckOutcome::ToRespWait),
        | (Type::Ack, false) if parsed.token == request.token => Ok(AckOutcome::Done(parsed)),
        | (Type::Ack, false) => {
          // Matching message-id, wrong token: spec.md §4.5 ACK_WAIT calls
          // this out as "reject (reset)" rather than the general
          // CON-only rejection policy, since a piggy-backed ACK carrying
          // the wrong token is itself evidence the peer is confused
          // about this exchange.
          warn!("rejecting ACK with mismatched token, message_id={:#06x}, sending RST",
                parsed.message_id);
          self.send_rst(parsed.message_id)?;
          Ok(AckOutcome::Continue)
        },
        | (Type::Rst, _) => Err(ExchangeError::PeerReset),
        | _ => {
          self.reject(&parsed)?;
          Ok(AckOutcome::Continue)
        },
      };
    }

    if parsed.token == request.token {
      return match parsed.ty {
        | Type::Con => {
          self.send_ack(parsed.message_id)?;
          Ok(AckOutcome::Done(parsed))
        },
        | Type::Non => Ok(AckOutcome::Done(parsed)),
        | _ => {
          self.reject(&parsed)?;
          Ok(AckOutcome::Continue)
        },
      };
    }

    self.reject(&parsed)?;
    Ok(AckOutcome::Continue)
  }

  fn resp_wait(&mut self, request: &Message, cancel: Option<&CancelSignal>) -> Result<Message, ExchangeError> {
    let mut timer = Timer::new();
    timer.arm(&self.clock, self.config.resp_timeout);

    let mut buf = vec![0u8; self.config.max_buffer];

    loop {
      if let Some(cancelled) = check_cancelled(cancel) {
        return cancelled;
      }

      match mux::wait(&self.endpoint, &self.clock, &timer, &mut buf)? {
        | Event::TimedOut => return Err(ExchangeError::Timeout),
        | Event::Readable(n) => {
          let parsed = match msg::parse(&buf[..n]) {
            | Ok(m) => m,
            | Err(e) => {
              self.absorb_parse_error(&buf[..n], e)?;
              continue;
            },
          };

          // An RST carries no token (`Message::reset_reply` always emits
          // a zero-length one), so it is correlated by message-id rather
          // than by the token-equality gate below (spec.md §4.5
          // RESP_WAIT: "type ... RST with matching message-ID ...
          // transition to FAILED with PeerReset").
          if parsed.ty == Type::Rst && parsed.message_id == request.message_id {
            return Err(ExchangeError::PeerReset);
          }

          if parsed.token != request.token {
            self.reject(&parsed)?;
            continue;
          }

          match parsed.ty {
            | Type::Con => {
              self.send_ack(parsed.message_id)?;
              return Ok(parsed);
            },
            | Type::Non => return Ok(parsed),
            | Type::Rst => return Err(ExchangeError::PeerReset),
            | Type::Ack => {
              self.reject(&parsed)?;
              continue;
            },
          }
        },
      }
    }
  }

  /// Rejection policy (spec.md §4.5): RST a malformed/mismatched CON,
  /// silently log and drop a malformed/mismatched NON (RFC 7252 §4.2 —
  /// RST only ever replies to CON).
  fn reject(&self, msg: &Message) -> Result<(), ExchangeError> {
    match msg.ty {
      | Type::Con => {
        warn!("rejecting unexpected CON message_id={:#06x}, sending RST", msg.message_id);
        self.send_rst(msg.message_id)
      },
      | _ => {
        debug!("dropping unexpected {:?} message_id={:#06x}", msg.ty, msg.message_id);
        Ok(())
      },
    }
  }

  fn absorb_parse_error(&self, bytes: &[u8], e: crate::error::ParseError) -> Result<(), ExchangeError> {
    warn!("failed to parse datagram: {e}");
    match msg::parse_type_and_message_id(bytes) {
      | Ok((Type::Con, message_id)) => self.send_rst(message_id),
      | _ => Ok(()),
    }
  }

  fn send_rst(&self, message_id: u16) -> Result<(), ExchangeError> {
    self.send_control(Message::reset_reply(message_id))
  }

  fn send_ack(&self, message_id: u16) -> Result<(), ExchangeError> {
    self.send_control(Message::ack_reply(message_id))
  }

  fn send_control(&self, msg: Message) -> Result<(), ExchangeError> {
    let mut buf = [0u8; 4];
    let n = msg::serialize(&msg, &mut buf).expect("empty control message always fits in 4 bytes");
    self.endpoint.send(&buf[..n]).map_err(ExchangeError::from)
  }
}

enum AckOutcome {
  Continue,
  ToRespWait,
  Done(Message),
}

fn check_cancelled(cancel: Option<&CancelSignal>) -> Option<Result<Message, ExchangeError>> {
  cancel.filter(|c| c.is_cancelled()).map(|_| Err(ExchangeError::Cancelled))
}

#[cfg(test)]
mod tests {
  use std::rc::Rc;

  use super::*;
  use crate::msg::Code;
  use crate::req::ReqBuilder;
  use crate::test_support::{FakeClock, FakeEndpoint};

  fn client(endpoint: FakeEndpoint, clock: Rc<FakeClock>) -> Client<FakeEndpoint, Rc<FakeClock>> {
    Client::with_clock(endpoint, clock, Config::default(), Rand::from_seed(7))
  }

  fn linked() -> (FakeEndpoint, Rc<FakeClock>) {
    let clock = Rc::new(FakeClock::new());
    (FakeEndpoint::linked(clock.clone()), clock)
  }

  fn encode(m: &Message) -> Vec<u8> {
    let mut buf = [0u8; 256];
    let n = msg::serialize(m, &mut buf).unwrap();
    buf[..n].to_vec()
  }

  #[test]
  fn piggybacked_response_completes_immediately() {
    let (endpoint, clock) = linked();

    let req = ReqBuilder::get().build();

    // A real peer would echo our message_id/token; simulate this by
    // pre-seeding the expected request (same Rand seed/sequence) to
    // learn what the engine will assign, then queue a matching reply.
    let mut probe_rand = Rand::from_seed(7);
    let message_id = probe_rand.message_id();
    let token = probe_rand.token();

    let mut reply = Message::new(Type::Ack, Code::new(2, 05), message_id);
    reply.token = token;
    reply.payload = Some(b"OK".to_vec());
    endpoint.deliver(encode(&reply));

    let mut client = client(endpoint, clock);
    let resp = client.exchange(req).unwrap();
    assert_eq!(resp.code, Code::new(2, 05));
    assert_eq!(resp.payload, Some(b"OK".to_vec()));
  }

  #[test]
  fn empty_ack_then_separate_response() {
    let (endpoint, clock) = linked();

    let req = ReqBuilder::put().build();

    let mut probe_rand = Rand::from_seed(7);
    let message_id = probe_rand.message_id();
    let token = probe_rand.token();

    let ack = Message::ack_reply(message_id);
    endpoint.deliver(encode(&ack));

    let mut separate = Message::new(Type::Con, Code::new(2, 04), message_id.wrapping_add(1));
    separate.token = token;
    endpoint.deliver(encode(&separate));

    let mut client = client(endpoint, clock);
    let resp = client.exchange(req).unwrap();
    assert_eq!(resp.code, Code::new(2, 04));

    // the separate CON response must have been ACKed
    let sent = client.endpoint.sent();
    assert_eq!(sent.len(), 2, "request + ack to the separate response");
    let ack_sent = msg::parse(&sent[1]).unwrap();
    assert_eq!(ack_sent.ty, Type::Ack);
    assert_eq!(ack_sent.message_id, separate.message_id);
  }

  #[test]
  fn reordered_con_response_is_accepted_without_retransmit() {
    let (endpoint, clock) = linked();

    let req = ReqBuilder::get().build();

    let mut probe_rand = Rand::from_seed(7);
    let _message_id = probe_rand.message_id();
    let token = probe_rand.token();

    // a CON response with a different message-id but matching token,
    // arriving before any ACK
    let mut reordered = Message::new(Type::Con, Code::new(2, 05), 0xAAAA);
    reordered.token = token;
    endpoint.deliver(encode(&reordered));

    let mut client = client(endpoint, clock);
    let resp = client.exchange(req).unwrap();
    assert_eq!(resp.code, Code::new(2, 05));

    let sent = client.endpoint.sent();
    assert_eq!(sent.len(), 2, "request + ack, no retransmit");
  }

  #[test]
  fn token_mismatch_is_rejected_and_wait_continues() {
    let (endpoint, clock) = linked();

    let req = ReqBuilder::get().build();

    let mut probe_rand = Rand::from_seed(7);
    let message_id = probe_rand.message_id();
    let _token = probe_rand.token();

    let mut wrong = Message::new(Type::Ack, Code::new(2, 05), message_id);
    wrong.token = vec![0xFF, 0xFF, 0xFF, 0xFF];
    endpoint.deliver(encode(&wrong));

    let mut right = Message::new(Type::Ack, Code::new(2, 05), message_id);
    right.token = Rand::from_seed(7).token();
    endpoint.deliver(encode(&right));

    let mut client = client(endpoint, clock);
    let resp = client.exchange(req).unwrap();
    assert_eq!(resp.code, Code::new(2, 05));

    // the mismatched ACK must have provoked an RST before the real reply
    let sent = client.endpoint.sent();
    assert_eq!(sent.len(), 2);
    let rst = msg::parse(&sent[1]).unwrap();
    assert_eq!(rst.ty, Type::Rst);
  }

  #[test]
  fn malformed_con_triggers_rst() {
    let (endpoint, clock) = linked();

    let req = ReqBuilder::get().build();

    // tkl nibble = 9 (reserved) on an otherwise CON-typed header; no
    // further datagrams ever arrive, so the linked clock fast-forwards
    // through every retransmit deadline until ACK_WAIT gives up.
    endpoint.deliver(vec![0b0100_1001, 0x01, 0x12, 0x34, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

    let mut client = client(endpoint, clock);
    let err = client.exchange(req).unwrap_err();
    assert!(matches!(err, ExchangeError::Timeout));

    let sent = client.endpoint.sent();
    let rst = msg::parse(&sent[1]).unwrap();
    assert_eq!(rst.ty, Type::Rst);
    assert_eq!(rst.message_id, 0x1234);
  }

  #[test]
  fn peer_rst_surfaces_peer_reset() {
    let (endpoint, clock) = linked();

    let req = ReqBuilder::get().build();

    let mut probe_rand = Rand::from_seed(7);
    let message_id = probe_rand.message_id();

    endpoint.deliver(encode(&Message::reset_reply(message_id)));

    let mut client = client(endpoint, clock);
    let err = client.exchange(req).unwrap_err();
    assert!(matches!(err, ExchangeError::PeerReset));
  }

  #[test]
  fn rst_during_resp_wait_surfaces_peer_reset() {
    let (endpoint, clock) = linked();

    let req = ReqBuilder::put().build();

    let mut probe_rand = Rand::from_seed(7);
    let message_id = probe_rand.message_id();

    // empty ACK moves the exchange into RESP_WAIT...
    endpoint.deliver(encode(&Message::ack_reply(message_id)));
    // ...then the peer RSTs the same message-id instead of ever sending a
    // separate response. The RST's token is always empty
    // (`Message::reset_reply`), so it can only be recognized by
    // message-id, not by the token-equality check RESP_WAIT otherwise
    // gates on.
    endpoint.deliver(encode(&Message::reset_reply(message_id)));

    let mut client = client(endpoint, clock);
    let err = client.exchange(req).unwrap_err();
    assert!(matches!(err, ExchangeError::PeerReset));
  }

  #[test]
  fn non_confirmable_enters_resp_wait_directly() {
    let (endpoint, clock) = linked();

    let req = ReqBuilder::new(crate::req::Method::Post, false).build();

    let mut probe_rand = Rand::from_seed(7);
    let _message_id = probe_rand.message_id();
    let token = probe_rand.token();

    let mut reply = Message::new(Type::Non, Code::new(2, 04), 0x9999);
    reply.token = token;
    endpoint.deliver(encode(&reply));

    let mut client = client(endpoint, clock);
    let resp = client.exchange(req).unwrap();
    assert_eq!(resp.code, Code::new(2, 04));

    // NON never enters ACK_WAIT, so only the request itself was sent
    assert_eq!(client.endpoint.sent_count(), 1);
  }

  #[test]
  fn retransmits_on_timeout_and_gives_up_after_budget() {
    let (endpoint, clock) = linked();
    let mut client = client(endpoint, clock);

    let req = ReqBuilder::get().build();

    // the linked clock advances by exactly the requested read timeout on
    // every empty poll, so each ACK_WAIT deadline elapses deterministically
    // without any real sleeping.
    let err = client.exchange(req).unwrap_err();
    assert!(matches!(err, ExchangeError::Timeout));

    // initial send + 4 retransmits
    assert_eq!(client.endpoint.sent_count(), 5);
  }

  #[test]
  fn cancellation_aborts_the_wait() {
    let (endpoint, clock) = linked();
    let mut client = client(endpoint, clock);
    let cancel = CancelSignal::new();
    cancel.cancel();

    let req = ReqBuilder::get().build();
    let err = client.exchange_cancellable(req, Some(&cancel)).unwrap_err();
    assert!(matches!(err, ExchangeError::Cancelled));
  }

  #[test]
  fn invalid_argument_rejected_before_any_send() {
    let (endpoint, clock) = linked();
    let mut client = client(endpoint, clock);

    let mut bad = ReqBuilder::get().build();
    bad.ty = Type::Ack;
    let err = client.exchange(bad).unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidArgument(_)));
    assert_eq!(client.endpoint.sent_count(), 0);
  }
}
