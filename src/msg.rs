//! The CoAP message codec: a pure, allocation-light transform between
//! [`Message`] and its RFC 7252 §3 wire representation. No I/O happens
//! here — `parse`/`serialize` are the normative reference point for wire
//! compatibility (spec.md §6), and the rest of the crate treats them as
//! ground truth.

use crate::buf::{Reader, Writer};
use crate::error::{EncodeError, ParseError};
use crate::opt::{self, Opt, Options};

/// The CoAP protocol version. Always 1 on the wire (RFC 7252 §3).
pub const VERSION: u8 = 1;

/// Message type, per RFC 7252 §3.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Type {
  /// Confirmable — the peer must ACK or RST.
  Con,
  /// Non-confirmable — no ACK is expected.
  Non,
  /// Acknowledgement.
  Ack,
  /// Reset.
  Rst,
}

impl Type {
  fn from_bits(bits: u8) -> Self {
    match bits & 0b11 {
      | 0 => Type::Con,
      | 1 => Type::Non,
      | 2 => Type::Ack,
      | _ => Type::Rst,
    }
  }

  fn to_bits(self) -> u8 {
    match self {
      | Type::Con => 0,
      | Type::Non => 1,
      | Type::Ack => 2,
      | Type::Rst => 3,
    }
  }
}

/// An 8-bit message code split into a 3-bit class and 5-bit detail
/// (RFC 7252 §3 / §12.1). Class 0 detail 0 is the empty message; class 0
/// with a non-zero detail is a request method; classes 2/4/5 are
/// responses.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Code {
  /// The 3-bit class (0-7).
  pub class: u8,
  /// The 5-bit detail (0-31).
  pub detail: u8,
}

impl Code {
  /// Construct a code from its class and detail.
  pub const fn new(class: u8, detail: u8) -> Self {
    Self { class, detail }
  }

  /// The empty-message code, 0.00.
  pub const EMPTY: Code = Code::new(0, 0);

  /// `true` for class 0, detail 0.
  pub fn is_empty(self) -> bool {
    self.class == 0 && self.detail == 0
  }

  /// `true` for class 0 with a non-zero detail (a request method).
  pub fn is_request(self) -> bool {
    self.class == 0 && self.detail != 0
  }

  /// `true` for classes 2, 4, 5 (a response).
  pub fn is_response(self) -> bool {
    matches!(self.class, 2 | 4 | 5)
  }

  fn from_byte(b: u8) -> Self {
    Self { class: b >> 5, detail: b & 0b0001_1111 }
  }

  fn to_byte(self) -> u8 {
    (self.class << 5) | (self.detail & 0b0001_1111)
  }
}

impl std::fmt::Display for Code {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}.{:02}", self.class, self.detail)
  }
}

/// Request method codes (RFC 7252 §12.1.1).
pub mod method {
  use super::Code;

  /// GET, 0.01
  pub const GET: Code = Code::new(0, 1);
  /// POST, 0.02
  pub const POST: Code = Code::new(0, 2);
  /// PUT, 0.03
  pub const PUT: Code = Code::new(0, 3);
  /// DELETE, 0.04
  pub const DELETE: Code = Code::new(0, 4);
}

/// A decoded or to-be-serialized CoAP message (spec.md §3).
#[derive(Clone, PartialEq, Debug)]
pub struct Message {
  /// Message type.
  pub ty: Type,
  /// 8-bit code (class.detail).
  pub code: Code,
  /// 16-bit message ID, used to correlate ACK/RST with the message they
  /// respond to.
  pub message_id: u16,
  /// 0-8 byte opaque token, used to correlate a response with its
  /// request across possibly reordered message IDs.
  pub token: Vec<u8>,
  /// The message's options, in insertion order.
  pub options: Options,
  /// The optional payload. `None` means no `0xFF` marker is emitted;
  /// `Some(vec![])` would emit a marker followed by zero bytes, which
  /// `serialize` rejects (spec.md §4.1: `MissingPayloadAfterMarker`).
  pub payload: Option<Vec<u8>>,
}

impl Message {
  /// Construct a new, empty message (token, options, and payload all
  /// absent). Most callers build it up from there with [`Options::push`]
  /// and by setting `payload` directly.
  pub fn new(ty: Type, code: Code, message_id: u16) -> Self {
    Self { ty, code, message_id, token: Vec::new(), options: Options::new(), payload: None }
  }

  /// `true` for the canonical empty message (spec.md §3: token length 0,
  /// no options, no payload, code 0.00).
  pub fn is_empty(&self) -> bool {
    self.code.is_empty() && self.token.is_empty() && self.options.is_empty() && self.payload.is_none()
  }

  /// Construct the RST reply to this message's message-ID, per spec.md
  /// §4.5 rejection policy: type RST, same message-ID, zero token, code
  /// 0.00, no options, no payload.
  pub fn reset_reply(message_id: u16) -> Self {
    Message::new(Type::Rst, Code::EMPTY, message_id)
  }

  /// Construct the empty-ACK reply to this message's message-ID, per
  /// spec.md §4.5 acknowledgement policy.
  pub fn ack_reply(message_id: u16) -> Self {
    Message::new(Type::Ack, Code::EMPTY, message_id)
  }
}

/// Parse a datagram payload into a [`Message`].
///
/// This is the inverse of [`serialize`]: `parse(serialize(m))` reproduces
/// `m` up to option ordering (spec.md §8 property 1).
pub fn parse(bytes: &[u8]) -> Result<Message, ParseError> {
  if bytes.len() < 4 {
    return Err(ParseError::ShortHeader);
  }

  let mut r = Reader::new(bytes);
  let byte0 = r.u8().unwrap();
  let ver = byte0 >> 6;
  if ver != VERSION {
    return Err(ParseError::BadVersion);
  }
  let ty = Type::from_bits(byte0 >> 4);
  let tkl = byte0 & 0b1111;
  if tkl > 8 {
    return Err(ParseError::BadTokenLength);
  }

  let code = Code::from_byte(r.u8().unwrap());
  let message_id = r.u16().unwrap();

  let token = r.take(tkl as usize).map_err(|_| ParseError::TruncatedToken)?;

  let options = parse_options(&mut r)?;

  let payload = if r.is_empty() {
    None
  } else {
    let marker = r.u8().map_err(|_| ParseError::TruncatedPayload)?;
    debug_assert_eq!(marker, 0xFF);
    if r.is_empty() {
      return Err(ParseError::MissingPayloadAfterMarker);
    }
    Some(r.take_rest())
  };

  Ok(Message { ty, code, message_id, token, options, payload })
}

fn parse_options(r: &mut Reader<'_>) -> Result<Options, ParseError> {
  let mut opts = Vec::new();
  let mut running_number: u32 = 0;

  loop {
    if r.is_empty() {
      break;
    }
    let peek = r.peek_u8().unwrap();
    if peek == 0xFF {
      break;
    }

    let header = r.u8().unwrap();
    let delta_nibble = header >> 4;
    let len_nibble = header & 0b1111;

    let delta =
      opt::decode_nibble(delta_nibble, r, |_| ParseError::BadOptionDelta)?;
    let len = opt::decode_nibble(len_nibble, r, |_| ParseError::BadOptionLength)?;

    running_number += delta;
    let value = r.take(len as usize).map_err(|_| ParseError::TruncatedOption)?;
    opts.push(Opt { number: running_number, value });
  }

  Ok(opts.into_iter().collect())
}

/// Serialize `message` into `out`, returning the number of bytes written.
///
/// Options are sorted ascending by number before delta-encoding,
/// preserving insertion order among ties (spec.md §3/§4.1).
pub fn serialize(message: &Message, out: &mut [u8]) -> Result<usize, EncodeError> {
  if message.token.len() > 8 {
    return Err(EncodeError::InvalidTokenLength);
  }

  let mut w = Writer::new(out);
  let byte0 = (VERSION << 6) | (message.ty.to_bits() << 4) | (message.token.len() as u8);
  w.u8(byte0).map_err(|_| EncodeError::BufferTooSmall)?;
  w.u8(message.code.to_byte()).map_err(|_| EncodeError::BufferTooSmall)?;
  w.u16(message.message_id).map_err(|_| EncodeError::BufferTooSmall)?;
  w.bytes(&message.token).map_err(|_| EncodeError::BufferTooSmall)?;

  let mut prev_number: u32 = 0;
  for opt in message.options.sorted() {
    if opt.value.len() as u64 > 65535 + 269 {
      return Err(EncodeError::OptionValueTooLong);
    }
    let delta = opt.number - prev_number;
    prev_number = opt.number;

    let (delta_nibble, delta_ext) = opt::encode_nibble(delta);
    let (len_nibble, len_ext) = opt::encode_nibble(opt.value.len() as u32);

    let header = (delta_nibble << 4) | len_nibble;
    w.u8(header).map_err(|_| EncodeError::BufferTooSmall)?;
    w.bytes(&delta_ext).map_err(|_| EncodeError::BufferTooSmall)?;
    w.bytes(&len_ext).map_err(|_| EncodeError::BufferTooSmall)?;
    w.bytes(&opt.value).map_err(|_| EncodeError::BufferTooSmall)?;
  }

  if let Some(payload) = &message.payload {
    w.u8(0xFF).map_err(|_| EncodeError::BufferTooSmall)?;
    w.bytes(payload).map_err(|_| EncodeError::BufferTooSmall)?;
  }

  Ok(w.len())
}

/// Partial parse used when the full [`parse`] fails but the engine still
/// needs to emit a RST for a CON datagram (spec.md §4.1). Succeeds as
/// long as the first 4 bytes are present and the version is valid; does
/// not validate token length, options, or payload.
pub fn parse_type_and_message_id(bytes: &[u8]) -> Result<(Type, u16), ParseError> {
  if bytes.len() < 4 {
    return Err(ParseError::ShortHeader);
  }
  let ver = bytes[0] >> 6;
  if ver != VERSION {
    return Err(ParseError::BadVersion);
  }
  let ty = Type::from_bits(bytes[0] >> 4);
  let message_id = u16::from_be_bytes([bytes[2], bytes[3]]);
  Ok((ty, message_id))
}
