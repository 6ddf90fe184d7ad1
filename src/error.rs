//! Error taxonomy for the codec and exchange engine, grounded on
//! `kwap::core::error` and `kwap_msg::MessageParseError`'s split of
//! "what went wrong" from "what were we doing" — but collapsed into a
//! single enum per fallible operation, since this crate only has one
//! caller-facing entry point (`exchange`) instead of the teacher's
//! event-pipeline surface.

use std::fmt;

/// Errors returned by [`crate::msg::parse`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ParseError {
  /// Fewer than 4 bytes were given; not even a header fits.
  ShortHeader,
  /// The top 2 bits of byte 0 were not `01`.
  BadVersion,
  /// The token-length nibble was in the reserved range 9-15.
  BadTokenLength,
  /// The datagram ended while reading the token.
  TruncatedToken,
  /// The datagram ended while reading an option header or value.
  TruncatedOption,
  /// The datagram ended while reading the payload.
  TruncatedPayload,
  /// An option delta nibble was the reserved value 15 outside of the
  /// payload marker position.
  BadOptionDelta,
  /// An option length nibble was the reserved value 15.
  BadOptionLength,
  /// The `0xFF` payload marker was the last byte in the datagram.
  MissingPayloadAfterMarker,
}

impl fmt::Display for ParseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

impl std::error::Error for ParseError {}

/// Errors returned by [`crate::msg::serialize`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EncodeError {
  /// The output buffer was too small to hold the serialized message.
  BufferTooSmall,
  /// The token was longer than 8 bytes.
  InvalidTokenLength,
  /// An option's value was longer than the wire format can express
  /// (65535 + 269 bytes).
  OptionValueTooLong,
}

impl fmt::Display for EncodeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

impl std::error::Error for EncodeError {}

/// Errors returned by [`crate::client::Client::exchange`].
#[derive(Debug)]
pub enum ExchangeError {
  /// The request didn't satisfy `exchange`'s preconditions (spec.md §4.5):
  /// wrong message type, wrong code class, or an oversized token.
  InvalidArgument(&'static str),
  /// The transport failed outright (socket closed, OS error, ...).
  IoError(std::io::Error),
  /// A received datagram could not be parsed, *and* that prevented
  /// progress. Most parse errors are absorbed internally (logged, and
  /// RST'd if the datagram was CON) rather than surfaced here.
  FormatError(ParseError),
  /// ACK retries were exhausted, or the separate response never arrived.
  Timeout,
  /// The peer replied RST to our request.
  PeerReset,
  /// The exchange was cancelled via the caller's cancellation signal.
  Cancelled,
}

impl fmt::Display for ExchangeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::InvalidArgument(why) => write!(f, "invalid argument: {why}"),
      | Self::IoError(e) => write!(f, "io error: {e}"),
      | Self::FormatError(e) => write!(f, "format error: {e}"),
      | Self::Timeout => write!(f, "timed out"),
      | Self::PeerReset => write!(f, "peer reset the exchange"),
      | Self::Cancelled => write!(f, "exchange cancelled"),
    }
  }
}

impl std::error::Error for ExchangeError {}

impl From<std::io::Error> for ExchangeError {
  fn from(e: std::io::Error) -> Self {
    Self::IoError(e)
  }
}
