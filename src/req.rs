//! Request construction (spec.md's supplemental feature: an ergonomic
//! builder over the bare [`crate::msg::Message`] codec type).
//!
//! Grounded on `kwap::req::{Req, ReqBuilder, method}`, minus the
//! type-level `Config` parameterization — this crate has one message
//! representation, so the builder mutates a [`crate::msg::Message`]
//! directly instead of a generic `config::Message<Cfg>`.

use crate::msg::{method, Code, Message, Type};

/// The four CoAP request methods this crate constructs requests for
/// (RFC 7252 §5.8). Re-exported as a type so call sites can write
/// `Method::Get` instead of reaching into [`crate::msg::method`] for a
/// bare [`Code`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Method {
  /// GET (0.01)
  Get,
  /// POST (0.02)
  Post,
  /// PUT (0.03)
  Put,
  /// DELETE (0.04)
  Delete,
}

impl Method {
  fn code(self) -> Code {
    match self {
      | Self::Get => method::GET,
      | Self::Post => method::POST,
      | Self::Put => method::PUT,
      | Self::Delete => method::DELETE,
    }
  }
}

/// Uri-Host option number (RFC 7252 §5.10.1).
const OPT_URI_HOST: u32 = 3;
/// Uri-Port option number (RFC 7252 §5.10.1).
const OPT_URI_PORT: u32 = 7;
/// Uri-Path option number (RFC 7252 §5.10.1).
const OPT_URI_PATH: u32 = 11;
/// Content-Format option number (RFC 7252 §5.10.3).
const OPT_CONTENT_FORMAT: u32 = 12;

/// Builds a request [`Message`] ready to hand to
/// [`crate::client::Client::exchange`].
///
/// The message ID and token are left unset (zero/empty) here; `exchange`
/// assigns both itself immediately before sending, per spec.md §4.5
/// steps 1-2 — a caller-supplied ID or token would just be overwritten.
#[derive(Debug, Clone)]
pub struct ReqBuilder {
  message: Message,
}

impl ReqBuilder {
  /// Start building a request with the given method. `con` selects
  /// confirmable (retried with ACK semantics) vs non-confirmable
  /// delivery (spec.md §4.1).
  pub fn new(method: Method, con: bool) -> Self {
    let ty = if con { Type::Con } else { Type::Non };
    Self { message: Message::new(ty, method.code(), 0) }
  }

  /// Shorthand for `ReqBuilder::new(Method::Get, true)`.
  pub fn get() -> Self {
    Self::new(Method::Get, true)
  }

  /// Shorthand for `ReqBuilder::new(Method::Post, true)`.
  pub fn post() -> Self {
    Self::new(Method::Post, true)
  }

  /// Shorthand for `ReqBuilder::new(Method::Put, true)`.
  pub fn put() -> Self {
    Self::new(Method::Put, true)
  }

  /// Shorthand for `ReqBuilder::new(Method::Delete, true)`.
  pub fn delete() -> Self {
    Self::new(Method::Delete, true)
  }

  /// Set the Uri-Host option, naming the origin server. Not required when
  /// the target is already identified by the connected
  /// [`crate::socket::DatagramEndpoint`]; useful when a proxy or virtual
  /// host needs the original hostname carried in-band.
  pub fn host(mut self, host: impl AsRef<str>) -> Self {
    self.message.options.push(OPT_URI_HOST, host.as_ref().as_bytes().to_vec());
    self
  }

  /// Set the Uri-Port option.
  pub fn port(mut self, port: u16) -> Self {
    self.message.options.push(OPT_URI_PORT, port.to_be_bytes().to_vec());
    self
  }

  /// Append one Uri-Path segment. Call once per path segment, in order
  /// (e.g. `.path("sensors").path("temperature")` for `/sensors/temperature`).
  pub fn path(mut self, segment: impl AsRef<str>) -> Self {
    self.message.options.push(OPT_URI_PATH, segment.as_ref().as_bytes().to_vec());
    self
  }

  /// Set the Content-Format option (RFC 7252 §12.3 registry values, e.g.
  /// 0 for `text/plain`, 50 for `application/json`).
  pub fn content_format(mut self, format: u16) -> Self {
    self.message.options.push(OPT_CONTENT_FORMAT, format.to_be_bytes().to_vec());
    self
  }

  /// Set an arbitrary option by number. For options without a dedicated
  /// builder method.
  pub fn option(mut self, number: u32, value: impl Into<Vec<u8>>) -> Self {
    self.message.options.push(number, value);
    self
  }

  /// Attach a request payload.
  pub fn payload(mut self, body: impl Into<Vec<u8>>) -> Self {
    self.message.payload = Some(body.into());
    self
  }

  /// Finish building, yielding the underlying [`Message`].
  pub fn build(self) -> Message {
    self.message
  }
}
