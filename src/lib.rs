//! `coap-client-core` is a CoAP (RFC 7252) wire codec and client-side
//! request/response exchange engine.
//!
//! ## CoAP
//! CoAP is an application-level network protocol that copies the semantics
//! of HTTP to an environment conducive to **constrained** devices (weak
//! hardware, small battery capacity, etc.), customarily running over UDP.
//!
//! ### Similarities to HTTP
//! - GET, POST, PUT, DELETE
//! - Headers (renamed to [Options](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10))
//! - Data format independent (via the [Content-Format](https://datatracker.ietf.org/doc/html/rfc7252#section-12.3) Option)
//! - [Response status codes](https://datatracker.ietf.org/doc/html/rfc7252#section-5.9)
//!
//! ### Differences from HTTP
//! - UDP is connectionless, so there's no guaranteed "conversation" between
//!   client and server the way a TCP socket gives you one. CoAP recovers
//!   message delivery itself, via confirmable (CON) messages that are
//!   retransmitted with exponential backoff until acknowledged.
//! - While the _classes_ of status code are the same (2xx, 4xx, 5xx), the
//!   semantics of the individual codes differ; see [`resp`].
//!
//! ## Layout
//! [`msg`] is the wire codec: parsing and encoding a single CoAP message.
//! [`client::Client`] drives a request through to a response, handling
//! retransmission, deduplication, and the ACK/RST acknowledgement dance
//! described in RFC 7252 §4. Everything else is a building block those two
//! use: [`buf`] for bounds-checked byte access, [`opt`] for the options
//! container, [`rand`] and [`timer`] for the engine's randomness and
//! timekeeping, [`socket`] and [`mux`] for the blocking I/O wait, and
//! [`config`] for the tunable protocol constants.

#![cfg_attr(not(test),
            deny(missing_debug_implementations, unreachable_pub, unsafe_code))]
#![deny(missing_docs)]

/// Bounds-checked byte cursor used by the message codec.
pub mod buf;

/// The options container and its delta-encoding.
pub mod opt;

/// Parse/encode errors and the exchange engine's error type.
pub mod error;

/// The CoAP message data model and its wire codec.
pub mod msg;

/// Message-ID and token generation.
pub mod rand;

/// Clock abstraction and the ACK/RESP deadline timers.
pub mod timer;

/// The datagram transport abstraction.
pub mod socket;

/// The single blocking wait that multiplexes a socket read against a timer.
pub mod mux;

/// Exchange engine tuning parameters.
pub mod config;

/// The request/response exchange engine.
pub mod client;

/// Request builder helpers.
pub mod req;

/// RFC 7252 response code constants.
pub mod resp;

#[cfg(test)]
mod test_support;
