//! Client-scoped random source for message-ID and token generation
//! (spec.md §4.2).
//!
//! The source's own `Cargo.toml` already carries `rand`/`rand_chacha` for
//! this purpose; this module is the first place that stack actually gets
//! used, seeded once per [`crate::client::Client`] instead of from a
//! process-wide static (spec.md §9, "Global mutable state").

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Produces short, unpredictable byte strings. Collision resistance over
/// the lifetime of a single exchange is the only contract (spec.md §4.2)
/// — this is explicitly not a cryptographic RNG.
#[derive(Debug)]
pub struct Rand(ChaCha8Rng);

impl Rand {
  /// Seed a new source from the current monotonic-ish wall clock reading.
  /// Good enough to avoid repeatedly seeding with the same value across
  /// clients constructed in quick succession without pulling in a true
  /// entropy source.
  pub fn new() -> Self {
    let seed = SystemTime::now().duration_since(UNIX_EPOCH)
                                 .map(|d| d.as_nanos() as u64)
                                 .unwrap_or(0);
    Self(ChaCha8Rng::seed_from_u64(seed))
  }

  /// Seed deterministically — used by tests that need reproducible
  /// message-IDs/tokens.
  pub fn from_seed(seed: u64) -> Self {
    Self(ChaCha8Rng::seed_from_u64(seed))
  }

  /// Generate a 16-bit message ID. The exact bit order of the underlying
  /// random bytes is internal so long as the result is uniform over
  /// `0..=u16::MAX` (spec.md §4.5 step 1).
  pub fn message_id(&mut self) -> u16 {
    (self.0.next_u32() & 0xFFFF) as u16
  }

  /// Generate a 4-byte token (spec.md §4.5 step 2).
  pub fn token(&mut self) -> Vec<u8> {
    let mut token = vec![0u8; 4];
    self.0.fill_bytes(&mut token);
    token
  }

  /// Draw a jittered ACK timeout in milliseconds, uniform in
  /// `[ack_timeout_ms, ack_timeout_ms * ack_random_factor)` (spec.md
  /// §4.5, ACK_WAIT).
  pub fn ack_timeout_ms(&mut self, ack_timeout_ms: u64, ack_random_factor: f64) -> u64 {
    let span = ((ack_timeout_ms as f64) * (ack_random_factor - 1.0)) as u64;
    if span == 0 {
      return ack_timeout_ms;
    }
    ack_timeout_ms + (self.0.next_u64() % span)
  }
}

impl Default for Rand {
  fn default() -> Self {
    Self::new()
  }
}
