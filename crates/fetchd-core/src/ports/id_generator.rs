//! IdGenerator port - request id generation.
//!
//! Stores call this when a request is created; the generated id is the
//! record's key for the store's whole lifetime.

use crate::domain::RequestId;
use crate::ports::Clock;
use ulid::Ulid;

/// How many ids a store draws before giving up on finding an unused one.
pub const MAX_ID_ATTEMPTS: usize = 8;

/// Generates request ids.
///
/// # Thread Safety
/// - `Send + Sync`: shared by every caller of the store.
///
/// # Collisions
/// Stores redraw on a collision, at most `MAX_ID_ATTEMPTS` times, and then
/// fail with `Internal`. A generator that keeps repeating itself is a bug in
/// the generator, never a reason to block the store.
pub trait IdGenerator: Send + Sync {
    fn generate_request_id(&self) -> RequestId;
}

/// ULID based generator: millisecond timestamp from `C` + 80 random bits.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl Default for UlidGenerator<crate::ports::SystemClock> {
    fn default() -> Self {
        Self::new(crate::ports::SystemClock)
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_request_id(&self) -> RequestId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        RequestId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
