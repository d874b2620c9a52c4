//! servo-cache
//!
//! Content-addressed, time-bounded value cache. Large payloads that repeat
//! across activity tasks travel by digest once the receiving side has seen
//! them; a caller hands `resolve` either a literal value or a digest and gets
//! the literal back.
//!
//! Eviction is caller-triggered: every `store` sweeps the stream it touched.
//! Nothing runs in the background.

mod digest;
mod store;

pub use digest::{digest, looks_like_digest, DIGEST_HEX_LEN};
pub use store::{CacheMiss, CachedValue, Resolved, ValueCache, ValueSource, DEFAULT_TTL_SECS};
