use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use servo_schemas::ServoError;
use tracing::{debug, info};

use crate::digest::{digest, looks_like_digest};

/// Default time-to-live, seconds of elapsed time since last access.
pub const DEFAULT_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedValue {
    pub value: String,
    pub last_access: DateTime<Utc>,
}

impl CachedValue {
    /// Stale once strictly more than `ttl` has elapsed. A clock that went
    /// backwards never makes an entry stale.
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (now - self.last_access).to_std() {
            Ok(elapsed) => elapsed > ttl,
            Err(_) => false,
        }
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// The caller sent a digest and the cache held its value.
    Cache,
    /// The caller sent the value itself; it is now cached under its digest.
    Literal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    pub digest: String,
    pub source: ValueSource,
}

/// A digest reference with no live entry behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMiss {
    pub stream: String,
    pub digest: String,
}

impl fmt::Display for CacheMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no cached value for {} with digest {}", self.stream, self.digest)
    }
}

impl std::error::Error for CacheMiss {}

impl From<CacheMiss> for ServoError {
    fn from(miss: CacheMiss) -> Self {
        ServoError::ValueNotCached {
            stream: miss.stream,
            digest: miss.digest,
        }
    }
}

type Streams = HashMap<String, HashMap<String, CachedValue>>;

/// Per-stream map of digest → value with TTL eviction.
///
/// One mutex guards every stream; `store` and `resolve` are each a single
/// critical section.
#[derive(Debug)]
pub struct ValueCache {
    ttl: Duration,
    streams: Mutex<Streams>,
}

impl Default for ValueCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TTL_SECS))
    }
}

impl ValueCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            streams: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache `value` under its digest in `stream` and return the digest.
    pub fn store(&self, stream: &str, value: &str) -> String {
        self.store_at(stream, value, Utc::now())
    }

    /// [`ValueCache::store`] with an explicit clock.
    pub fn store_at(&self, stream: &str, value: &str, now: DateTime<Utc>) -> String {
        let key = digest(value);
        let mut streams = self.lock();
        let entries = streams.entry(stream.to_string()).or_default();
        entries.insert(
            key.clone(),
            CachedValue {
                value: value.to_string(),
                last_access: now,
            },
        );
        sweep(stream, entries, now, self.ttl);
        key
    }

    /// Resolve a literal value or a digest reference.
    ///
    /// A digest hit refreshes the entry. A digest with no live entry (absent
    /// or stale) is a miss; the caller must not guess the value. Anything that
    /// is not a digest is stored and returned as-is.
    pub fn resolve(&self, stream: &str, candidate: &str) -> Result<Resolved, CacheMiss> {
        self.resolve_at(stream, candidate, Utc::now())
    }

    /// [`ValueCache::resolve`] with an explicit clock.
    pub fn resolve_at(
        &self,
        stream: &str,
        candidate: &str,
        now: DateTime<Utc>,
    ) -> Result<Resolved, CacheMiss> {
        if !looks_like_digest(candidate) {
            debug!(stream, "caching literal value");
            let key = self.store_at(stream, candidate, now);
            return Ok(Resolved {
                value: candidate.to_string(),
                digest: key,
                source: ValueSource::Literal,
            });
        }

        let key = candidate.to_ascii_lowercase();
        let mut streams = self.lock();
        let entries = streams.entry(stream.to_string()).or_default();

        let hit = match entries.get_mut(&key) {
            Some(entry) if !entry.is_stale(now, self.ttl) => {
                entry.last_access = now;
                Some(entry.value.clone())
            }
            _ => None,
        };
        sweep(stream, entries, now, self.ttl);

        match hit {
            Some(value) => {
                debug!(stream, digest = %key, "using cached value");
                Ok(Resolved {
                    value,
                    digest: key,
                    source: ValueSource::Cache,
                })
            }
            None => {
                debug!(stream, digest = %key, "cache miss");
                Err(CacheMiss {
                    stream: stream.to_string(),
                    digest: key,
                })
            }
        }
    }

    /// Entry for `digest` without refreshing it. Stale entries still show
    /// until a sweep removes them.
    pub fn peek(&self, stream: &str, digest: &str) -> Option<CachedValue> {
        self.lock()
            .get(stream)
            .and_then(|entries| entries.get(&digest.to_ascii_lowercase()))
            .cloned()
    }

    /// Digests currently held for `stream`, sorted.
    pub fn keys(&self, stream: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .lock()
            .get(stream)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    pub fn len(&self, stream: &str) -> usize {
        self.lock().get(stream).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self, stream: &str) -> bool {
        self.len(stream) == 0
    }

    /// Run a maintenance sweep on `stream` now; returns the number purged.
    pub fn sweep_at(&self, stream: &str, now: DateTime<Utc>) -> usize {
        match self.lock().get_mut(stream) {
            Some(entries) => sweep(stream, entries, now, self.ttl),
            None => 0,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Streams> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sweep(
    stream: &str,
    entries: &mut HashMap<String, CachedValue>,
    now: DateTime<Utc>,
    ttl: Duration,
) -> usize {
    let before = entries.len();
    entries.retain(|key, entry| {
        let stale = entry.is_stale(now, ttl);
        if stale {
            info!(stream, digest = %key, "removing stale cache key");
        }
        !stale
    });
    before - entries.len()
}
