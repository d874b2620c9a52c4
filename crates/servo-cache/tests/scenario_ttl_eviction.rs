//! TTL eviction.
//!
//! GREEN when:
//! - an entry untouched for longer than the TTL is absent from `resolve`
//! - the next `store` on that stream drops it from the key set
//! - entries of other streams are untouched by that sweep

use std::time::Duration;

use chrono::{TimeZone, Utc};
use servo_cache::{digest, ValueCache, DEFAULT_TTL_SECS};

#[test]
fn untouched_entry_is_evicted_by_next_store() {
    let cache = ValueCache::new(Duration::from_secs(DEFAULT_TTL_SECS));
    let t0 = Utc.with_ymd_and_hms(2020, 4, 2, 16, 0, 0).unwrap();
    let later = t0 + chrono::Duration::seconds(DEFAULT_TTL_SECS as i64 + 1);

    let old = cache.store_at("s", "old", t0);
    cache.store_at("other", "kept", t0);

    assert!(cache.resolve_at("s", &old, later).is_err());

    let fresh = cache.store_at("s", "fresh", later);
    assert_eq!(cache.keys("s"), vec![fresh]);
    assert_eq!(cache.keys("other"), vec![digest("kept")]);
}

#[test]
fn refreshed_entry_survives() {
    let cache = ValueCache::new(Duration::from_secs(100));
    let t0 = Utc.with_ymd_and_hms(2020, 4, 2, 16, 0, 0).unwrap();
    let step = chrono::Duration::seconds(80);

    let h = cache.store_at("s", "v", t0);
    cache.resolve_at("s", &h, t0 + step).unwrap();
    cache.resolve_at("s", &h, t0 + step + step).unwrap();
    cache.store_at("s", "w", t0 + step + step);
    assert_eq!(cache.len("s"), 2);
}

#[test]
fn explicit_sweep_reports_purged_count() {
    let cache = ValueCache::new(Duration::from_secs(10));
    let t0 = Utc.with_ymd_and_hms(2020, 4, 2, 16, 0, 0).unwrap();
    cache.store_at("s", "a", t0);
    cache.store_at("s", "b", t0);
    assert_eq!(cache.sweep_at("s", t0 + chrono::Duration::seconds(11)), 2);
    assert_eq!(cache.sweep_at("missing", t0), 0);
}
