//! Dedup round-trip.
//!
//! GREEN when:
//! - `store(stream, V)` returns the digest of V and `resolve(stream, digest)`
//!   returns V while the entry is live
//! - sending the literal a second time hands back the same digest, so the
//!   producer can switch to sending the digest only
//! - a 40-hex SHA-1 reference from the workflow peer hits the cached value

use servo_cache::{digest, ValueCache, ValueSource};

const LOAD_BALANCER: &str = r#"{"LoadBalancerDescriptions":[{"LoadBalancerName":"balancer-1"}]}"#;

#[test]
fn stored_value_resolves_by_digest() {
    let cache = ValueCache::default();
    let h = cache.store("LoadBalancingVmActivities.setLoadBalancer", LOAD_BALANCER);

    assert_eq!(h, digest(LOAD_BALANCER));
    let r = cache
        .resolve("LoadBalancingVmActivities.setLoadBalancer", &h)
        .unwrap();
    assert_eq!(r.value, LOAD_BALANCER);
    assert_eq!(r.source, ValueSource::Cache);
}

#[test]
fn literal_then_digest_round_trip() {
    let cache = ValueCache::default();
    let stream = "LoadBalancingVmActivities.setPolicy";

    let first = cache.resolve(stream, LOAD_BALANCER).unwrap();
    assert_eq!(first.source, ValueSource::Literal);

    let second = cache.resolve(stream, &first.digest).unwrap();
    assert_eq!(second.value, LOAD_BALANCER);
    assert_eq!(second.digest, first.digest);
}

#[test]
fn peer_sha1_reference_resolves_to_cached_value() {
    let cache = ValueCache::default();
    let stream = "LoadBalancingVmActivities.setPolicy";
    cache.store(stream, "<policy/>");

    let r = cache
        .resolve(stream, "393e07074aab688fdd2d4d74cfff0f9447691658")
        .unwrap();
    assert_eq!(r.value, "<policy/>");
    assert_eq!(r.source, ValueSource::Cache);
}

#[test]
fn unknown_digest_is_a_miss_not_a_literal() {
    let cache = ValueCache::default();
    let never_stored = digest("never stored");
    let miss = cache.resolve("s", &never_stored).unwrap_err();
    assert_eq!(miss.digest, never_stored);
    assert!(cache.is_empty("s"));
}

#[test]
fn every_key_is_the_digest_of_its_value() {
    let cache = ValueCache::default();
    for v in ["a", "b", "a", LOAD_BALANCER] {
        cache.store("s", v);
    }
    for key in cache.keys("s") {
        let entry = cache.peek("s", &key).unwrap();
        assert_eq!(digest(&entry.value), key);
    }
    assert_eq!(cache.len("s"), 3);
}
