//! Config hash stability.
//!
//! GREEN when:
//! - the same layers hashed twice give the same hash and canonical JSON
//! - reordering keys within YAML does not change the hash
//! - different values give different hashes
//! - an overlay layer takes effect and the merged hash is stable
//! - the hash is 64 hex characters

use servo_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
cache:
  ttl_secs: 300
paths:
  run_dir: "/var/run/load-balancer-servo"
  log_dir: "/var/log/load-balancer-servo"
pubsub:
  url: "redis://127.0.0.1:6379"
  read_timeout_secs: 30
"#;

const BASE_YAML_REORDERED: &str = r#"
pubsub:
  read_timeout_secs: 30
  url: "redis://127.0.0.1:6379"
paths:
  log_dir: "/var/log/load-balancer-servo"
  run_dir: "/var/run/load-balancer-servo"
cache:
  ttl_secs: 300
"#;

const OVERLAY_YAML: &str = r#"
cache:
  ttl_secs: 120
pubsub:
  receive_timeout_secs: 45
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();

    assert_eq!(
        original.config_hash, reordered.config_hash,
        "reordering keys in YAML must not change the hash"
    );
    assert_eq!(original.canonical_json, reordered.canonical_json);
}

#[test]
fn different_values_produce_different_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, "cache:\n  ttl_secs: 301\n"]).unwrap();
    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn merged_layers_produce_stable_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);

    assert_eq!(a.config.cache.ttl_secs, 120, "overlay should override base ttl");
    assert_eq!(a.config.pubsub.receive_timeout_secs, Some(45));
    assert_eq!(
        a.config.pubsub.url, "redis://127.0.0.1:6379",
        "keys absent from the overlay keep the base value"
    );
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}
