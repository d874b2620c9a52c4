//! Strict keys and defaults.
//!
//! GREEN when:
//! - an empty config yields every documented default
//! - a misspelled key anywhere fails to load and names the offending key
//! - a password written into the bus URL is refused without echoing it
//! - a configured activity table replaces the defaults

use std::time::Duration;

use servo_config::{load_layered_yaml, load_layered_yaml_from_strings};

#[test]
fn empty_config_yields_defaults() {
    let loaded = load_layered_yaml_from_strings(&["{}"]).unwrap();
    let cfg = loaded.config;
    assert_eq!(cfg.cache.ttl(), Duration::from_secs(300));
    assert_eq!(cfg.paths.run_dir.to_str(), Some("/var/run/load-balancer-servo"));
    assert_eq!(cfg.paths.log_dir.to_str(), Some("/var/log/load-balancer-servo"));
    assert_eq!(cfg.pubsub.connect_timeout(), Duration::from_secs(60));
    assert_eq!(cfg.pubsub.read_timeout(), Duration::from_secs(30));
    assert_eq!(cfg.pubsub.receive_timeout(), None);
    assert_eq!(cfg.haproxy.cookie_name, "AWSELB");
    assert_eq!(cfg.haproxy.log_facility, "local2");
    assert_eq!(cfg.activity_table().len(), 4);
}

#[test]
fn misspelled_key_is_rejected() {
    let err = load_layered_yaml_from_strings(&["cache:\n  tll_secs: 10\n"]).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("tll_secs"), "{msg}");

    let err = load_layered_yaml_from_strings(&["cahce:\n  ttl_secs: 10\n"]).unwrap_err();
    assert!(format!("{err:#}").contains("cahce"));
}

#[test]
fn inline_bus_password_is_refused() {
    let err = load_layered_yaml_from_strings(&["pubsub:\n  url: redis://:hunter2@bus:6379\n"])
        .unwrap_err()
        .to_string();
    assert!(err.contains("CONFIG_SECRET_DETECTED"), "{err}");
    assert!(!err.contains("hunter2"));
}

#[test]
fn configured_activities_replace_defaults() {
    let yaml = r#"
activities:
  LoadBalancingVmActivities.setPolicy:
    sink: set-policy
    cached: true
"#;
    let cfg = load_layered_yaml_from_strings(&[yaml]).unwrap().config;
    let table = cfg.activity_table();
    assert_eq!(table.len(), 1);
    assert!(table["LoadBalancingVmActivities.setPolicy"].cached);
}

#[test]
fn layers_load_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let local = dir.path().join("local.yaml");
    std::fs::write(&base, "cache:\n  ttl_secs: 200\n").unwrap();
    std::fs::write(&local, "haproxy:\n  cookie_name: SERVOID\n").unwrap();

    let base = base.to_str().unwrap();
    let local = local.to_str().unwrap();
    let cfg = load_layered_yaml(&[base, local]).unwrap().config;
    assert_eq!(cfg.cache.ttl_secs, 200);
    assert_eq!(cfg.haproxy.cookie_name, "SERVOID");

    let err = load_layered_yaml(&["/nonexistent/servo.yaml"]).unwrap_err();
    assert!(err.to_string().contains("failed to read yaml path"));
}
