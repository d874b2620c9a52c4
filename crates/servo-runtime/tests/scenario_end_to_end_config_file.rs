//! End to end: activities → template-file handler → config on disk.
//!
//! GREEN when:
//! - setPolicy followed by setLoadBalancer (the latter sent by digest after a
//!   first literal send) writes the synthesized config to `paths.output`
//! - the config carries the configured stickiness cookie name
//! - the policy registry outlives the per-dispatch handlers

use std::fs;
use std::sync::Arc;

use servo_config::load_layered_yaml_from_strings;
use servo_cache::digest;
use servo_reconcile::PolicyRegistry;
use servo_runtime::{config_file_handler, dispatcher_from_config};
use servo_schemas::{Handler, ServoError};
use servo_testkit::{LOAD_BALANCER_JSON, STICKY_POLICY_JSON, TEMPLATE_CONF};

#[test]
fn dispatched_updates_produce_the_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("haproxy_template.conf");
    let output = dir.path().join("haproxy.cfg");
    fs::write(&template, TEMPLATE_CONF).unwrap();

    let yaml = format!(
        "paths:\n  run_dir: {run}\n  template: {tpl}\n  output: {out}\nhaproxy:\n  cookie_name: SERVOID\n",
        run = dir.path().display(),
        tpl = template.display(),
        out = output.display(),
    );
    let cfg = load_layered_yaml_from_strings(&[yaml.as_str()]).unwrap().config;

    let registry = Arc::new(PolicyRegistry::new());
    let factory_cfg = cfg.clone();
    let factory_registry = Arc::clone(&registry);
    let dispatcher = dispatcher_from_config(&cfg, move || -> Result<Box<dyn Handler>, ServoError> {
        Ok(Box::new(config_file_handler(
            &factory_cfg,
            Arc::clone(&factory_registry),
        )))
    });

    dispatcher
        .dispatch("LoadBalancingVmActivities.setPolicy", Some(STICKY_POLICY_JSON))
        .unwrap();
    assert_eq!(registry.names(), vec!["sticky"]);
    assert!(!output.exists());

    dispatcher
        .dispatch("LoadBalancingVmActivities.setLoadBalancer", Some(LOAD_BALANCER_JSON))
        .unwrap();
    let first = fs::read_to_string(&output).unwrap();
    assert!(first.contains("cookie SERVOID insert indirect"));

    fs::remove_file(&output).unwrap();
    dispatcher
        .dispatch(
            "LoadBalancingVmActivities.setLoadBalancer",
            Some(&digest(LOAD_BALANCER_JSON)),
        )
        .unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), first);
    assert!(dir.path().join("policy.json").exists());
    assert!(dir.path().join("loadbalancer.json").exists());
}
