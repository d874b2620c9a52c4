//! Fail-closed resolution.
//!
//! GREEN when a load balancer referencing {A, B} with only A registered:
//! - fails with PolicyNotFound naming B
//! - emits nothing
//! - leaves the registry exactly as it was (including unrelated entries)

use std::sync::Arc;

use servo_haproxy::{ConfigSynthesizer, StaticTemplate};
use servo_reconcile::{PolicyRegistry, ReconciliationEngine, SET_LOADBALANCER, SET_POLICY};
use servo_schemas::ServoError;
use servo_testkit::{load_balancer_json, policy_json, CallLog, RecordingHandler, TEMPLATE_CONF};

#[test]
fn missing_policy_aborts_without_side_effects() {
    let log = CallLog::new();
    let registry = Arc::new(PolicyRegistry::new());
    let mut engine = ReconciliationEngine::new(
        Arc::clone(&registry),
        ConfigSynthesizer::new(StaticTemplate(TEMPLATE_CONF.to_string())),
        Box::new(RecordingHandler::new("config", &log)),
    );

    let cookie = "LBCookieStickinessPolicyType";
    engine
        .handle(SET_POLICY, &policy_json("A", cookie, &[("CookieExpirationPeriod", "60")]))
        .unwrap();
    engine
        .handle(SET_POLICY, &policy_json("Z", cookie, &[]))
        .unwrap();
    let before: Vec<_> = registry
        .names()
        .iter()
        .filter_map(|n| registry.get(n))
        .collect();

    let lb = load_balancer_json("balancer-1", &[(80, &["A", "B"][..])], &["10.0.0.1"]);
    let err = engine.handle(SET_LOADBALANCER, &lb).unwrap_err();

    match err {
        ServoError::PolicyNotFound { name, missing } => {
            assert_eq!(name, "B");
            assert_eq!(missing, vec!["B"]);
        }
        other => panic!("expected PolicyNotFound, got {other:?}"),
    }
    assert!(log.sends().is_empty(), "nothing may be emitted");

    let after: Vec<_> = registry
        .names()
        .iter()
        .filter_map(|n| registry.get(n))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn all_missing_names_are_reported() {
    let log = CallLog::new();
    let mut engine = ReconciliationEngine::new(
        Arc::new(PolicyRegistry::new()),
        ConfigSynthesizer::new(StaticTemplate(TEMPLATE_CONF.to_string())),
        Box::new(RecordingHandler::new("config", &log)),
    );
    let lb = load_balancer_json("lb", &[(80, &["y", "x"][..]), (81, &["y"][..])], &[]);
    let err = engine.handle(SET_LOADBALANCER, &lb).unwrap_err();
    assert_eq!(
        err,
        ServoError::PolicyNotFound {
            name: "y".to_string(),
            missing: vec!["x".to_string(), "y".to_string()],
        }
    );
}
