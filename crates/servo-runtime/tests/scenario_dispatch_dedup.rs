//! Activity dispatch with value dedup.
//!
//! GREEN when:
//! - a literal value is sent as-is and recorded as the activity's last value
//! - the same value sent later by digest reaches the handler as the literal
//! - an unchanged value does not rewrite the last-value file
//! - a changed value rewrites `<run_dir>/<sink without "set-">.json`

use std::fs;
use std::sync::Arc;

use servo_cache::{digest, ValueCache};
use servo_runtime::{ActivityDispatcher, ActivityTable};
use servo_schemas::{Handler, ServoError};
use servo_testkit::{CallLog, RecordingHandler};

const SET_LB: &str = "LoadBalancingVmActivities.setLoadBalancer";

#[test]
fn digest_reference_resolves_to_the_cached_literal() {
    let dir = tempfile::tempdir().unwrap();
    let log = CallLog::new();
    let factory_log = log.clone();
    let dispatcher = ActivityDispatcher::new(
        ActivityTable::with_defaults(),
        Arc::new(ValueCache::default()),
        move || -> Result<Box<dyn Handler>, ServoError> {
            Ok(Box::new(RecordingHandler::new("bus", &factory_log)))
        },
        dir.path(),
    );
    let value_file = dir.path().join("loadbalancer.json");

    let first = dispatcher.dispatch(SET_LB, Some("{\"v\":1}")).unwrap();
    assert!(first.changed);
    assert_eq!(fs::read_to_string(&value_file).unwrap(), "{\"v\":1}");

    fs::write(&value_file, "sentinel").unwrap();
    let by_digest = dispatcher
        .dispatch(SET_LB, Some(&digest("{\"v\":1}")))
        .unwrap();
    assert!(!by_digest.changed);
    assert_eq!(fs::read_to_string(&value_file).unwrap(), "sentinel");

    let changed = dispatcher.dispatch(SET_LB, Some("{\"v\":2}")).unwrap();
    assert!(changed.changed);
    assert_eq!(fs::read_to_string(&value_file).unwrap(), "{\"v\":2}");
    assert_eq!(dispatcher.last_value(SET_LB).as_deref(), Some("{\"v\":2}"));

    let values: Vec<String> = log.sends().into_iter().map(|(_, _, v)| v).collect();
    assert_eq!(values, vec!["{\"v\":1}", "{\"v\":1}", "{\"v\":2}"]);
    assert!(log.sends().iter().all(|(_, name, _)| name == "set-loadbalancer"));
}

#[test]
fn missing_run_dir_does_not_fail_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let log = CallLog::new();
    let factory_log = log.clone();
    let dispatcher = ActivityDispatcher::new(
        ActivityTable::with_defaults(),
        Arc::new(ValueCache::default()),
        move || -> Result<Box<dyn Handler>, ServoError> {
            Ok(Box::new(RecordingHandler::new("bus", &factory_log)))
        },
        dir.path().join("absent"),
    );
    dispatcher.dispatch(SET_LB, Some("value")).unwrap();
    assert_eq!(log.sends().len(), 1);
}
