//! Idempotent synthesis.
//!
//! GREEN when:
//! - the same template and reconciled load balancer produce byte-identical
//!   text on repeated `apply` calls
//! - feeding the output back in as the template changes nothing
//! - template sections and keys not written by the mapping survive verbatim

use servo_haproxy::{ConfigSynthesizer, Document, SectionKind, StaticTemplate};
use servo_schemas::{decode_snapshot, Policy, Snapshot};
use servo_testkit::{LOAD_BALANCER_JSON, TEMPLATE_CONF};

fn reconciled() -> servo_schemas::LoadBalancer {
    let Snapshot::LoadBalancer(mut lb) = decode_snapshot(LOAD_BALANCER_JSON).unwrap() else {
        panic!("fixture must be a load balancer");
    };
    lb.policies.push(
        Policy::new("sticky", "LBCookieStickinessPolicyType")
            .with_attribute("CookieExpirationPeriod", "300"),
    );
    lb
}

#[test]
fn repeated_apply_is_byte_identical() {
    let synth = ConfigSynthesizer::new(StaticTemplate(TEMPLATE_CONF.to_string()));
    let lb = reconciled();

    let first = synth.apply(&lb).unwrap();
    let second = synth.apply(&lb).unwrap();
    assert_eq!(first, second);
}

#[test]
fn output_as_template_is_a_fixed_point() {
    let lb = reconciled();
    let first = ConfigSynthesizer::new(StaticTemplate(TEMPLATE_CONF.to_string()))
        .apply(&lb)
        .unwrap();
    let again = ConfigSynthesizer::new(StaticTemplate(first.clone()))
        .apply(&lb)
        .unwrap();
    assert_eq!(first, again);
}

#[test]
fn untouched_template_content_is_preserved() {
    let out = ConfigSynthesizer::new(StaticTemplate(TEMPLATE_CONF.to_string()))
        .apply(&reconciled())
        .unwrap();
    let doc = Document::parse(&out).unwrap();

    assert_eq!(doc.preamble, vec!["#template"]);
    let global = doc.section(SectionKind::Global, None).unwrap();
    assert_eq!(
        global.keys(),
        vec!["maxconn", "ulimit-n", "pidfile", "user", "group"]
    );
    assert!(out.contains("  #drop privileges after port binding\n"));
    assert!(out.contains("  errorfile 503 /etc/load-balancer-servo/503.http\n"));
    assert!(out.contains("  timeout connect 5s\n"));
}
