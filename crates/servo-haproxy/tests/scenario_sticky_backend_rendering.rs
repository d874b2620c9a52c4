//! Sticky-session rendering for the one-listener fixture.
//!
//! GREEN when:
//! - the frontend `http-8080` and backend `backend-http-8080` are appended
//!   after the template sections
//! - the backend carries exactly one server entry with the cookie derived
//!   from the `sticky` policy
//! - the file template supplier reads from disk

use std::fs;

use servo_haproxy::{
    Attribute, ConfigSynthesizer, Document, FileTemplate, ListenerMapping, MappingSettings,
    SectionKind,
};
use servo_schemas::{decode_snapshot, Policy, Snapshot};
use servo_testkit::{LOAD_BALANCER_JSON, TEMPLATE_CONF};

const EXPECTED_SECTIONS: &str = "frontend http-8080
  mode http
  option forwardfor except 127.0.0.1
  http-request set-header X-Forwarded-Proto http
  http-request set-header X-Forwarded-Port 8080
  bind 0.0.0.0:8080
  log /var/lib/load-balancer-servo/haproxy.sock local2 info
  log-format httplog\\ %Ts\\ %ci\\ %cp\\ %si\\ %sp\\ %Tq\\ %Tw\\ %Tc\\ %Tr\\ %Tt\\ %ST\\ %U\\ %B\\ %f\\ %b\\ %s\\ %ts\\ %r\\ %hrl
  timeout client 60s
  default_backend backend-http-8080

backend backend-http-8080
  mode http
  balance roundrobin
  timeout server 60s
  http-response set-header Cache-control no-cache=\"set-cookie\"
  cookie AWSELB insert indirect maxidle 300000 maxlife 300000
  server i-3f1b9a2c 10.111.10.215:8080 cookie MTAuMTExLjEwLjIxNQ== check inter 30s rise 3 fall 3
";

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
fn sticky_fixture_renders_expected_sections() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("haproxy_template.conf");
    fs::write(&template, TEMPLATE_CONF).unwrap();

    let out = ConfigSynthesizer::new(FileTemplate::new(&template))
        .apply(&reconciled())
        .unwrap();

    assert!(
        out.ends_with(EXPECTED_SECTIONS),
        "unexpected output:\n{out}"
    );
    let defaults_at = out.find("\ndefaults\n").unwrap();
    let frontend_at = out.find("\nfrontend http-8080\n").unwrap();
    assert!(defaults_at < frontend_at);
}

#[test]
fn backend_has_exactly_one_server_with_cookie() {
    let out = ConfigSynthesizer::new(servo_haproxy::StaticTemplate(TEMPLATE_CONF.to_string()))
        .apply(&reconciled())
        .unwrap();
    let doc = Document::parse(&out).unwrap();
    let Some(Attribute::Servers(servers)) =
        doc.get(SectionKind::Backend, Some("backend-http-8080"), "server")
    else {
        panic!("backend has no servers");
    };
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].param("cookie"), Some("MTAuMTExLjEwLjIxNQ=="));
}

#[test]
fn mapping_settings_override_defaults() {
    let settings = MappingSettings {
        bind_address: "10.111.10.233".to_string(),
        cookie_name: "SERVOID".to_string(),
        ..MappingSettings::default()
    };
    let out = ConfigSynthesizer::new(servo_haproxy::StaticTemplate(TEMPLATE_CONF.to_string()))
        .with_mapper(ListenerMapping::new(settings))
        .apply(&reconciled())
        .unwrap();
    assert!(out.contains("  bind 10.111.10.233:8080\n"));
    assert!(out.contains("  cookie SERVOID insert indirect"));
}
