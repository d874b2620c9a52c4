//! Shared fixtures and handler doubles for servo tests.
//!
//! Depends on servo-schemas only, so every other crate can take it as a
//! dev-dependency.

mod handlers;

pub use handlers::{Call, CallLog, FailingHandler, Operation, RecordingHandler};

/// Sticky-session policy update: one LB cookie policy, 300 s expiry.
pub const STICKY_POLICY_JSON: &str = r#"{
  "LoadBalancerDescriptions": [{
    "PolicyDescriptions": [{
      "PolicyName": "sticky",
      "PolicyTypeName": "LBCookieStickinessPolicyType",
      "PolicyAttributeDescriptions": [
        {"AttributeName": "CookieExpirationPeriod", "AttributeValue": "300"}
      ]
    }]
  }]
}"#;

/// `balancer-1`: one HTTP 8080 → 8080 listener using `sticky`, one backend
/// server on 8080 using `sticky`, one instance.
pub const LOAD_BALANCER_JSON: &str = r#"{
  "LoadBalancerDescriptions": [{
    "LoadBalancerName": "balancer-1",
    "DNSName": "balancer-1-000174477311.lb.example.internal",
    "ListenerDescriptions": [{
      "Listener": {"Protocol": "HTTP", "LoadBalancerPort": 8080, "InstancePort": 8080},
      "PolicyNames": ["sticky"]
    }],
    "PolicyDescriptions": [],
    "BackendServerDescriptions": [
      {"InstancePort": 8080, "PolicyNames": ["sticky"]}
    ],
    "BackendInstances": [
      {"InstanceId": "i-3f1b9a2c", "InstanceIpAddress": "10.111.10.215", "ReportHealthCheck": true}
    ],
    "AvailabilityZones": ["one"],
    "HealthCheck": {"Target": "TCP:8080", "Interval": 30, "Timeout": 5,
                    "UnhealthyThreshold": 3, "HealthyThreshold": 3},
    "CreatedTime": "2020-04-02T16:18:19.451Z",
    "LoadBalancerAttributes": {
      "CrossZoneLoadBalancing": {"Enabled": false},
      "AccessLog": {"Enabled": true},
      "ConnectionDraining": {"Enabled": false},
      "ConnectionSettings": {"IdleTimeout": 60}
    }
  }]
}"#;

/// Minimal template: global + defaults, no frontends or backends.
pub const TEMPLATE_CONF: &str = "#template
global
 maxconn 100000
 ulimit-n 655360
 pidfile /var/run/haproxy.pid

#drop privileges after port binding
 user servo
 group servo

defaults
 timeout connect     5s
 timeout client      1m
 timeout server      1m
 errorfile 503 /etc/load-balancer-servo/503.http";

/// Policy-only update JSON for an arbitrary policy.
pub fn policy_json(name: &str, policy_type: &str, attributes: &[(&str, &str)]) -> String {
    let attrs: Vec<serde_json::Value> = attributes
        .iter()
        .map(|(k, v)| serde_json::json!({"AttributeName": k, "AttributeValue": v}))
        .collect();
    serde_json::json!({
        "LoadBalancerDescriptions": [{
            "PolicyDescriptions": [{
                "PolicyName": name,
                "PolicyTypeName": policy_type,
                "PolicyAttributeDescriptions": attrs,
            }]
        }]
    })
    .to_string()
}

/// Load-balancer update JSON with one HTTP listener per `(port, policies)`
/// and one instance per ip.
pub fn load_balancer_json(name: &str, listeners: &[(u16, &[&str])], ips: &[&str]) -> String {
    let listeners: Vec<serde_json::Value> = listeners
        .iter()
        .map(|(port, policies)| {
            serde_json::json!({
                "Listener": {"Protocol": "HTTP", "LoadBalancerPort": port, "InstancePort": port},
                "PolicyNames": policies,
            })
        })
        .collect();
    let instances: Vec<serde_json::Value> = ips
        .iter()
        .enumerate()
        .map(|(i, ip)| serde_json::json!({"InstanceId": format!("i-{}", i + 1), "InstanceIpAddress": ip}))
        .collect();
    serde_json::json!({
        "LoadBalancerDescriptions": [{
            "LoadBalancerName": name,
            "ListenerDescriptions": listeners,
            "BackendInstances": instances,
        }]
    })
    .to_string()
}
