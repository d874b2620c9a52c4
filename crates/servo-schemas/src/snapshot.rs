//! Snapshot adapter: wire-level descriptions → classified, normalized updates.
//!
//! An update carries exactly one load-balancer record and is one of two shapes:
//! - **policy-only**: exactly one policy record and no listeners, backend
//!   servers or backend instances;
//! - **load-balancer**: zero policy records and a non-empty name.
//!
//! Anything else is rejected as [`ServoError::Decode`] before any state is
//! touched. Field names on the raw structs follow the upstream element names
//! (`LoadBalancerName`, `ListenerDescriptions`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::push_unique;
use crate::{
    BackendInstance, BackendServer, HealthCheck, Listener, LoadBalancer, LoadBalancerAttributes,
    Policy, PolicyAttribute, ServoError,
};

// ---------------------------------------------------------------------------
// Raw wire-level structs
// ---------------------------------------------------------------------------

/// Holder for every record of one update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDescriptions {
    #[serde(rename = "LoadBalancerDescriptions", default)]
    pub load_balancers: Vec<RawLoadBalancer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawLoadBalancer {
    pub load_balancer_name: String,
    #[serde(rename = "DNSName")]
    pub dns_name: String,
    pub scheme: Option<String>,
    #[serde(rename = "VPCId")]
    pub vpc_id: Option<String>,
    pub subnets: Vec<String>,
    pub availability_zones: Vec<String>,
    #[serde(rename = "ListenerDescriptions")]
    pub listeners: Vec<RawListenerDescription>,
    #[serde(rename = "PolicyDescriptions")]
    pub policies: Vec<RawPolicy>,
    #[serde(rename = "BackendServerDescriptions")]
    pub backend_servers: Vec<RawBackendServer>,
    pub backend_instances: Vec<RawBackendInstance>,
    pub security_groups: Vec<String>,
    pub source_security_group: Option<String>,
    pub health_check: Option<RawHealthCheck>,
    pub created_time: Option<String>,
    pub load_balancer_attributes: Option<RawLoadBalancerAttributes>,
}

impl RawLoadBalancer {
    fn has_load_balancer_data(&self) -> bool {
        !self.listeners.is_empty()
            || !self.backend_servers.is_empty()
            || !self.backend_instances.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawListenerDescription {
    pub listener: RawListener,
    #[serde(default)]
    pub policy_names: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawListener {
    pub protocol: String,
    pub load_balancer_port: u16,
    #[serde(default)]
    pub instance_protocol: Option<String>,
    pub instance_port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawBackendServer {
    pub instance_port: u16,
    #[serde(default)]
    pub policy_names: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawBackendInstance {
    pub instance_id: String,
    pub instance_ip_address: String,
    #[serde(default)]
    pub report_health_check: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawHealthCheck {
    pub target: String,
    #[serde(default)]
    pub interval: u32,
    #[serde(default)]
    pub timeout: u32,
    /// Sent as text by some producers, hence the lenient decoding.
    #[serde(default, deserialize_with = "lenient_u32")]
    pub unhealthy_threshold: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub healthy_threshold: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawEnabled {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawConnectionSettings {
    #[serde(default)]
    pub idle_timeout: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawLoadBalancerAttributes {
    pub cross_zone_load_balancing: RawEnabled,
    pub access_log: RawEnabled,
    pub connection_draining: RawEnabled,
    pub connection_settings: RawConnectionSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawPolicy {
    pub policy_name: String,
    pub policy_type_name: String,
    #[serde(rename = "PolicyAttributeDescriptions", default)]
    pub attributes: Vec<RawPolicyAttribute>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawPolicyAttribute {
    pub attribute_name: String,
    #[serde(default)]
    pub attribute_value: String,
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(u32),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) if s.trim().is_empty() => Ok(0),
        NumberOrText::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ---------------------------------------------------------------------------
// Classified update
// ---------------------------------------------------------------------------

/// One decoded update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
    Policy(Policy),
    LoadBalancer(LoadBalancer),
}

impl Snapshot {
    pub fn shape(&self) -> &'static str {
        match self {
            Snapshot::Policy(_) => "policy",
            Snapshot::LoadBalancer(_) => "load-balancer",
        }
    }
}

/// Decode the wire text into raw descriptions without classifying.
pub fn decode_descriptions(text: &str) -> Result<RawDescriptions, ServoError> {
    serde_json::from_str(text).map_err(|e| ServoError::decode(format!("invalid descriptions: {e}")))
}

/// Decode and classify in one step.
pub fn decode_snapshot(text: &str) -> Result<Snapshot, ServoError> {
    classify(decode_descriptions(text)?)
}

/// Classify raw descriptions as policy-only or load-balancer.
pub fn classify(raw: RawDescriptions) -> Result<Snapshot, ServoError> {
    let count = raw.load_balancers.len();
    let record = match <[RawLoadBalancer; 1]>::try_from(raw.load_balancers) {
        Ok([record]) => record,
        Err(_) => {
            return Err(ServoError::decode(format!(
                "expected exactly one load balancer record, got {count}"
            )))
        }
    };

    match record.policies.len() {
        0 => normalize_load_balancer(record).map(Snapshot::LoadBalancer),
        1 if !record.has_load_balancer_data() => {
            let policy = record
                .policies
                .into_iter()
                .next()
                .ok_or_else(|| ServoError::decode("policy record vanished"))?;
            normalize_policy(policy).map(Snapshot::Policy)
        }
        1 => Err(ServoError::decode(format!(
            "load balancer '{}' mixes a policy record with listener or backend data",
            record.load_balancer_name
        ))),
        n => Err(ServoError::decode(format!(
            "expected at most one policy record per update, got {n}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Normalization helpers
// ---------------------------------------------------------------------------

fn normalize_policy(raw: RawPolicy) -> Result<Policy, ServoError> {
    let name = raw.policy_name.trim().to_string();
    if name.is_empty() {
        return Err(ServoError::decode("policy record has empty PolicyName"));
    }
    let policy_type = raw.policy_type_name.trim().to_string();
    if policy_type.is_empty() {
        return Err(ServoError::decode(format!(
            "policy '{name}' has empty PolicyTypeName"
        )));
    }

    let mut attributes = Vec::with_capacity(raw.attributes.len());
    for a in raw.attributes {
        let attr_name = a.attribute_name.trim().to_string();
        if attr_name.is_empty() {
            return Err(ServoError::decode(format!(
                "policy '{name}' has an attribute with empty AttributeName"
            )));
        }
        attributes.push(PolicyAttribute::new(attr_name, a.attribute_value));
    }

    Ok(Policy {
        name,
        policy_type,
        attributes,
    })
}

fn normalize_policy_names(raw: Vec<String>) -> Vec<String> {
    let mut names = Vec::with_capacity(raw.len());
    for n in raw {
        let n = n.trim();
        if !n.is_empty() {
            push_unique(&mut names, n.to_string());
        }
    }
    names
}

fn normalize_load_balancer(raw: RawLoadBalancer) -> Result<LoadBalancer, ServoError> {
    let name = raw.load_balancer_name.trim().to_string();
    if name.is_empty() {
        return Err(ServoError::decode(
            "load balancer record has empty LoadBalancerName",
        ));
    }

    let listeners = raw
        .listeners
        .into_iter()
        .map(|d| Listener {
            protocol: d.listener.protocol.trim().to_string(),
            load_balancer_port: d.listener.load_balancer_port,
            instance_protocol: d.listener.instance_protocol,
            instance_port: d.listener.instance_port,
            policy_names: normalize_policy_names(d.policy_names),
        })
        .collect::<Vec<_>>();

    for l in &listeners {
        if l.protocol.is_empty() {
            return Err(ServoError::decode(format!(
                "listener on port {} of '{name}' has empty Protocol",
                l.load_balancer_port
            )));
        }
    }

    let backend_servers = raw
        .backend_servers
        .into_iter()
        .map(|b| BackendServer {
            instance_port: b.instance_port,
            policy_names: normalize_policy_names(b.policy_names),
        })
        .collect();

    let backend_instances = raw
        .backend_instances
        .into_iter()
        .map(|i| BackendInstance {
            instance_id: i.instance_id.trim().to_string(),
            ip_address: i.instance_ip_address.trim().to_string(),
            report_health_check: i.report_health_check,
        })
        .collect();

    let health_check = raw.health_check.map(|h| HealthCheck {
        target: h.target,
        interval_secs: h.interval,
        timeout_secs: h.timeout,
        unhealthy_threshold: h.unhealthy_threshold,
        healthy_threshold: h.healthy_threshold,
    });

    let attributes = raw
        .load_balancer_attributes
        .map(|a| LoadBalancerAttributes {
            cross_zone_load_balancing: a.cross_zone_load_balancing.enabled,
            access_log: a.access_log.enabled,
            connection_draining: a.connection_draining.enabled,
            idle_timeout_secs: a.connection_settings.idle_timeout,
        })
        .unwrap_or_default();

    let created_time = match raw.created_time.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(text) => Some(
            DateTime::parse_from_rfc3339(text)
                .map_err(|e| ServoError::decode(format!("invalid CreatedTime '{text}': {e}")))?
                .with_timezone(&Utc),
        ),
    };

    Ok(LoadBalancer {
        name,
        dns_name: raw.dns_name,
        scheme: raw.scheme,
        vpc_id: raw.vpc_id,
        subnets: raw.subnets,
        security_groups: raw.security_groups,
        listeners,
        backend_servers,
        backend_instances,
        availability_zones: raw.availability_zones,
        health_check,
        attributes,
        created_time,
        // Derived during reconciliation, never taken from the wire.
        policies: Vec::new(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
