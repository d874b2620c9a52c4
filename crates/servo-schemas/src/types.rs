use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One `(name, value)` pair of a policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyAttribute {
    pub name: String,
    pub value: String,
}

impl PolicyAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A named policy. Identity is `name`; a re-upsert replaces it wholesale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    pub policy_type: String,
    /// Attribute order is preserved as received.
    pub attributes: Vec<PolicyAttribute>,
}

impl Policy {
    pub fn new(name: impl Into<String>, policy_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy_type: policy_type.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(PolicyAttribute::new(name, value));
        self
    }

    /// First value for `name`, if any.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub protocol: String,
    pub load_balancer_port: u16,
    pub instance_protocol: Option<String>,
    pub instance_port: u16,
    /// Referenced policy names, duplicates removed, first occurrence kept.
    pub policy_names: Vec<String>,
}

impl Listener {
    pub fn new(protocol: impl Into<String>, load_balancer_port: u16, instance_port: u16) -> Self {
        Self {
            protocol: protocol.into(),
            load_balancer_port,
            instance_protocol: None,
            instance_port,
            policy_names: Vec::new(),
        }
    }

    pub fn with_policy(mut self, name: impl Into<String>) -> Self {
        push_unique(&mut self.policy_names, name.into());
        self
    }

    /// `true` for HTTP and HTTPS listeners (layer 7 proxying).
    pub fn is_http(&self) -> bool {
        matches!(
            self.protocol.to_ascii_lowercase().as_str(),
            "http" | "https"
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendServer {
    pub instance_port: u16,
    pub policy_names: Vec<String>,
}

impl BackendServer {
    pub fn new(instance_port: u16) -> Self {
        Self {
            instance_port,
            policy_names: Vec::new(),
        }
    }

    pub fn with_policy(mut self, name: impl Into<String>) -> Self {
        push_unique(&mut self.policy_names, name.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendInstance {
    pub instance_id: String,
    pub ip_address: String,
    pub report_health_check: bool,
}

impl BackendInstance {
    pub fn new(instance_id: impl Into<String>, ip_address: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            ip_address: ip_address.into(),
            report_health_check: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// e.g. `TCP:8080` or `HTTP:80/index.html`
    pub target: String,
    pub interval_secs: u32,
    pub timeout_secs: u32,
    pub unhealthy_threshold: u32,
    pub healthy_threshold: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerAttributes {
    pub cross_zone_load_balancing: bool,
    pub access_log: bool,
    pub connection_draining: bool,
    /// Idle timeout of client and server connections, seconds.
    pub idle_timeout_secs: Option<u32>,
}

/// A load balancer as reconciled by the engine.
///
/// `policies` is derived data: the engine fills it with the resolved policy
/// objects for every name referenced by a listener or backend server. It is
/// never taken from the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub name: String,
    pub dns_name: String,
    pub scheme: Option<String>,
    pub vpc_id: Option<String>,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub listeners: Vec<Listener>,
    pub backend_servers: Vec<BackendServer>,
    pub backend_instances: Vec<BackendInstance>,
    pub availability_zones: Vec<String>,
    pub health_check: Option<HealthCheck>,
    pub attributes: LoadBalancerAttributes,
    pub created_time: Option<DateTime<Utc>>,
    pub policies: Vec<Policy>,
}

impl LoadBalancer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Union of policy names referenced by listeners, then backend servers.
    ///
    /// Duplicates collapse; order is stable by first occurrence.
    pub fn referenced_policy_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for listener in &self.listeners {
            for name in &listener.policy_names {
                push_unique(&mut names, name.clone());
            }
        }
        for backend in &self.backend_servers {
            for name in &backend.policy_names {
                push_unique(&mut names, name.clone());
            }
        }
        names
    }

    /// Resolved policy by name (only meaningful after reconciliation).
    pub fn policy(&self, name: &str) -> Option<&Policy> {
        self.policies.iter().find(|p| p.name == name)
    }
}

pub(crate) fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}
