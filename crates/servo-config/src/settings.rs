use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Prefix shared by every activity name of the load-balancing workflow.
pub const ACTIVITY_PREFIX: &str = "LoadBalancingVmActivities.";

/// Effective servo configuration. Every field has a default; unknown keys are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ServoConfig {
    pub cache: CacheSettings,
    pub paths: PathSettings,
    pub pubsub: PubSubSettings,
    pub haproxy: HaproxySettings,
    /// Replaces the default table as a whole when present.
    pub activities: BTreeMap<String, ActivitySettings>,
}

impl ServoConfig {
    /// Activity table, falling back to the built-in four when none is
    /// configured.
    pub fn activity_table(&self) -> BTreeMap<String, ActivitySettings> {
        if self.activities.is_empty() {
            default_activities()
        } else {
            self.activities.clone()
        }
    }

    /// Semantic checks serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.cache.ttl_secs == 0 {
            bail!("CONFIG_INVALID cache.ttl_secs must be greater than zero");
        }
        if self.pubsub.url.trim().is_empty() {
            bail!("CONFIG_INVALID pubsub.url must not be empty");
        }
        if self.haproxy.default_idle_timeout_secs == 0 {
            bail!("CONFIG_INVALID haproxy.default_idle_timeout_secs must be greater than zero");
        }
        for (name, activity) in &self.activities {
            if activity.sink.trim().is_empty() {
                bail!("CONFIG_INVALID activities.{name}.sink must not be empty");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    /// Seconds of elapsed time since last access before a value is stale.
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathSettings {
    pub run_dir: PathBuf,
    pub log_dir: PathBuf,
    pub template: PathBuf,
    pub output: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            run_dir: PathBuf::from("/var/run/load-balancer-servo"),
            log_dir: PathBuf::from("/var/log/load-balancer-servo"),
            template: PathBuf::from("/etc/load-balancer-servo/haproxy_template.conf"),
            output: PathBuf::from("/var/run/load-balancer-servo/haproxy.cfg"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PubSubSettings {
    pub url: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    /// Bound on a reply wait; unbounded when unset.
    pub receive_timeout_secs: Option<u64>,
}

impl Default for PubSubSettings {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connect_timeout_secs: 60,
            read_timeout_secs: 30,
            receive_timeout_secs: None,
        }
    }
}

impl PubSubSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn receive_timeout(&self) -> Option<Duration> {
        self.receive_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HaproxySettings {
    pub bind_address: String,
    pub log_socket: String,
    pub log_facility: String,
    pub log_level: String,
    pub log_format: String,
    pub cookie_name: String,
    pub default_idle_timeout_secs: u32,
    pub forwardfor_except: String,
}

impl Default for HaproxySettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            log_socket: "/var/lib/load-balancer-servo/haproxy.sock".to_string(),
            log_facility: "local2".to_string(),
            log_level: "info".to_string(),
            log_format:
                "httplog %Ts %ci %cp %si %sp %Tq %Tw %Tc %Tr %Tt %ST %U %B %f %b %s %ts %r %hrl"
                    .to_string(),
            cookie_name: "AWSELB".to_string(),
            default_idle_timeout_secs: 60,
            forwardfor_except: "127.0.0.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivitySettings {
    /// Handler name the value is sent under.
    pub sink: String,
    /// Value sent when the task carries no parameter.
    #[serde(default)]
    pub default: Option<String>,
    /// Resolve values through the value cache.
    #[serde(default)]
    pub cached: bool,
}

pub fn default_activities() -> BTreeMap<String, ActivitySettings> {
    let entry = |sink: &str, default: Option<&str>, cached: bool| ActivitySettings {
        sink: sink.to_string(),
        default: default.map(str::to_string),
        cached,
    };
    [
        (
            "getCloudWatchMetrics",
            entry("get-cloudwatch-metrics", Some("GetCloudWatchMetrics"), false),
        ),
        (
            "getInstanceStatus",
            entry("get-instance-status", Some("GetInstanceStatus"), false),
        ),
        ("setLoadBalancer", entry("set-loadbalancer", None, true)),
        ("setPolicy", entry("set-policy", None, true)),
    ]
    .into_iter()
    .map(|(name, settings)| (format!("{ACTIVITY_PREFIX}{name}"), settings))
    .collect()
}
