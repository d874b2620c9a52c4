use std::sync::Arc;

use serde::Serialize;
use servo_haproxy::ConfigSynthesizer;
use servo_schemas::{decode_snapshot, Handler, LoadBalancer, Policy, ServoError, Snapshot};
use tracing::{debug, info, warn};

use crate::registry::PolicyRegistry;

/// Sink name that routes to the policy-only branch.
pub const SET_POLICY: &str = "set-policy";
/// Sink name that routes to the load-balancer branch.
pub const SET_LOADBALANCER: &str = "set-loadbalancer";

const DEFAULT_SINK_NAME: &str = "haproxy-config";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub load_balancer: String,
    /// Resolved policy names, in reference order.
    pub policies: Vec<String>,
    /// Policies dropped by retain-only GC, sorted.
    pub removed: Vec<String>,
    pub config_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    PolicyStored { name: String, replaced: bool },
    Reconciled(ReconcileReport),
}

/// Drives one update at a time through registry → synthesizer → sink.
pub struct ReconciliationEngine {
    registry: Arc<PolicyRegistry>,
    synthesizer: ConfigSynthesizer,
    sink: Box<dyn Handler>,
    sink_name: String,
}

impl ReconciliationEngine {
    pub fn new(
        registry: Arc<PolicyRegistry>,
        synthesizer: ConfigSynthesizer,
        sink: Box<dyn Handler>,
    ) -> Self {
        Self {
            registry,
            synthesizer,
            sink,
            sink_name: DEFAULT_SINK_NAME.to_string(),
        }
    }

    /// Name passed to the sink's `send` with each synthesized config.
    pub fn with_sink_name(mut self, name: impl Into<String>) -> Self {
        self.sink_name = name.into();
        self
    }

    pub fn registry(&self) -> &Arc<PolicyRegistry> {
        &self.registry
    }

    pub fn sink_name(&self) -> &str {
        &self.sink_name
    }

    /// Entry point by sink name. Names other than [`SET_POLICY`] and
    /// [`SET_LOADBALANCER`] are ignored (`Ok(None)`).
    pub fn handle(&mut self, name: &str, value: &str) -> Result<Option<Outcome>, ServoError> {
        let outcome = match name {
            SET_POLICY => match decode_snapshot(value)? {
                Snapshot::Policy(policy) => self.apply_policy(policy),
                other => {
                    return Err(ServoError::decode(format!(
                        "{SET_POLICY} expects a policy update, got a {} update",
                        other.shape()
                    )))
                }
            },
            SET_LOADBALANCER => match decode_snapshot(value)? {
                Snapshot::LoadBalancer(lb) => {
                    Outcome::Reconciled(self.apply_load_balancer(lb)?)
                }
                other => {
                    return Err(ServoError::decode(format!(
                        "{SET_LOADBALANCER} expects a load-balancer update, got a {} update",
                        other.shape()
                    )))
                }
            },
            _ => {
                debug!(name, "ignoring value for unrelated name");
                return Ok(None);
            }
        };
        Ok(Some(outcome))
    }

    pub fn apply(&mut self, snapshot: Snapshot) -> Result<Outcome, ServoError> {
        match snapshot {
            Snapshot::Policy(policy) => Ok(self.apply_policy(policy)),
            Snapshot::LoadBalancer(lb) => self.apply_load_balancer(lb).map(Outcome::Reconciled),
        }
    }

    /// Policy-only branch: upsert and stop. Nothing is emitted.
    pub fn apply_policy(&self, policy: Policy) -> Outcome {
        let name = policy.name.clone();
        let replaced = self.registry.upsert(policy).is_some();
        info!(policy = %name, replaced, "policy stored");
        Outcome::PolicyStored { name, replaced }
    }

    /// Load-balancer branch: resolve → synthesize → emit → retain-only GC.
    pub fn apply_load_balancer(
        &mut self,
        mut lb: LoadBalancer,
    ) -> Result<ReconcileReport, ServoError> {
        let referenced = lb.referenced_policy_names();
        let registry = Arc::clone(&self.registry);
        let mut guard = registry.lock();

        let resolution = guard.resolve_all(&referenced);
        if let Some(err) = ServoError::policy_not_found(&resolution.missing) {
            warn!(
                load_balancer = %lb.name,
                missing = ?resolution.missing,
                "reconciliation aborted: unresolved policies"
            );
            return Err(err);
        }
        lb.policies = resolution.policies;

        let config = self.synthesizer.apply(&lb).map_err(|e| {
            warn!(load_balancer = %lb.name, error = %e, "reconciliation aborted: synthesis failed");
            e
        })?;

        if let Err(e) = self.sink.send(&self.sink_name, &config) {
            warn!(load_balancer = %lb.name, sink = %self.sink_name, error = %e, "emission failed");
            return Err(match e {
                ServoError::Emission { .. } => e,
                other => ServoError::emission(self.sink_name.as_str(), other),
            });
        }

        let removed = guard.retain_only(&referenced);
        info!(
            load_balancer = %lb.name,
            policies = referenced.len(),
            removed = removed.len(),
            bytes = config.len(),
            "load balancer reconciled"
        );
        Ok(ReconcileReport {
            load_balancer: lb.name,
            policies: referenced,
            removed,
            config_bytes: config.len(),
        })
    }

    /// Close the owned sink.
    pub fn close(&mut self) {
        self.sink.close();
    }
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("sink", &self.sink.kind())
            .field("sink_name", &self.sink_name)
            .finish_non_exhaustive()
    }
}
