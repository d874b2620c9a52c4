use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use servo_schemas::Policy;
use tracing::debug;

type Policies = BTreeMap<String, Policy>;

/// Result of a bulk lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Found policies in request order, duplicates collapsed.
    pub policies: Vec<Policy>,
    /// Requested names with no entry, in request order.
    pub missing: Vec<String>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Name → policy. One mutex per instance.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    policies: Mutex<Policies>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access for a multi-step operation.
    pub fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            policies: self.policies.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Store `policy`, replacing any policy of the same name. Returns the
    /// replaced policy.
    pub fn upsert(&self, policy: Policy) -> Option<Policy> {
        self.lock().upsert(policy)
    }

    pub fn resolve_all(&self, names: &[String]) -> Resolution {
        self.lock().resolve_all(names)
    }

    /// Drop every policy not named in `keep`. Returns the removed names, sorted.
    pub fn retain_only(&self, keep: &[String]) -> Vec<String> {
        self.lock().retain_only(keep)
    }

    pub fn get(&self, name: &str) -> Option<Policy> {
        self.lock().policies.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.lock().names()
    }

    pub fn len(&self) -> usize {
        self.lock().policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Held lock on a [`PolicyRegistry`].
pub struct RegistryGuard<'a> {
    policies: MutexGuard<'a, Policies>,
}

impl RegistryGuard<'_> {
    pub fn upsert(&mut self, policy: Policy) -> Option<Policy> {
        debug!(policy = %policy.name, policy_type = %policy.policy_type, "upsert policy");
        self.policies.insert(policy.name.clone(), policy)
    }

    pub fn resolve_all(&self, names: &[String]) -> Resolution {
        let mut seen = BTreeSet::new();
        let mut out = Resolution::default();
        for name in names {
            if !seen.insert(name.as_str()) {
                continue;
            }
            match self.policies.get(name) {
                Some(p) => out.policies.push(p.clone()),
                None => out.missing.push(name.clone()),
            }
        }
        out
    }

    pub fn retain_only(&mut self, keep: &[String]) -> Vec<String> {
        let keep: BTreeSet<&str> = keep.iter().map(String::as_str).collect();
        let removed: Vec<String> = self
            .policies
            .keys()
            .filter(|name| !keep.contains(name.as_str()))
            .cloned()
            .collect();
        for name in &removed {
            debug!(policy = %name, "dropping unreferenced policy");
            self.policies.remove(name);
        }
        removed
    }

    pub fn names(&self) -> Vec<String> {
        self.policies.keys().cloned().collect()
    }
}
