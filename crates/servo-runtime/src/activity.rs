use std::collections::BTreeMap;

use serde::Serialize;
use servo_config::{default_activities, ActivitySettings};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivitySpec {
    pub name: String,
    pub sink: String,
    pub default: Option<String>,
    pub cached: bool,
}

impl ActivitySpec {
    /// Name of the last-value file under the run directory.
    pub fn value_file_name(&self) -> String {
        let stem = self.sink.strip_prefix("set-").unwrap_or(&self.sink);
        format!("{stem}.json")
    }
}

/// Activity name → how its value is routed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivityTable {
    specs: BTreeMap<String, ActivitySpec>,
}

impl ActivityTable {
    pub fn from_settings(settings: &BTreeMap<String, ActivitySettings>) -> Self {
        let specs = settings
            .iter()
            .map(|(name, s)| {
                (
                    name.clone(),
                    ActivitySpec {
                        name: name.clone(),
                        sink: s.sink.clone(),
                        default: s.default.clone(),
                        cached: s.cached,
                    },
                )
            })
            .collect();
        Self { specs }
    }

    /// The four activities of the load-balancing workflow.
    pub fn with_defaults() -> Self {
        Self::from_settings(&default_activities())
    }

    pub fn insert(&mut self, spec: ActivitySpec) {
        self.specs.insert(spec.name.clone(), spec);
    }

    pub fn get(&self, activity: &str) -> Option<&ActivitySpec> {
        self.specs.get(activity)
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
