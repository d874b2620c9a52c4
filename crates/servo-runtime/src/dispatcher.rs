use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use servo_cache::ValueCache;
use servo_handlers::ConfigFileWriter;
use servo_schemas::{Handler, ServoError};
use tracing::{info, warn};

use crate::activity::{ActivitySpec, ActivityTable};

/// Creates a fresh handler for each dispatch.
pub trait HandlerFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn Handler>, ServoError>;
}

impl<F> HandlerFactory for F
where
    F: Fn() -> Result<Box<dyn Handler>, ServoError> + Send + Sync,
{
    fn create(&self) -> Result<Box<dyn Handler>, ServoError> {
        self()
    }
}

/// Result of one dispatched activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dispatch {
    pub activity: String,
    pub sink: String,
    /// Reply for out-only activities; `None` when a parameter was sent.
    pub reply: Option<String>,
    /// Whether a cached activity saw a value different from its last one.
    pub changed: bool,
}

pub struct ActivityDispatcher {
    table: ActivityTable,
    cache: Arc<ValueCache>,
    factory: Box<dyn HandlerFactory>,
    run_dir: PathBuf,
    receive_timeout: Option<Duration>,
    last_values: Mutex<HashMap<String, String>>,
}

impl ActivityDispatcher {
    pub fn new(
        table: ActivityTable,
        cache: Arc<ValueCache>,
        factory: impl HandlerFactory + 'static,
        run_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            table,
            cache,
            factory: Box::new(factory),
            run_dir: run_dir.into(),
            receive_timeout: None,
            last_values: Mutex::new(HashMap::new()),
        }
    }

    /// Bound the reply wait of out-only activities.
    pub fn with_receive_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn table(&self) -> &ActivityTable {
        &self.table
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Last value seen for a cached activity.
    pub fn last_value(&self, activity: &str) -> Option<String> {
        self.last_values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(activity)
            .cloned()
    }

    pub fn dispatch(&self, activity: &str, parameter: Option<&str>) -> Result<Dispatch, ServoError> {
        let spec = self
            .table
            .get(activity)
            .ok_or_else(|| ServoError::decode(format!("unknown activity {activity}")))?;
        info!(activity, has_parameter = parameter.is_some(), "handling activity task");

        let value = match parameter.or(spec.default.as_deref()) {
            Some(v) => v.to_string(),
            None => {
                return Err(ServoError::decode(format!(
                    "activity {activity} requires a parameter"
                )))
            }
        };

        let (value, changed) = if spec.cached {
            let resolved = self.cache.resolve(activity, &value)?;
            let changed = self.remember(spec, &resolved.value);
            (resolved.value, changed)
        } else {
            (value, false)
        };

        let mut handler = self.factory.create()?;
        let result = self.exchange(handler.as_mut(), spec, &value, parameter.is_none());
        handler.close();

        let reply = result?;
        if let Some(reply) = &reply {
            info!(activity, bytes = reply.len(), "response from handler");
        }
        Ok(Dispatch {
            activity: activity.to_string(),
            sink: spec.sink.clone(),
            reply,
            changed,
        })
    }

    fn exchange(
        &self,
        handler: &mut dyn Handler,
        spec: &ActivitySpec,
        value: &str,
        wants_reply: bool,
    ) -> Result<Option<String>, ServoError> {
        handler.send(&spec.sink, value).map_err(|e| {
            warn!(activity = %spec.name, sink = %spec.sink, error = %e, "error sending to handler");
            e
        })?;
        if !wants_reply {
            return Ok(None);
        }
        let reply = match self.receive_timeout {
            Some(t) => handler.receive_timeout(&spec.sink, t),
            None => handler.receive(&spec.sink),
        };
        reply.map(Some).map_err(|e| {
            warn!(activity = %spec.name, sink = %spec.sink, error = %e, "error receiving from handler");
            e
        })
    }

    /// Record `value` as the activity's last value; persist it when it changed.
    fn remember(&self, spec: &ActivitySpec, value: &str) -> bool {
        let mut last = self.last_values.lock().unwrap_or_else(PoisonError::into_inner);
        if last.get(&spec.name).map(String::as_str) == Some(value) {
            return false;
        }
        last.insert(spec.name.clone(), value.to_string());
        drop(last);

        let path = self.run_dir.join(spec.value_file_name());
        if let Err(e) = ConfigFileWriter::new(&path).send(&spec.sink, value) {
            warn!(activity = %spec.name, error = %e, "error writing value file");
        }
        true
    }
}

impl std::fmt::Debug for ActivityDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityDispatcher")
            .field("activities", &self.table.names())
            .field("run_dir", &self.run_dir)
            .field("receive_timeout", &self.receive_timeout)
            .finish_non_exhaustive()
    }
}
