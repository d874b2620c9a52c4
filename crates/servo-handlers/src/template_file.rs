use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use servo_haproxy::{ConfigSynthesizer, TemplateSupplier};
use servo_reconcile::{PolicyRegistry, ReconciliationEngine};
use servo_schemas::{Handler, HandlerKind, ServoError};
use tracing::{debug, info};

/// Write-only sink that turns reconciliation updates into a config file.
///
/// `set-policy` and `set-loadbalancer` go through the engine; every other
/// name is accepted and ignored.
#[derive(Debug)]
pub struct TemplateFileHandler {
    engine: ReconciliationEngine,
}

impl TemplateFileHandler {
    /// Engine over `registry` that synthesizes from `template` and hands the
    /// result to `receiver`.
    pub fn new(
        registry: Arc<PolicyRegistry>,
        template: impl TemplateSupplier + 'static,
        receiver: Box<dyn Handler>,
    ) -> Self {
        Self::from_engine(ReconciliationEngine::new(
            registry,
            ConfigSynthesizer::new(template),
            receiver,
        ))
    }

    pub fn from_engine(engine: ReconciliationEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }
}

impl Handler for TemplateFileHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::TemplateFile
    }

    fn send(&mut self, name: &str, value: &str) -> Result<(), ServoError> {
        if let Some(outcome) = self.engine.handle(name, value)? {
            debug!(name, ?outcome, "template-file update applied");
        }
        Ok(())
    }

    fn receive(&mut self, _name: &str) -> Result<String, ServoError> {
        Err(ServoError::Capability {
            handler: self.kind().as_str(),
            operation: "receive",
        })
    }

    fn receive_timeout(
        &mut self,
        _name: &str,
        _timeout: std::time::Duration,
    ) -> Result<String, ServoError> {
        Err(ServoError::Capability {
            handler: self.kind().as_str(),
            operation: "receive_timeout",
        })
    }

    fn close(&mut self) {
        self.engine.close();
    }
}

// ---------------------------------------------------------------------------
// File receiver
// ---------------------------------------------------------------------------

/// Receiver that writes every value it is sent to one file, owner-only.
///
/// The file is written to a sibling temp path and renamed into place, so a
/// reader never sees a half-written config.
#[derive(Debug, Clone)]
pub struct ConfigFileWriter {
    path: PathBuf,
}

impl ConfigFileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    /// Temp sibling then rename; the sibling never outlives a failed write.
    fn write(&self, contents: &str) -> std::io::Result<()> {
        let tmp = self.temp_path();
        let result = write_owner_only(&tmp, contents).and_then(|()| fs::rename(&tmp, &self.path));
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

fn write_owner_only(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts.open(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

impl Handler for ConfigFileWriter {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Other
    }

    fn send(&mut self, name: &str, value: &str) -> Result<(), ServoError> {
        self.write(value)
            .map_err(|e| ServoError::emission(name, format!("{}: {e}", self.path.display())))?;
        info!(path = %self.path.display(), bytes = value.len(), "config written");
        Ok(())
    }

    fn receive(&mut self, _name: &str) -> Result<String, ServoError> {
        Err(ServoError::Capability {
            handler: "config-file",
            operation: "receive",
        })
    }

    fn close(&mut self) {}
}
