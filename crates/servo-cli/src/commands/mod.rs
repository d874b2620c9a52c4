//! Command handler modules for the `servo` binary.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod dispatch;
pub mod render;

use anyhow::{Context, Result};
use servo_config::LoadedConfig;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "load-balancer-workflow.log";

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Effective config from `--config` layers; defaults when none are given.
pub fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    if path_refs.is_empty() {
        return servo_config::load_layered_yaml_from_strings(&[]);
    }
    servo_config::load_layered_yaml(&path_refs)
}

/// Log to `<log_dir>/load-balancer-workflow.log` when the directory exists,
/// otherwise to stderr so stdout stays clean for command output.
pub fn init_tracing(log_dir: &Path) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    if log_dir.is_dir() {
        let path = log_dir.join(LOG_FILE_NAME);
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

/// Read a snapshot or parameter file as UTF-8 text, dropping a leading BOM.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    String::from_utf8(bytes.to_vec())
        .with_context(|| format!("{} must be UTF-8 text", path.display()))
}
