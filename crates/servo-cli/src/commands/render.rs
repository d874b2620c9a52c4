use anyhow::{Context, Result};
use servo_config::ServoConfig;
use servo_handlers::ConfigFileWriter;
use servo_haproxy::{ConfigSynthesizer, FileTemplate, ListenerMapping};
use servo_reconcile::{Outcome, PolicyRegistry, ReconciliationEngine, SET_LOADBALANCER, SET_POLICY};
use servo_runtime::mapping_settings;
use servo_schemas::{Handler, HandlerKind, ServoError};
use std::path::PathBuf;
use std::sync::Arc;

pub struct RenderArgs {
    pub template: PathBuf,
    pub policies: Vec<PathBuf>,
    pub loadbalancer: PathBuf,
    pub out: Option<PathBuf>,
}

/// Prints whatever it is sent.
struct StdoutSink;

impl Handler for StdoutSink {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Other
    }

    fn send(&mut self, _name: &str, value: &str) -> Result<(), ServoError> {
        print!("{value}");
        Ok(())
    }

    fn receive(&mut self, _name: &str) -> Result<String, ServoError> {
        Err(ServoError::Capability {
            handler: "stdout",
            operation: "receive",
        })
    }

    fn close(&mut self) {}
}

pub fn run(cfg: &ServoConfig, args: RenderArgs) -> Result<()> {
    let receiver: Box<dyn Handler> = match &args.out {
        Some(path) => Box::new(ConfigFileWriter::new(path)),
        None => Box::new(StdoutSink),
    };
    let registry = Arc::new(PolicyRegistry::new());
    let synthesizer = ConfigSynthesizer::new(FileTemplate::new(&args.template))
        .with_mapper(ListenerMapping::new(mapping_settings(&cfg.haproxy)));
    let mut engine = ReconciliationEngine::new(Arc::clone(&registry), synthesizer, receiver);

    for path in &args.policies {
        let raw = super::read_text(path)?;
        engine
            .handle(SET_POLICY, &raw)
            .with_context(|| format!("policy {}", path.display()))?;
    }

    let raw = super::read_text(&args.loadbalancer)?;
    let outcome = engine
        .handle(SET_LOADBALANCER, &raw)
        .with_context(|| format!("load balancer {}", args.loadbalancer.display()))?;
    engine.close();

    if let (Some(out), Some(Outcome::Reconciled(report))) = (&args.out, outcome) {
        println!("reconciled=true load_balancer={}", report.load_balancer);
        println!("policies={}", report.policies.join(","));
        println!("removed={}", report.removed.join(","));
        println!("config_bytes={} out={}", report.config_bytes, out.display());
    }
    Ok(())
}
