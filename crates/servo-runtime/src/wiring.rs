//! Builds runtime parts from the effective configuration.

use std::sync::Arc;

use servo_cache::ValueCache;
use servo_config::{HaproxySettings, PubSubSettings, ServoConfig};
use servo_handlers::{
    ConfigFileWriter, PubSubHandler, RedisSettings, RedisTransport, TemplateFileHandler,
};
use servo_haproxy::{ConfigSynthesizer, FileTemplate, ListenerMapping, MappingSettings};
use servo_reconcile::{PolicyRegistry, ReconciliationEngine};
use servo_schemas::{Handler, ServoError};

use crate::activity::ActivityTable;
use crate::dispatcher::{ActivityDispatcher, HandlerFactory};

pub fn mapping_settings(s: &HaproxySettings) -> MappingSettings {
    MappingSettings {
        bind_address: s.bind_address.clone(),
        log_socket: s.log_socket.clone(),
        log_facility: s.log_facility.clone(),
        log_level: s.log_level.clone(),
        log_format: s.log_format.clone(),
        cookie_name: s.cookie_name.clone(),
        default_idle_timeout_secs: s.default_idle_timeout_secs,
        forwardfor_except: s.forwardfor_except.clone(),
    }
}

pub fn redis_settings(s: &PubSubSettings) -> RedisSettings {
    RedisSettings {
        url: s.url.clone(),
        connect_timeout: s.connect_timeout(),
        read_timeout: s.read_timeout(),
    }
}

/// A new Redis-backed pub/sub handler per call.
pub fn redis_factory(s: &PubSubSettings) -> impl HandlerFactory {
    let settings = redis_settings(s);
    move || -> Result<Box<dyn Handler>, ServoError> {
        let transport = RedisTransport::open(settings.clone())?;
        Ok(Box::new(PubSubHandler::new(transport)))
    }
}

/// Template-file handler that reads `paths.template` and writes
/// `paths.output`, using the configured mapping.
pub fn config_file_handler(cfg: &ServoConfig, registry: Arc<PolicyRegistry>) -> TemplateFileHandler {
    let synthesizer = ConfigSynthesizer::new(FileTemplate::new(&cfg.paths.template))
        .with_mapper(ListenerMapping::new(mapping_settings(&cfg.haproxy)));
    TemplateFileHandler::from_engine(ReconciliationEngine::new(
        registry,
        synthesizer,
        Box::new(ConfigFileWriter::new(&cfg.paths.output)),
    ))
}

pub fn dispatcher_from_config(
    cfg: &ServoConfig,
    factory: impl HandlerFactory + 'static,
) -> ActivityDispatcher {
    ActivityDispatcher::new(
        ActivityTable::from_settings(&cfg.activity_table()),
        Arc::new(ValueCache::new(cfg.cache.ttl())),
        factory,
        &cfg.paths.run_dir,
    )
    .with_receive_timeout(cfg.pubsub.receive_timeout())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_settings_follow_config() {
        let mut cfg = ServoConfig::default();
        cfg.haproxy.cookie_name = "SERVOID".to_string();
        let m = mapping_settings(&cfg.haproxy);
        assert_eq!(m.cookie_name, "SERVOID");
        assert_eq!(m, MappingSettings {
            cookie_name: "SERVOID".to_string(),
            ..MappingSettings::default()
        });
    }

    #[test]
    fn redis_factory_builds_pubsub_handlers_lazily() {
        let factory = redis_factory(&PubSubSettings::default());
        let h = factory.create().unwrap();
        assert_eq!(h.kind(), servo_schemas::HandlerKind::PubSub);
    }

    #[test]
    fn dispatcher_uses_configured_activities() {
        let cfg = ServoConfig::default();
        let d = dispatcher_from_config(&cfg, redis_factory(&cfg.pubsub));
        assert_eq!(d.table().len(), 4);
        assert_eq!(d.run_dir(), cfg.paths.run_dir.as_path());
    }
}
