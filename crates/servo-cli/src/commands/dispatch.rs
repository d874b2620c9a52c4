use anyhow::{Context, Result};
use servo_config::ServoConfig;
use servo_runtime::{dispatcher_from_config, redis_factory};
use std::path::Path;

pub fn run(cfg: &ServoConfig, activity: &str, parameter_file: Option<&Path>) -> Result<()> {
    let parameter = parameter_file.map(super::read_text).transpose()?;

    let dispatcher = dispatcher_from_config(cfg, redis_factory(&cfg.pubsub));
    let outcome = dispatcher
        .dispatch(activity, parameter.as_deref())
        .with_context(|| format!("activity {activity} failed"))?;

    println!("activity={} sink={}", outcome.activity, outcome.sink);
    println!("changed={}", outcome.changed);
    if let Some(reply) = outcome.reply {
        println!("{reply}");
    }
    Ok(())
}
