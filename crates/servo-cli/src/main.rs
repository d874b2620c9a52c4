use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::info;

mod commands;

#[derive(Parser)]
#[command(name = "servo")]
#[command(about = "Load-balancer config servo", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> site -> host)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile policy and load-balancer snapshots against a template offline
    Render {
        /// Template config file
        #[arg(long)]
        template: PathBuf,

        /// Policy snapshot JSON, applied in order
        #[arg(long = "policy")]
        policies: Vec<PathBuf>,

        /// Load-balancer snapshot JSON
        #[arg(long)]
        loadbalancer: PathBuf,

        /// Write the config here (mode 0600) instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the content digest the value cache keys a file's contents by
    Digest {
        path: PathBuf,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Run one activity task through the pub/sub handler
    Dispatch {
        /// Activity name (e.g. LoadBalancingVmActivities.getInstanceStatus)
        #[arg(long)]
        activity: String,

        /// File holding the task parameter; out-only activities take none
        #[arg(long = "parameter-file")]
        parameter_file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Silent when absent.
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();
    let loaded = commands::load_config(&cli.config_paths)?;
    commands::init_tracing(&loaded.config.paths.log_dir)?;
    info!(config_hash = %loaded.config_hash, "servo starting");

    match cli.cmd {
        Commands::Render {
            template,
            policies,
            loadbalancer,
            out,
        } => {
            commands::render::run(
                &loaded.config,
                commands::render::RenderArgs {
                    template,
                    policies,
                    loadbalancer,
                    out,
                },
            )?;
        }

        Commands::Digest { path } => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            println!("{}", servo_cache::digest(&raw));
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = servo_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Dispatch {
            activity,
            parameter_file,
        } => {
            commands::dispatch::run(&loaded.config, &activity, parameter_file.as_deref())?;
        }
    }

    Ok(())
}
