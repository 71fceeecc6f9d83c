//! Safenode daemon: offline operator commands over the node configuration.

use anyhow::Context;
use clap::Parser;
use safenode_node::{decode_batch, NodeConfig, SafenodeService};
use safenode_types::NetworkId;
use safenode_utils::{format_duration, init_logging, LogFormat};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "safenode", about = "Safenode registry operator tool")]
struct Cli {
    /// Network: "live", "test", or "dev".
    /// When a config file is provided, defaults to the file's network value.
    #[arg(long, env = "SAFENODE_NETWORK")]
    network: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "SAFENODE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "SAFENODE_LOG_JSON")]
    log_json: bool,

    /// Path to a TOML configuration file. CLI flags and env vars override it.
    #[arg(long, env = "SAFENODE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print a fresh operational private key.
    Genkey,
    /// Decode a hex batch of announcements and verify their signatures.
    Decode {
        /// Hex produced by `create-all` on another node.
        hex: String,
    },
    /// List the configured safenodes.
    #[command(name = "list-conf")]
    ListConf,
    /// Print the effective configuration as TOML.
    #[command(name = "show-config")]
    ShowConfig,
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path_str = path.to_str().context("config path is not valid UTF-8")?;
            let config = NodeConfig::from_toml_file(path_str)
                .with_context(|| format!("loading {}", path.display()))?;
            tracing::info!("Loaded config from {}", path.display());
            config
        }
        None => NodeConfig::default(),
    };
    if let Some(network) = &cli.network {
        config.network = NetworkId::from_name(network);
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if cli.log_json {
        config.log_format = LogFormat::Json;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);

    match cli.command {
        Command::Genkey => {
            println!("{}", SafenodeService::genkey());
        }
        Command::Decode { hex } => {
            let summary = decode_batch(&hex)?;
            tracing::info!(
                valid = summary.entries.len(),
                failed = summary.failed,
                "batch decoded"
            );
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::ListConf => {
            let nodes: Vec<_> = config
                .nodes
                .iter()
                .map(|n| {
                    serde_json::json!({
                        "alias": n.alias,
                        "address": n.address,
                        "collateral": format!("{}-{}", n.collateral_txid, n.collateral_index),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&nodes)?);
        }
        Command::ShowConfig => {
            tracing::info!(
                network = config.network.as_str(),
                "maintenance every {}",
                format_duration(config.maintenance_interval_secs)
            );
            print!("{}", config.to_toml_string());
            println!("\n# Effective parameters");
            print!("{}", toml::to_string_pretty(&config.effective_params())?);
        }
    }

    Ok(())
}
