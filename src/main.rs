mod config;
mod ethereum;
mod server;

use anyhow::{anyhow, Result};
use clap::{Arg, Command};
use config::Config;
use server::TxForgeServer;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging to stderr (stdout carries the MCP transport)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let matches = Command::new("txforge")
        .version("0.1.0")
        .about("MCP server for building, simulating and sending EVM contract transactions")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new("network")
                .short('n')
                .long("network")
                .value_name("NETWORK")
                .help("Default network to use (ethereum, sepolia, polygon, arbitrum)"),
        )
        .arg(
            Arg::new("rpc-url")
                .short('r')
                .long("rpc-url")
                .value_name("URL")
                .help("RPC endpoint URL for the default network"),
        )
        .arg(
            Arg::new("allow-writes")
                .long("allow-writes")
                .help("Allow sending state-changing transactions")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("abi")
                .short('a')
                .long("abi")
                .value_name("FILE")
                .help("ABI file to load at startup (JSON ABI, build artifact or one signature per line)"),
        )
        .arg(
            Arg::new("contract")
                .long("contract")
                .value_name("ADDRESS")
                .help("Contract address to target at startup"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .help("Generate a sample configuration file and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config-path")
                .long("config-path")
                .help("Print the default configuration file path and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("generate-config") {
        println!("{}", Config::generate_sample());
        return Ok(());
    }

    if matches.get_flag("config-path") {
        match Config::default_config_path() {
            Ok(path) => {
                println!("{}", path.display());
                return Ok(());
            }
            Err(e) => {
                error!("Could not determine default config path: {}", e);
                return Err(e);
            }
        }
    }

    let config_path = matches.get_one::<String>("config").map(|s| s.as_str());
    let mut config = Config::load_or_default(config_path).await;

    if let Some(network) = matches.get_one::<String>("network") {
        if !config.networks.contains_key(network) {
            return Err(anyhow!(
                "Unknown network '{}'. Configured networks: {}",
                network,
                config.networks.keys().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        config.default_network = network.clone();
    }

    if let Some(rpc_url) = matches.get_one::<String>("rpc-url") {
        if let Some(network_config) = config.networks.get_mut(&config.default_network) {
            network_config.rpc_url = rpc_url.clone();
        }
    }

    if matches.get_flag("allow-writes") {
        config.security.allow_write_operations = true;
    }

    let abi = match matches.get_one::<String>("abi") {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| anyhow!("Failed to read ABI file {}: {}", path, e))?,
        ),
        None => None,
    };

    info!("Default network: {}", config.default_network);
    info!(
        "Write operations allowed: {}",
        config.security.allow_write_operations
    );

    let server = TxForgeServer::new(config)?;
    server
        .preload(
            abi.as_deref(),
            matches.get_one::<String>("contract").map(|s| s.as_str()),
        )
        .await?;

    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}
