use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const DEFAULT_PRIVATE_KEY_ENV: &str = "TXFORGE_PRIVATE_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub networks: HashMap<String, NetworkConfig>,
    pub default_network: String,
    pub security: SecurityConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub explorer_url: Option<String>,
    pub gas: GasConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    /// Used by forced submissions when gas estimation fails
    pub default_gas_limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub allow_write_operations: bool,
    /// Largest value in wei a submission may carry
    pub max_transaction_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Environment variable holding the signer's private key
    pub private_key_env: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: DEFAULT_PRIVATE_KEY_ENV.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub transport: String,
}

impl Default for Config {
    fn default() -> Self {
        let mut networks = HashMap::new();

        networks.insert(
            "ethereum".to_string(),
            NetworkConfig::new(
                "https://eth-mainnet.g.alchemy.com/v2/demo",
                1,
                Some("https://etherscan.io"),
            ),
        );
        networks.insert(
            "sepolia".to_string(),
            NetworkConfig::new(
                "https://eth-sepolia.g.alchemy.com/v2/demo",
                11155111,
                Some("https://sepolia.etherscan.io"),
            ),
        );
        networks.insert(
            "polygon".to_string(),
            NetworkConfig::new(
                "https://polygon-mainnet.g.alchemy.com/v2/demo",
                137,
                Some("https://polygonscan.com"),
            ),
        );
        networks.insert(
            "arbitrum".to_string(),
            NetworkConfig::new(
                "https://arb-mainnet.g.alchemy.com/v2/demo",
                42161,
                Some("https://arbiscan.io"),
            ),
        );

        Self {
            networks,
            default_network: "ethereum".to_string(),
            security: SecurityConfig {
                allow_write_operations: false,
                max_transaction_value: None,
            },
            wallet: WalletConfig::default(),
            server: ServerConfig {
                transport: "stdio".to_string(),
            },
        }
    }
}

impl NetworkConfig {
    pub fn new(rpc_url: &str, chain_id: u64, explorer_url: Option<&str>) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            chain_id,
            explorer_url: explorer_url.map(str::to_string),
            gas: GasConfig {
                default_gas_limit: 100_000,
            },
        }
    }

    /// Explorer page for a transaction hash, when an explorer is configured
    pub fn explorer_tx_url(&self, hash: &str) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), hash))
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        if !config.networks.contains_key(&config.default_network) {
            return Err(anyhow!(
                "Default network '{}' is not configured in {:?}",
                config.default_network,
                path
            ));
        }

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow!("Failed to create config directory {:?}: {}", parent, e)
                })?;
            }
        }

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {:?}: {}", path, e))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        let mut config = match path {
            Some(path) => match Self::load_from_file(path).await {
                Ok(config) => {
                    tracing::info!("Loaded configuration from file");
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to load config file, using defaults: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        };

        config.apply_env_vars();
        config
    }

    pub fn network(&self, name: Option<&str>) -> Result<&NetworkConfig> {
        let name = name.unwrap_or(&self.default_network);
        self.networks
            .get(name)
            .ok_or_else(|| anyhow!("Network '{}' not configured", name))
    }

    /// Substitute `ALCHEMY_API_KEY` into placeholder RPC URLs
    fn apply_env_vars(&mut self) {
        match std::env::var("ALCHEMY_API_KEY") {
            Ok(api_key) => {
                tracing::info!("Using ALCHEMY_API_KEY environment variable for RPC URLs");
                self.substitute_api_key(&api_key);
            }
            Err(_) => {
                for (network_name, network_config) in &self.networks {
                    if network_config.rpc_url.contains("/demo") {
                        tracing::warn!("Using demo RPC endpoint for {}, set ALCHEMY_API_KEY environment variable for better reliability", network_name);
                    }
                }
            }
        }
    }

    fn substitute_api_key(&mut self, api_key: &str) {
        for (network_name, network_config) in &mut self.networks {
            if network_config.rpc_url.contains("alchemy.com/v2/demo") {
                network_config.rpc_url = network_config
                    .rpc_url
                    .replace("/demo", &format!("/{}", api_key));
                tracing::debug!("Updated {} RPC URL with API key", network_name);
            } else if network_config.rpc_url.contains("YOUR_API_KEY_HERE") {
                network_config.rpc_url = network_config
                    .rpc_url
                    .replace("YOUR_API_KEY_HERE", api_key);
                tracing::debug!("Updated {} RPC URL with API key", network_name);
            }
        }
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("txforge").join("config.toml"))
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let sample_config = r#"# txforge configuration file

# Network used when none is given on the command line
default_network = "ethereum"

[networks.ethereum]
rpc_url = "https://eth-mainnet.g.alchemy.com/v2/YOUR_API_KEY_HERE"
chain_id = 1
explorer_url = "https://etherscan.io"

[networks.ethereum.gas]
default_gas_limit = 100000  # used by forced submissions when estimation fails

[networks.sepolia]
rpc_url = "https://eth-sepolia.g.alchemy.com/v2/YOUR_API_KEY_HERE"
chain_id = 11155111
explorer_url = "https://sepolia.etherscan.io"

[networks.sepolia.gas]
default_gas_limit = 100000

[networks.polygon]
rpc_url = "https://polygon-mainnet.g.alchemy.com/v2/YOUR_API_KEY_HERE"
chain_id = 137
explorer_url = "https://polygonscan.com"

[networks.polygon.gas]
default_gas_limit = 100000

[networks.arbitrum]
rpc_url = "https://arb-mainnet.g.alchemy.com/v2/YOUR_API_KEY_HERE"
chain_id = 42161
explorer_url = "https://arbiscan.io"

[networks.arbitrum.gas]
default_gas_limit = 100000

[security]
# Submitting state-changing transactions is refused unless enabled
allow_write_operations = false
# max_transaction_value = "1000000000000000000"  # 1 ETH in wei

[wallet]
# Environment variable holding the signer's hex private key
private_key_env = "TXFORGE_PRIVATE_KEY"

[server]
transport = "stdio"

# Environment variables that can be used:
# ALCHEMY_API_KEY - Your Alchemy API key (replaces YOUR_API_KEY_HERE above)
# TXFORGE_PRIVATE_KEY - Private key of the wallet used to simulate and submit
"#;
        sample_config.to_string()
    }
}
