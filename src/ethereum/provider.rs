use crate::config::{Config, NetworkConfig};
use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, B256, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::{BlockNumberOrTag, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::http::{Client, Http},
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, error, info, warn};

use super::utils;

/// Result of an `eth_call`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Returned(Bytes),
    /// The node reported a revert; carries its message
    Reverted(String),
}

/// A transaction or call against the contract
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxParams {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: Option<u64>,
}

impl TxParams {
    fn to_request(&self, from: Address) -> TransactionRequest {
        let mut request = TransactionRequest::default()
            .from(from)
            .to(self.to)
            .input(self.data.clone().into())
            .value(self.value);
        if let Some(gas) = self.gas_limit {
            request = request.with_gas_limit(gas);
        }
        request
    }
}

/// The connected wallet, as far as building transactions is concerned
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn get_address(&self) -> Result<Address>;

    async fn estimate_gas(&self, tx: &TxParams) -> Result<u64>;

    /// Returns the transaction hash once the node accepted it
    async fn send_transaction(&self, tx: &TxParams) -> Result<B256>;

    async fn eth_call(&self, tx: &TxParams, block: BlockNumberOrTag) -> Result<CallOutcome>;
}

#[derive(Debug)]
pub struct ProviderManager {
    providers: HashMap<String, RootProvider<Http<Client>>>,
    config: Config,
}

impl ProviderManager {
    pub fn new(config: Config) -> Result<Self> {
        let mut providers = HashMap::new();

        for (network_name, network_config) in &config.networks {
            let provider = Self::create_provider(network_config)?;
            providers.insert(network_name.clone(), provider);
        }

        Ok(Self { providers, config })
    }

    fn create_provider(network_config: &NetworkConfig) -> Result<RootProvider<Http<Client>>> {
        let url = network_config
            .rpc_url
            .parse()
            .map_err(|e| anyhow!("Invalid RPC URL '{}': {}", network_config.rpc_url, e))?;
        Ok(ProviderBuilder::new().on_http(url))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn get_provider(&self, network: Option<&str>) -> Result<&RootProvider<Http<Client>>> {
        let network_name = network.unwrap_or(&self.config.default_network);
        self.providers
            .get(network_name)
            .ok_or_else(|| anyhow!("Network '{}' not found", network_name))
    }

    pub fn get_network_config(&self, network: Option<&str>) -> Result<&NetworkConfig> {
        self.config.network(network)
    }

    pub fn get_available_networks(&self) -> Vec<String> {
        let mut networks: Vec<String> = self.config.networks.keys().cloned().collect();
        networks.sort();
        networks
    }

    /// Validates network connectivity and that the endpoint serves the
    /// configured chain
    pub async fn validate_network_connection(&self, network: Option<&str>) -> Result<()> {
        let network_name = network.unwrap_or(&self.config.default_network);
        let provider = self
            .get_provider(network)
            .map_err(|e| anyhow!("Network '{}' is not configured: {}", network_name, e))?;

        let chain_id = provider.get_chain_id().await.map_err(|e| {
            anyhow!(
                "Cannot connect to network '{}': {}",
                network_name,
                utils::interpret_rpc_error(&e.to_string())
            )
        })?;

        let expected = self.get_network_config(network)?.chain_id;
        if chain_id != expected {
            warn!(
                "Network '{}' reports chain id {}, configured as {}",
                network_name, chain_id, expected
            );
        }
        Ok(())
    }

    /// Connect a local signer on the given network
    pub async fn connect_wallet(
        &self,
        network: Option<&str>,
        private_key: &str,
    ) -> Result<AlloyWallet> {
        let network_name = network.unwrap_or(&self.config.default_network).to_string();
        utils::validate_network(&network_name, &self.get_available_networks())?;
        self.validate_network_connection(Some(&network_name)).await?;

        let provider = self.get_provider(Some(&network_name))?.clone();
        let network_config = self.get_network_config(Some(&network_name))?.clone();
        AlloyWallet::new(network_name, network_config, provider, private_key)
    }
}

/// Wallet backed by a local private key and the network's HTTP endpoint
#[derive(Debug, Clone)]
pub struct AlloyWallet {
    network: String,
    config: NetworkConfig,
    provider: RootProvider<Http<Client>>,
    signer: PrivateKeySigner,
}

impl AlloyWallet {
    pub fn new(
        network: String,
        config: NetworkConfig,
        provider: RootProvider<Http<Client>>,
        private_key: &str,
    ) -> Result<Self> {
        let private_key = private_key.trim();
        let private_key = private_key.strip_prefix("0x").unwrap_or(private_key);
        let signer = PrivateKeySigner::from_str(private_key)
            .map_err(|e| anyhow!("Invalid private key: {}", e))?;

        info!(
            "Connected wallet {} on network {}",
            signer.address().to_checksum(None),
            network
        );

        Ok(Self {
            network,
            config,
            provider,
            signer,
        })
    }

    pub fn network(&self) -> &str {
        &self.network
    }
}

#[async_trait]
impl WalletProvider for AlloyWallet {
    async fn get_address(&self) -> Result<Address> {
        Ok(self.signer.address())
    }

    async fn estimate_gas(&self, tx: &TxParams) -> Result<u64> {
        let request = tx.to_request(self.signer.address());
        self.provider
            .estimate_gas(&request)
            .await
            .map_err(|e| anyhow!("{}", utils::interpret_rpc_error(&e.to_string())))
    }

    async fn send_transaction(&self, tx: &TxParams) -> Result<B256> {
        let url = self
            .config
            .rpc_url
            .parse()
            .map_err(|e| anyhow!("Invalid RPC URL '{}': {}", self.config.rpc_url, e))?;

        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(url);

        let request = tx.to_request(self.signer.address());
        debug!("Sending transaction to {}", tx.to);

        let pending = provider.send_transaction(request).await.map_err(|e| {
            error!("Failed to send transaction: {}", e);
            anyhow!("{}", utils::interpret_rpc_error(&e.to_string()))
        })?;
        Ok(*pending.tx_hash())
    }

    async fn eth_call(&self, tx: &TxParams, block: BlockNumberOrTag) -> Result<CallOutcome> {
        let request = tx.to_request(self.signer.address());

        match self.provider.call(&request).block(block.into()).await {
            Ok(output) => Ok(CallOutcome::Returned(output)),
            Err(e) => {
                if let Some(payload) = e.as_error_resp() {
                    if utils::is_revert_message(&payload.message) {
                        return Ok(CallOutcome::Reverted(payload.message.to_string()));
                    }
                }
                error!("eth_call failed: {}", e);
                Err(anyhow!("{}", utils::interpret_rpc_error(&e.to_string())))
            }
        }
    }
}
