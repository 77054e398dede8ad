use alloy::primitives::{Address, U256};
use alloy::rpc::types::BlockNumberOrTag;
use anyhow::{anyhow, Result};

use super::format::{parse_address, parse_uint};

/// Node error prefixes that mean the call itself reverted
const REVERT_PREFIXES: [&str; 6] = [
    "execution reverted",
    "vm execution error",
    "vm exception while processing transaction",
    "evm: execution reverted",
    "execution was reverted",
    "error: transaction reverted",
];

/// Validates and normalizes an Ethereum address
pub fn validate_address(address: &str) -> Result<Address> {
    let address = address.trim();

    if address.is_empty() {
        return Err(anyhow!("Address cannot be empty"));
    }

    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(anyhow!(
            "Invalid address format: '{}'. Ethereum addresses must start with '0x'",
            address
        ));
    }

    if address.len() != 42 {
        return Err(anyhow!(
            "Invalid address length: '{}'. Ethereum addresses must be exactly 42 characters (0x + 40 hex characters)",
            address
        ));
    }

    // Mixed case must be a valid checksum
    parse_address(address).map_err(|e| anyhow!("Invalid Ethereum address: {}", e))
}

/// Validates network name
pub fn validate_network(network: &str, available_networks: &[String]) -> Result<()> {
    if network.is_empty() {
        return Err(anyhow!("Network name cannot be empty"));
    }

    if !available_networks.contains(&network.to_string()) {
        return Err(anyhow!(
            "Unknown network: '{}'. Available networks: {}",
            network,
            available_networks.join(", ")
        ));
    }

    Ok(())
}

/// Parses a wei amount given in decimal or `0x` hex
pub fn parse_wei(value_str: &str) -> Result<U256> {
    let value_str = value_str.trim();
    if value_str.is_empty() {
        return Err(anyhow!("Value cannot be empty"));
    }

    parse_uint(value_str, 256).map_err(|_| {
        anyhow!(
            "Invalid value: '{}'. Use a non-negative decimal or '0x' prefixed hex amount of wei",
            value_str
        )
    })
}

/// Parses the block an `eth_call` runs against; `latest` when absent
pub fn parse_block_reference(block: Option<&str>) -> Result<BlockNumberOrTag> {
    let Some(block) = block.map(str::trim).filter(|b| !b.is_empty()) else {
        return Ok(BlockNumberOrTag::Latest);
    };

    match block.to_lowercase().as_str() {
        "latest" => Ok(BlockNumberOrTag::Latest),
        "pending" => Ok(BlockNumberOrTag::Pending),
        "earliest" => Ok(BlockNumberOrTag::Earliest),
        "safe" => Ok(BlockNumberOrTag::Safe),
        "finalized" => Ok(BlockNumberOrTag::Finalized),
        other => {
            let number = match other.strip_prefix("0x") {
                Some(hex_part) => u64::from_str_radix(hex_part, 16),
                None => other.parse::<u64>(),
            }
            .map_err(|_| {
                anyhow!(
                    "Invalid block: '{}'. Use a block number or one of latest, pending, earliest, safe, finalized",
                    block
                )
            })?;
            Ok(BlockNumberOrTag::Number(number))
        }
    }
}

/// Whether a node error message reports a reverted call
pub fn is_revert_message(message: &str) -> bool {
    let message = message.trim().to_lowercase();
    REVERT_PREFIXES
        .iter()
        .any(|prefix| message.starts_with(prefix))
}

/// Shortens an error message for display: drops everything from the first
/// " (" and capitalizes the first letter
pub fn format_error(message: &str) -> String {
    let message = match message.find(" (") {
        Some(cut) => &message[..cut],
        None => message,
    };
    capitalize_error(message)
}

/// Capitalizes the first letter, keeping the rest of the message
pub fn capitalize_error(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Creates user-friendly error messages for common RPC errors
pub fn interpret_rpc_error(error: &str) -> String {
    if error.contains("insufficient funds") {
        "Insufficient funds to cover the value and gas costs of this transaction".to_string()
    } else if error.contains("gas required exceeds allowance") {
        "Gas limit too low for this transaction".to_string()
    } else if error.contains("nonce too low") {
        "Nonce too low, another transaction was already mined with this nonce".to_string()
    } else if error.contains("replacement transaction underpriced") {
        "Gas price too low to replace the pending transaction".to_string()
    } else if error.contains("connection refused") || error.contains("network unreachable") {
        "Cannot connect to RPC endpoint, check the RPC URL configuration".to_string()
    } else if error.contains("timeout") {
        "Request timed out, the RPC endpoint may be overloaded or unreachable".to_string()
    } else if error.contains("rate limit") {
        "Too many requests to the RPC endpoint, try again in a few moments".to_string()
    } else if error.contains("method not found") {
        "The requested method is not supported by this RPC endpoint".to_string()
    } else {
        error.to_string()
    }
}
