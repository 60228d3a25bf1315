//! Chain registry configuration types for multi-chain dust scanning.
//!
//! This module defines the configuration structures for the chains the
//! sweeper probes: RPC URLs, native symbols, explorer links, curated token
//! registries, and the per-chain contract addresses the planner needs
//! (wrapped native, Multicall3, DustClaim).

use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Configuration for a curated token on a specific chain.
///
/// Tokens listed here are probed directly during a scan. Decimals may be
/// omitted and are then read live from the contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct TokenConfig {
	pub address: Address,
	pub symbol: String,
	#[serde(default)]
	pub decimals: Option<u8>,
	/// External price-service identifier, when the token is priced by
	/// coin id rather than contract address.
	#[serde(default)]
	pub price_feed_id: Option<String>,
}

/// Configuration for a single blockchain network.
///
/// Loaded once at process start and never mutated afterwards.
///
/// # Fields
///
/// * `name` - Human-readable chain name (e.g., "Polygon PoS")
/// * `native_symbol` - Symbol of the native coin (e.g., "MATIC")
/// * `rpc_url` - The HTTP(S) RPC endpoint for blockchain interaction
/// * `explorer_url` - Block explorer base URL
/// * `coingecko_platform` - Price-service platform slug for token lookups
/// * `native_price_id` - Price-service coin id for the native asset
/// * `wrapped_native` - Wrapped-native token address (swap target)
/// * `multicall3` - Multicall3 address for batched discovery reads
/// * `dust_claim_address` - DustClaim contract, when deployed on this chain
/// * `tokens` - Curated token registry probed on every scan
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	pub name: String,
	pub native_symbol: String,
	pub rpc_url: String,
	pub explorer_url: String,
	#[serde(default)]
	pub coingecko_platform: Option<String>,
	#[serde(default)]
	pub native_price_id: Option<String>,
	#[serde(default)]
	pub wrapped_native: Option<Address>,
	#[serde(default)]
	pub multicall3: Option<Address>,
	#[serde(default)]
	pub dust_claim_address: Option<Address>,
	/// Public token-list URLs used by discovery when the curated registry
	/// is empty or incomplete.
	#[serde(default)]
	pub token_list_urls: Vec<String>,
	#[serde(default)]
	pub tokens: Vec<TokenConfig>,
}

/// Chain registry mapping chain IDs to their configurations.
///
/// Type alias for a HashMap keyed by chain ID. TOML requires string keys in
/// tables, so the custom deserializer below converts them to u64.
pub type ChainRegistryConfig = HashMap<u64, ChainConfig>;

/// Helper function to deserialize the chain registry from TOML.
///
/// Chain IDs arrive as string keys (TOML does not support numeric table
/// keys) and are parsed into u64 keys for internal use.
///
/// # Errors
///
/// Returns a deserialization error if a chain ID key cannot be parsed as a
/// u64 or the underlying chain configuration is invalid.
pub fn deserialize_chains<'de, D>(deserializer: D) -> Result<ChainRegistryConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, ChainConfig> = HashMap::deserialize(deserializer)?;
	let mut result = HashMap::new();

	for (key, value) in string_map {
		let chain_id = key
			.parse::<u64>()
			.map_err(|e| serde::de::Error::custom(format!("Invalid chain_id '{}': {}", key, e)))?;
		result.insert(chain_id, value);
	}

	Ok(result)
}
