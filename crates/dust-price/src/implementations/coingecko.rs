//! CoinGecko price feed implementation.
//!
//! Native coins are priced by coin id via `/simple/price`; tokens are priced
//! by contract address via `/simple/token_price/{platform}`, where the
//! platform slug comes from the chain registry. A pro API key, when
//! configured, is sent as the `x-cg-pro-api-key` header. Missing keys in a
//! response are treated as unknown prices, not errors.

use crate::{PriceFeedError, PriceFeedInterface};
use alloy_primitives::Address;
use async_trait::async_trait;
use dust_config::PriceConfig;
use dust_types::ChainRegistryConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Per-asset price entry in a CoinGecko simple-price response.
#[derive(Debug, Deserialize)]
struct UsdEntry {
	usd: Option<f64>,
}

/// CoinGecko-backed price feed.
pub struct CoinGeckoPriceFeed {
	client: reqwest::Client,
	base_url: String,
	api_key: Option<String>,
	/// chain id -> coin id for native pricing.
	native_ids: HashMap<u64, String>,
	/// chain id -> platform slug for token pricing.
	platforms: HashMap<u64, String>,
}

impl CoinGeckoPriceFeed {
	/// Creates a new CoinGecko feed from the price config and chain
	/// registry (which carries the per-chain coin ids and platform slugs).
	pub fn new(config: &PriceConfig, chains: &ChainRegistryConfig) -> Result<Self, PriceFeedError> {
		let client = reqwest::Client::builder()
			.timeout(Duration::from_secs(config.request_timeout_seconds))
			.build()
			.map_err(|e| PriceFeedError::Configuration(format!("HTTP client: {}", e)))?;

		let mut native_ids = HashMap::new();
		let mut platforms = HashMap::new();
		for (chain_id, chain) in chains {
			if let Some(id) = &chain.native_price_id {
				native_ids.insert(*chain_id, id.clone());
			}
			if let Some(platform) = &chain.coingecko_platform {
				platforms.insert(*chain_id, platform.clone());
			}
		}

		Ok(Self {
			client,
			base_url: COINGECKO_BASE_URL.to_string(),
			api_key: config.api_key.clone(),
			native_ids,
			platforms,
		})
	}

	/// Overrides the API base URL, for tests against a local server.
	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();
		self
	}

	fn request(&self, url: String) -> reqwest::RequestBuilder {
		let mut req = self.client.get(url);
		if let Some(key) = &self.api_key {
			req = req.header("x-cg-pro-api-key", key);
		}
		req
	}
}

#[async_trait]
impl PriceFeedInterface for CoinGeckoPriceFeed {
	async fn native_price_usd(&self, chain_id: u64) -> Result<f64, PriceFeedError> {
		let coin_id = self
			.native_ids
			.get(&chain_id)
			.ok_or(PriceFeedError::UnsupportedChain(chain_id))?;

		let url = format!(
			"{}/simple/price?ids={}&vs_currencies=usd",
			self.base_url, coin_id
		);
		let response: HashMap<String, UsdEntry> = self
			.request(url)
			.send()
			.await
			.map_err(|e| PriceFeedError::Network(e.to_string()))?
			.error_for_status()
			.map_err(|e| PriceFeedError::Network(e.to_string()))?
			.json()
			.await
			.map_err(|e| PriceFeedError::Network(e.to_string()))?;

		Ok(response
			.get(coin_id)
			.and_then(|entry| entry.usd)
			.unwrap_or(0.0))
	}

	async fn token_prices_usd(
		&self,
		chain_id: u64,
		addresses: &[Address],
	) -> Result<HashMap<Address, f64>, PriceFeedError> {
		let platform = self
			.platforms
			.get(&chain_id)
			.ok_or(PriceFeedError::UnsupportedChain(chain_id))?;

		if addresses.is_empty() {
			return Ok(HashMap::new());
		}

		// CoinGecko expects lowercase hex addresses.
		let contract_addresses = addresses
			.iter()
			.map(|a| a.to_string().to_lowercase())
			.collect::<Vec<_>>()
			.join(",");

		let url = format!(
			"{}/simple/token_price/{}?contract_addresses={}&vs_currencies=usd",
			self.base_url, platform, contract_addresses
		);
		let response: HashMap<String, UsdEntry> = self
			.request(url)
			.send()
			.await
			.map_err(|e| PriceFeedError::Network(e.to_string()))?
			.error_for_status()
			.map_err(|e| PriceFeedError::Network(e.to_string()))?
			.json()
			.await
			.map_err(|e| PriceFeedError::Network(e.to_string()))?;

		// The response is keyed by address; tokens the service does not
		// know are simply absent. Re-parse keys so lookups stay typed.
		let mut prices = HashMap::new();
		for (addr_str, entry) in response {
			if let (Ok(addr), Some(usd)) = (addr_str.parse::<Address>(), entry.usd) {
				prices.insert(addr, usd);
			}
		}

		Ok(prices)
	}
}
