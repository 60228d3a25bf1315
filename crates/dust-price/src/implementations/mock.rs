//! Mock price feed implementation for testing and development.
//!
//! Returns fixed prices registered up front; unknown chains error and
//! unknown tokens are absent from results, matching the live feed's shape.

use crate::{PriceFeedError, PriceFeedInterface};
use alloy_primitives::Address;
use async_trait::async_trait;
use std::collections::HashMap;

/// Mock price feed with preconfigured prices.
#[derive(Debug, Default)]
pub struct MockPriceFeed {
	native_prices: HashMap<u64, f64>,
	token_prices: HashMap<(u64, Address), f64>,
}

impl MockPriceFeed {
	/// Creates an empty mock feed.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a native coin price for a chain.
	pub fn with_native_price(mut self, chain_id: u64, price: f64) -> Self {
		self.native_prices.insert(chain_id, price);
		self
	}

	/// Registers a token price for a chain.
	pub fn with_token_price(mut self, chain_id: u64, token: Address, price: f64) -> Self {
		self.token_prices.insert((chain_id, token), price);
		self
	}
}

#[async_trait]
impl PriceFeedInterface for MockPriceFeed {
	async fn native_price_usd(&self, chain_id: u64) -> Result<f64, PriceFeedError> {
		self.native_prices
			.get(&chain_id)
			.copied()
			.ok_or(PriceFeedError::UnsupportedChain(chain_id))
	}

	async fn token_prices_usd(
		&self,
		chain_id: u64,
		addresses: &[Address],
	) -> Result<HashMap<Address, f64>, PriceFeedError> {
		let mut prices = HashMap::new();
		for address in addresses {
			if let Some(price) = self.token_prices.get(&(chain_id, *address)) {
				prices.insert(*address, *price);
			}
		}
		Ok(prices)
	}
}
