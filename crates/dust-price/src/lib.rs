//! Price feed module for the dust sweeper.
//!
//! This module provides interfaces and implementations for resolving USD
//! prices of native coins and ERC-20 tokens across chains. Pricing is
//! best-effort by design: the service wrapper degrades every failure to a
//! zero price or an empty map so that dust detection is never blocked by an
//! unreachable price API.

use alloy_primitives::Address;
use async_trait::async_trait;
use dust_config::PriceConfig;
use dust_types::current_timestamp_millis;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Re-export implementations
pub mod implementations {
	pub mod coingecko;
	pub mod mock;
}

/// Errors that can occur during price feed operations.
#[derive(Debug, Error)]
pub enum PriceFeedError {
	/// Error that occurs during network communication with the price API.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when a chain has no price-service mapping.
	#[error("No price mapping for chain {0}")]
	UnsupportedChain(u64),
	/// Error that occurs when configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for price feed implementations.
///
/// Implementations report real errors; the fail-to-zero policy lives in
/// [`PriceFeedService`] so tests can still observe failures directly.
#[async_trait]
pub trait PriceFeedInterface: Send + Sync {
	/// Resolves the USD unit price of a chain's native coin.
	async fn native_price_usd(&self, chain_id: u64) -> Result<f64, PriceFeedError>;

	/// Resolves USD unit prices for a set of token contract addresses on a
	/// chain. Tokens missing from the response are simply absent from the
	/// returned map.
	async fn token_prices_usd(
		&self,
		chain_id: u64,
		addresses: &[Address],
	) -> Result<HashMap<Address, f64>, PriceFeedError>;
}

/// A cached price lookup result.
#[derive(Debug, Clone)]
enum CachedPrices {
	Native(f64),
	Tokens(HashMap<Address, f64>),
}

#[derive(Debug, Clone)]
struct CacheEntry {
	prices: CachedPrices,
	stored_at_millis: u64,
}

/// Service that resolves USD prices through a feed implementation with a
/// short-lived in-memory cache.
///
/// The cache is keyed by request parameters and absorbs repeated refreshes
/// within the TTL without re-hitting the external API. Entries are whole
/// value replacements, so concurrent overwrites are safe behind the RwLock.
/// This cache is the only mutable shared state in the core.
pub struct PriceFeedService {
	implementation: Arc<dyn PriceFeedInterface>,
	cache: RwLock<HashMap<String, CacheEntry>>,
	cache_ttl_millis: u64,
}

impl PriceFeedService {
	/// Creates a new PriceFeedService wrapping the given implementation.
	pub fn new(implementation: Arc<dyn PriceFeedInterface>, config: &PriceConfig) -> Self {
		Self {
			implementation,
			cache: RwLock::new(HashMap::new()),
			cache_ttl_millis: config.cache_ttl_seconds * 1000,
		}
	}

	/// Gets the USD price of a chain's native coin.
	///
	/// Fails to `0.0` on any error; pricing never blocks dust detection.
	pub async fn native_price_usd(&self, chain_id: u64) -> f64 {
		let cache_key = format!("native_{}", chain_id);

		if let Some(CachedPrices::Native(price)) = self.cached(&cache_key).await {
			return price;
		}

		match self.implementation.native_price_usd(chain_id).await {
			Ok(price) => {
				self.store(cache_key, CachedPrices::Native(price)).await;
				price
			}
			Err(e) => {
				tracing::warn!(chain_id, error = %e, "Native price lookup failed");
				0.0
			}
		}
	}

	/// Gets USD prices for a set of token addresses on a chain.
	///
	/// Fails to an empty map on any error. Tokens unknown to the price
	/// service are absent from the result.
	pub async fn token_prices_usd(
		&self,
		chain_id: u64,
		addresses: &[Address],
	) -> HashMap<Address, f64> {
		if addresses.is_empty() {
			return HashMap::new();
		}

		// Sort addresses so the cache key is order-independent.
		let mut sorted: Vec<String> = addresses
			.iter()
			.map(|a| a.to_string().to_lowercase())
			.collect();
		sorted.sort();
		let cache_key = format!("tokens_{}_{}", chain_id, sorted.join("_"));

		if let Some(CachedPrices::Tokens(prices)) = self.cached(&cache_key).await {
			return prices;
		}

		match self
			.implementation
			.token_prices_usd(chain_id, addresses)
			.await
		{
			Ok(prices) => {
				self.store(cache_key, CachedPrices::Tokens(prices.clone()))
					.await;
				prices
			}
			Err(e) => {
				tracing::warn!(chain_id, error = %e, "Token price lookup failed");
				HashMap::new()
			}
		}
	}

	/// Drops every cached entry, forcing the next lookups to hit the API.
	/// Used by explicit "refresh prices" actions.
	pub async fn clear_cache(&self) {
		self.cache.write().await.clear();
	}

	async fn cached(&self, key: &str) -> Option<CachedPrices> {
		let cache = self.cache.read().await;
		let entry = cache.get(key)?;
		let age = current_timestamp_millis().saturating_sub(entry.stored_at_millis);
		if age < self.cache_ttl_millis {
			Some(entry.prices.clone())
		} else {
			None
		}
	}

	async fn store(&self, key: String, prices: CachedPrices) {
		self.cache.write().await.insert(
			key,
			CacheEntry {
				prices,
				stored_at_millis: current_timestamp_millis(),
			},
		);
	}
}

#[cfg(test)]
mod tests {
	use super::implementations::mock::MockPriceFeed;
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	/// Feed that counts calls and fails on demand.
	struct CountingFeed {
		calls: AtomicUsize,
		fail: bool,
	}

	#[async_trait]
	impl PriceFeedInterface for CountingFeed {
		async fn native_price_usd(&self, _chain_id: u64) -> Result<f64, PriceFeedError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			if self.fail {
				Err(PriceFeedError::Network("connection refused".to_string()))
			} else {
				Ok(2500.0)
			}
		}

		async fn token_prices_usd(
			&self,
			_chain_id: u64,
			_addresses: &[Address],
		) -> Result<HashMap<Address, f64>, PriceFeedError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			if self.fail {
				Err(PriceFeedError::Network("connection refused".to_string()))
			} else {
				Ok(HashMap::new())
			}
		}
	}

	fn service_with(feed: Arc<dyn PriceFeedInterface>) -> PriceFeedService {
		PriceFeedService::new(feed, &PriceConfig::default())
	}

	#[tokio::test]
	async fn test_cache_absorbs_repeated_lookups() {
		let feed = Arc::new(CountingFeed {
			calls: AtomicUsize::new(0),
			fail: false,
		});
		let service = service_with(feed.clone());

		assert_eq!(service.native_price_usd(1).await, 2500.0);
		assert_eq!(service.native_price_usd(1).await, 2500.0);
		assert_eq!(feed.calls.load(Ordering::SeqCst), 1);

		// A different chain is a different cache key.
		service.native_price_usd(137).await;
		assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_clear_cache_forces_refetch() {
		let feed = Arc::new(CountingFeed {
			calls: AtomicUsize::new(0),
			fail: false,
		});
		let service = service_with(feed.clone());

		service.native_price_usd(1).await;
		service.clear_cache().await;
		service.native_price_usd(1).await;
		assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_expired_entries_refetch() {
		let feed = Arc::new(CountingFeed {
			calls: AtomicUsize::new(0),
			fail: false,
		});
		// Zero TTL means every entry is stale the moment it is stored.
		let config = PriceConfig {
			cache_ttl_seconds: 0,
			..PriceConfig::default()
		};
		let service = PriceFeedService::new(feed.clone(), &config);

		service.native_price_usd(1).await;
		service.native_price_usd(1).await;
		assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_fails_to_zero_on_error() {
		let feed = Arc::new(CountingFeed {
			calls: AtomicUsize::new(0),
			fail: true,
		});
		let service = service_with(feed);

		assert_eq!(service.native_price_usd(1).await, 0.0);
		let addr: Address = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
			.parse()
			.unwrap();
		assert!(service.token_prices_usd(1, &[addr]).await.is_empty());
	}

	#[tokio::test]
	async fn test_mock_feed_round_trip() {
		let addr: Address = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
			.parse()
			.unwrap();
		let mock = MockPriceFeed::new()
			.with_native_price(1, 2500.0)
			.with_token_price(1, addr, 1.0);
		let service = service_with(Arc::new(mock));

		assert_eq!(service.native_price_usd(1).await, 2500.0);
		let prices = service.token_prices_usd(1, &[addr]).await;
		assert_eq!(prices.get(&addr), Some(&1.0));
	}
}
