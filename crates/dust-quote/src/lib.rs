//! Quote aggregation module for the dust sweeper.
//!
//! This module queries multiple DEX-aggregator backends concurrently for a
//! token conversion and selects the best quote. Backends are isolated from
//! each other: one backend's error or timeout never cancels the rest, and
//! the service only fails when every backend came up empty.

use dust_config::QuoteConfig;
use dust_types::{Quote, QuoteRequest, SwapRequest, SwapTransaction};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod oneinch;
	pub mod paraswap;
	pub mod zerox;
}

/// Errors reported by individual aggregator backends.
#[derive(Debug, Error)]
pub enum AggregatorError {
	/// Error that occurs during network communication with the backend.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when the backend does not serve the chain.
	#[error("Chain {0} not supported")]
	UnsupportedChain(u64),
	/// Error that occurs when the backend's response cannot be used.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
}

/// Errors reported by the quote service.
#[derive(Debug, Error)]
pub enum QuoteError {
	/// Every configured backend failed or returned nothing. Recoverable:
	/// callers skip the token or retry.
	#[error("No quote available for the requested conversion")]
	NoQuoteAvailable,
	/// The winning backend could not build swap calldata.
	#[error("Swap build failed: {0}")]
	SwapBuildFailed(String),
	/// The named backend is not configured.
	#[error("Unknown aggregator backend: {0}")]
	UnknownBackend(String),
}

/// Trait defining the interface for DEX aggregator backends.
#[async_trait::async_trait]
pub trait AggregatorInterface: Send + Sync {
	/// The backend's stable name, used for priority ordering, spender
	/// lookups, and receipts.
	fn name(&self) -> &'static str;

	/// Returns a point-in-time quote for a token conversion.
	async fn quote(&self, request: &QuoteRequest) -> Result<Quote, AggregatorError>;

	/// Builds ready-to-send swap calldata for a previously quoted
	/// conversion.
	async fn build_swap(&self, request: &SwapRequest) -> Result<SwapTransaction, AggregatorError>;
}

/// Service that fans quote requests out to every configured backend and
/// picks the best response.
pub struct QuoteService {
	/// Backends in fixed priority order; earlier wins exact-output ties.
	backends: Vec<Arc<dyn AggregatorInterface>>,
	timeout: Duration,
}

impl QuoteService {
	/// Creates a new QuoteService over the given backends.
	///
	/// The backend order is the tie-break priority order.
	pub fn new(backends: Vec<Arc<dyn AggregatorInterface>>, config: &QuoteConfig) -> Self {
		Self {
			backends,
			timeout: Duration::from_secs(config.timeout_seconds),
		}
	}

	/// Queries all backends concurrently and returns the quote with the
	/// numerically largest output amount.
	///
	/// Output comparison is integer comparison on base units; floats would
	/// lose precision at 18-decimal scales. Ties resolve to the backend
	/// earliest in the priority order so results are deterministic.
	///
	/// # Errors
	///
	/// Returns `QuoteError::NoQuoteAvailable` when every backend failed,
	/// timed out, or declined the chain.
	pub async fn best_quote(&self, request: &QuoteRequest) -> Result<Quote, QuoteError> {
		let attempts = self.backends.iter().map(|backend| {
			let backend = Arc::clone(backend);
			async move {
				match tokio::time::timeout(self.timeout, backend.quote(request)).await {
					Ok(Ok(quote)) => Some(quote),
					Ok(Err(e)) => {
						tracing::debug!(
							backend = backend.name(),
							chain_id = request.chain_id,
							error = %e,
							"Backend quote failed"
						);
						None
					}
					Err(_) => {
						tracing::debug!(
							backend = backend.name(),
							chain_id = request.chain_id,
							"Backend quote timed out"
						);
						None
					}
				}
			}
		});

		// join_all preserves backend order, so scanning for a strictly
		// greater output naturally keeps the earlier backend on ties.
		let mut best: Option<Quote> = None;
		for quote in join_all(attempts).await.into_iter().flatten() {
			match &best {
				Some(current) if quote.amount_out <= current.amount_out => {}
				_ => best = Some(quote),
			}
		}

		best.ok_or(QuoteError::NoQuoteAvailable)
	}

	/// Quotes each item independently, returning results aligned with the
	/// input. Items that fail to quote are `None`; one bad item never fails
	/// the batch.
	pub async fn batch_quote(&self, items: &[QuoteRequest]) -> Vec<Option<Quote>> {
		let quotes = items.iter().map(|item| async move {
			match self.best_quote(item).await {
				Ok(quote) => Some(quote),
				Err(_) => {
					tracing::debug!(
						chain_id = item.chain_id,
						token_in = %item.token_in,
						"Dropping unquotable item from batch"
					);
					None
				}
			}
		});
		join_all(quotes).await
	}

	/// Builds swap calldata through the named backend (the one that won the
	/// quote).
	pub async fn build_swap(
		&self,
		backend_name: &str,
		request: &SwapRequest,
	) -> Result<SwapTransaction, QuoteError> {
		let backend = self
			.backends
			.iter()
			.find(|b| b.name() == backend_name)
			.ok_or_else(|| QuoteError::UnknownBackend(backend_name.to_string()))?;

		backend
			.build_swap(request)
			.await
			.map_err(|e| QuoteError::SwapBuildFailed(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{Address, U256};
	use async_trait::async_trait;

	/// Backend returning a fixed output amount, or failing when None.
	struct FixedBackend {
		name: &'static str,
		amount_out: Option<U256>,
	}

	#[async_trait]
	impl AggregatorInterface for FixedBackend {
		fn name(&self) -> &'static str {
			self.name
		}

		async fn quote(&self, request: &QuoteRequest) -> Result<Quote, AggregatorError> {
			match self.amount_out {
				Some(amount_out) => Ok(Quote {
					aggregator: self.name.to_string(),
					chain_id: request.chain_id,
					token_in: request.token_in,
					token_out: request.token_out,
					amount_in: request.amount_in,
					amount_out,
					estimated_gas: None,
					raw_transaction: None,
				}),
				None => Err(AggregatorError::Network("boom".to_string())),
			}
		}

		async fn build_swap(
			&self,
			_request: &SwapRequest,
		) -> Result<SwapTransaction, AggregatorError> {
			Err(AggregatorError::Network("not under test".to_string()))
		}
	}

	fn request() -> QuoteRequest {
		QuoteRequest {
			chain_id: 1,
			token_in: Address::repeat_byte(0xaa),
			token_out: Address::repeat_byte(0xbb),
			amount_in: U256::from(1_000_000_000_000_000_000u128),
		}
	}

	fn service(backends: Vec<Arc<dyn AggregatorInterface>>) -> QuoteService {
		QuoteService::new(backends, &QuoteConfig::default())
	}

	#[tokio::test]
	async fn test_best_quote_picks_largest_output() {
		let service = service(vec![
			Arc::new(FixedBackend {
				name: "x",
				amount_out: Some(U256::from(95_000_000u64)),
			}),
			Arc::new(FixedBackend {
				name: "y",
				amount_out: Some(U256::from(96_000_000u64)),
			}),
		]);

		let quote = service.best_quote(&request()).await.unwrap();
		assert_eq!(quote.amount_out, U256::from(96_000_000u64));
		assert_eq!(quote.aggregator, "y");
	}

	#[tokio::test]
	async fn test_best_quote_tie_prefers_priority_order() {
		let service = service(vec![
			Arc::new(FixedBackend {
				name: "first",
				amount_out: Some(U256::from(42u64)),
			}),
			Arc::new(FixedBackend {
				name: "second",
				amount_out: Some(U256::from(42u64)),
			}),
		]);

		let quote = service.best_quote(&request()).await.unwrap();
		assert_eq!(quote.aggregator, "first");
	}

	#[tokio::test]
	async fn test_best_quote_survives_failing_backend() {
		let service = service(vec![
			Arc::new(FixedBackend {
				name: "down",
				amount_out: None,
			}),
			Arc::new(FixedBackend {
				name: "up",
				amount_out: Some(U256::from(7u64)),
			}),
		]);

		let quote = service.best_quote(&request()).await.unwrap();
		assert_eq!(quote.aggregator, "up");
	}

	#[tokio::test]
	async fn test_best_quote_errors_when_all_backends_fail() {
		let service = service(vec![
			Arc::new(FixedBackend {
				name: "down1",
				amount_out: None,
			}),
			Arc::new(FixedBackend {
				name: "down2",
				amount_out: None,
			}),
		]);

		let err = service.best_quote(&request()).await.unwrap_err();
		assert!(matches!(err, QuoteError::NoQuoteAvailable));
	}

	#[tokio::test]
	async fn test_batch_quote_drops_failed_items_only() {
		// Backend that only serves chain 1.
		struct ChainPicky;

		#[async_trait]
		impl AggregatorInterface for ChainPicky {
			fn name(&self) -> &'static str {
				"picky"
			}

			async fn quote(&self, request: &QuoteRequest) -> Result<Quote, AggregatorError> {
				if request.chain_id != 1 {
					return Err(AggregatorError::UnsupportedChain(request.chain_id));
				}
				Ok(Quote {
					aggregator: "picky".to_string(),
					chain_id: request.chain_id,
					token_in: request.token_in,
					token_out: request.token_out,
					amount_in: request.amount_in,
					amount_out: U256::from(5u64),
					estimated_gas: None,
					raw_transaction: None,
				})
			}

			async fn build_swap(
				&self,
				_request: &SwapRequest,
			) -> Result<SwapTransaction, AggregatorError> {
				Err(AggregatorError::Network("not under test".to_string()))
			}
		}

		let service = service(vec![Arc::new(ChainPicky)]);
		let mut bad = request();
		bad.chain_id = 137;

		let results = service.batch_quote(&[request(), bad]).await;
		assert_eq!(results.len(), 2);
		assert!(results[0].is_some());
		assert!(results[1].is_none());
	}
}
