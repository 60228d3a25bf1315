//! 0x Swap API backend.
//!
//! Unlike the other backends, 0x hosts a separate API domain per chain and
//! its quote endpoint already returns calldata, so quotes carry a
//! ready-to-send transaction.

use crate::{AggregatorError, AggregatorInterface};
use alloy_primitives::{Address, U256};
use dust_types::{Quote, QuoteRequest, SwapRequest, SwapTransaction};
use serde::Deserialize;

/// 0x Swap API backend.
pub struct ZeroXAggregator {
	client: reqwest::Client,
	/// Test override; when set it replaces the per-chain host.
	base_url: Option<String>,
}

#[derive(Deserialize)]
struct SwapQuoteResponse {
	#[serde(rename = "buyAmount")]
	buy_amount: String,
	to: Address,
	data: String,
	value: String,
	#[serde(rename = "estimatedGas")]
	estimated_gas: Option<String>,
}

fn chain_host(chain_id: u64) -> Option<&'static str> {
	match chain_id {
		1 => Some("https://api.0x.org"),
		10 => Some("https://optimism.api.0x.org"),
		56 => Some("https://bsc.api.0x.org"),
		137 => Some("https://polygon.api.0x.org"),
		250 => Some("https://fantom.api.0x.org"),
		42161 => Some("https://arbitrum.api.0x.org"),
		43114 => Some("https://avalanche.api.0x.org"),
		_ => None,
	}
}

impl ZeroXAggregator {
	pub fn new(client: reqwest::Client) -> Self {
		Self {
			client,
			base_url: None,
		}
	}

	/// Overrides the API host, used by tests to point at a local stub.
	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = Some(base_url.into());
		self
	}

	fn host_for(&self, chain_id: u64) -> Result<String, AggregatorError> {
		if let Some(base) = &self.base_url {
			return Ok(base.clone());
		}
		chain_host(chain_id)
			.map(str::to_string)
			.ok_or(AggregatorError::UnsupportedChain(chain_id))
	}

	async fn fetch_quote(
		&self,
		chain_id: u64,
		mut params: Vec<(&'static str, String)>,
	) -> Result<SwapQuoteResponse, AggregatorError> {
		let url = format!("{}/swap/v1/quote", self.host_for(chain_id)?);
		params.push(("skipValidation", "true".to_string()));

		let response = self
			.client
			.get(&url)
			.query(&params)
			.send()
			.await
			.map_err(|e| AggregatorError::Network(e.to_string()))?;

		if !response.status().is_success() {
			return Err(AggregatorError::Network(format!(
				"0x returned status {}",
				response.status()
			)));
		}

		response
			.json()
			.await
			.map_err(|e| AggregatorError::InvalidResponse(e.to_string()))
	}
}

fn decode_transaction(body: &SwapQuoteResponse) -> Result<SwapTransaction, AggregatorError> {
	let data = hex::decode(dust_types::without_0x_prefix(&body.data))
		.map_err(|_| AggregatorError::InvalidResponse("non-hex tx data".to_string()))?;
	let value: U256 = body
		.value
		.parse()
		.map_err(|_| AggregatorError::InvalidResponse("non-numeric tx value".to_string()))?;
	Ok(SwapTransaction {
		to: body.to,
		data: data.into(),
		value,
	})
}

#[async_trait::async_trait]
impl AggregatorInterface for ZeroXAggregator {
	fn name(&self) -> &'static str {
		"0x"
	}

	async fn quote(&self, request: &QuoteRequest) -> Result<Quote, AggregatorError> {
		let body = self
			.fetch_quote(
				request.chain_id,
				vec![
					("sellToken", request.token_in.to_string()),
					("buyToken", request.token_out.to_string()),
					("sellAmount", request.amount_in.to_string()),
				],
			)
			.await?;

		let amount_out: U256 = body
			.buy_amount
			.parse()
			.map_err(|_| AggregatorError::InvalidResponse("non-numeric buyAmount".to_string()))?;
		let estimated_gas = body.estimated_gas.as_deref().and_then(|s| s.parse().ok());
		let raw_transaction = decode_transaction(&body).ok();

		Ok(Quote {
			aggregator: "0x".to_string(),
			chain_id: request.chain_id,
			token_in: request.token_in,
			token_out: request.token_out,
			amount_in: request.amount_in,
			amount_out,
			estimated_gas,
			raw_transaction,
		})
	}

	async fn build_swap(&self, request: &SwapRequest) -> Result<SwapTransaction, AggregatorError> {
		// 0x takes slippage as a unit fraction (0.01 = 1%).
		let slippage = request.slippage_bps as f64 / 10_000.0;
		let body = self
			.fetch_quote(
				request.chain_id,
				vec![
					("sellToken", request.token_in.to_string()),
					("buyToken", request.token_out.to_string()),
					("sellAmount", request.amount_in.to_string()),
					("takerAddress", request.from_address.to_string()),
					("slippagePercentage", slippage.to_string()),
				],
			)
			.await?;

		decode_transaction(&body)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_chain_host_covers_known_chains() {
		assert_eq!(chain_host(1), Some("https://api.0x.org"));
		assert_eq!(chain_host(137), Some("https://polygon.api.0x.org"));
		assert_eq!(chain_host(99999), None);
	}

	#[tokio::test]
	async fn test_quote_rejects_unsupported_chain() {
		let backend = ZeroXAggregator::new(reqwest::Client::new());
		let err = backend
			.quote(&QuoteRequest {
				chain_id: 99999,
				token_in: Address::ZERO,
				token_out: Address::ZERO,
				amount_in: U256::from(1u64),
			})
			.await
			.unwrap_err();
		assert!(matches!(err, AggregatorError::UnsupportedChain(99999)));
	}
}
