//! 1inch aggregation API v5 backend.

use crate::{AggregatorError, AggregatorInterface};
use alloy_primitives::{Address, U256};
use dust_types::{Quote, QuoteRequest, SwapRequest, SwapTransaction};
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.1inch.io/v5.0";

/// Chains with a 1inch v5 deployment.
const SUPPORTED_CHAINS: &[u64] = &[1, 10, 56, 137, 250, 42161, 43114];

/// 1inch API backend.
pub struct OneInchAggregator {
	client: reqwest::Client,
	base_url: String,
}

#[derive(Deserialize)]
struct QuoteResponse {
	#[serde(rename = "toTokenAmount")]
	to_token_amount: String,
	#[serde(rename = "estimatedGas")]
	estimated_gas: Option<u64>,
}

#[derive(Deserialize)]
struct SwapResponse {
	tx: TxPayload,
}

#[derive(Deserialize)]
struct TxPayload {
	to: Address,
	data: String,
	value: String,
}

impl OneInchAggregator {
	pub fn new(client: reqwest::Client) -> Self {
		Self {
			client,
			base_url: DEFAULT_BASE_URL.to_string(),
		}
	}

	/// Overrides the API host, used by tests to point at a local stub.
	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();
		self
	}

	fn check_chain(&self, chain_id: u64) -> Result<(), AggregatorError> {
		if SUPPORTED_CHAINS.contains(&chain_id) {
			Ok(())
		} else {
			Err(AggregatorError::UnsupportedChain(chain_id))
		}
	}
}

#[async_trait::async_trait]
impl AggregatorInterface for OneInchAggregator {
	fn name(&self) -> &'static str {
		"1inch"
	}

	async fn quote(&self, request: &QuoteRequest) -> Result<Quote, AggregatorError> {
		self.check_chain(request.chain_id)?;

		let url = format!("{}/{}/quote", self.base_url, request.chain_id);
		let response = self
			.client
			.get(&url)
			.query(&[
				("fromTokenAddress", request.token_in.to_string()),
				("toTokenAddress", request.token_out.to_string()),
				("amount", request.amount_in.to_string()),
			])
			.send()
			.await
			.map_err(|e| AggregatorError::Network(e.to_string()))?;

		if !response.status().is_success() {
			return Err(AggregatorError::Network(format!(
				"1inch returned status {}",
				response.status()
			)));
		}

		let body: QuoteResponse = response
			.json()
			.await
			.map_err(|e| AggregatorError::InvalidResponse(e.to_string()))?;

		let amount_out: U256 = body
			.to_token_amount
			.parse()
			.map_err(|_| AggregatorError::InvalidResponse("non-numeric toTokenAmount".to_string()))?;

		Ok(Quote {
			aggregator: "1inch".to_string(),
			chain_id: request.chain_id,
			token_in: request.token_in,
			token_out: request.token_out,
			amount_in: request.amount_in,
			amount_out,
			estimated_gas: body.estimated_gas,
			raw_transaction: None,
		})
	}

	async fn build_swap(&self, request: &SwapRequest) -> Result<SwapTransaction, AggregatorError> {
		self.check_chain(request.chain_id)?;

		// 1inch takes slippage as a percentage, not basis points.
		let slippage_pct = request.slippage_bps as f64 / 100.0;
		let url = format!("{}/{}/swap", self.base_url, request.chain_id);
		let response = self
			.client
			.get(&url)
			.query(&[
				("fromTokenAddress", request.token_in.to_string()),
				("toTokenAddress", request.token_out.to_string()),
				("amount", request.amount_in.to_string()),
				("fromAddress", request.from_address.to_string()),
				("slippage", slippage_pct.to_string()),
				("disableEstimate", "true".to_string()),
			])
			.send()
			.await
			.map_err(|e| AggregatorError::Network(e.to_string()))?;

		if !response.status().is_success() {
			return Err(AggregatorError::Network(format!(
				"1inch returned status {}",
				response.status()
			)));
		}

		let body: SwapResponse = response
			.json()
			.await
			.map_err(|e| AggregatorError::InvalidResponse(e.to_string()))?;

		let data = dust_types::without_0x_prefix(&body.tx.data);
		let data = hex::decode(data)
			.map_err(|_| AggregatorError::InvalidResponse("non-hex tx data".to_string()))?;
		let value: U256 = body
			.tx
			.value
			.parse()
			.map_err(|_| AggregatorError::InvalidResponse("non-numeric tx value".to_string()))?;

		Ok(SwapTransaction {
			to: body.tx.to,
			data: data.into(),
			value,
		})
	}
}
