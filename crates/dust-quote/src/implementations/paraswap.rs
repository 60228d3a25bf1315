//! ParaSwap v5 backend.
//!
//! ParaSwap splits quoting into a `prices` call that returns an opaque
//! route object and a `transactions` call that turns the route into
//! calldata. `build_swap` re-fetches the route so the calldata always
//! reflects current liquidity.

use crate::{AggregatorError, AggregatorInterface};
use alloy_primitives::{Address, U256};
use dust_types::{Quote, QuoteRequest, SwapRequest, SwapTransaction};
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_BASE_URL: &str = "https://api.paraswap.io";

const SUPPORTED_CHAINS: &[u64] = &[1, 10, 56, 137, 250, 42161, 43114];

/// ParaSwap API backend.
pub struct ParaSwapAggregator {
	client: reqwest::Client,
	base_url: String,
}

#[derive(Deserialize)]
struct PricesResponse {
	#[serde(rename = "priceRoute")]
	price_route: Value,
}

#[derive(Deserialize)]
struct TransactionResponse {
	to: Address,
	data: String,
	value: String,
}

impl ParaSwapAggregator {
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

	/// Fetches the best sell route for the conversion.
	async fn fetch_route(
		&self,
		chain_id: u64,
		token_in: Address,
		token_out: Address,
		amount_in: U256,
	) -> Result<Value, AggregatorError> {
		let url = format!("{}/prices", self.base_url);
		let response = self
			.client
			.get(&url)
			.query(&[
				("srcToken", token_in.to_string()),
				("destToken", token_out.to_string()),
				("amount", amount_in.to_string()),
				("side", "SELL".to_string()),
				("network", chain_id.to_string()),
			])
			.send()
			.await
			.map_err(|e| AggregatorError::Network(e.to_string()))?;

		if !response.status().is_success() {
			return Err(AggregatorError::Network(format!(
				"ParaSwap returned status {}",
				response.status()
			)));
		}

		let body: PricesResponse = response
			.json()
			.await
			.map_err(|e| AggregatorError::InvalidResponse(e.to_string()))?;
		Ok(body.price_route)
	}
}

fn route_dest_amount(route: &Value) -> Result<U256, AggregatorError> {
	route
		.get("destAmount")
		.and_then(Value::as_str)
		.and_then(|s| s.parse().ok())
		.ok_or_else(|| AggregatorError::InvalidResponse("missing destAmount in route".to_string()))
}

fn route_gas_cost(route: &Value) -> Option<u64> {
	route
		.get("gasCost")
		.and_then(Value::as_str)
		.and_then(|s| s.parse().ok())
}

#[async_trait::async_trait]
impl AggregatorInterface for ParaSwapAggregator {
	fn name(&self) -> &'static str {
		"paraswap"
	}

	async fn quote(&self, request: &QuoteRequest) -> Result<Quote, AggregatorError> {
		self.check_chain(request.chain_id)?;

		let route = self
			.fetch_route(
				request.chain_id,
				request.token_in,
				request.token_out,
				request.amount_in,
			)
			.await?;

		Ok(Quote {
			aggregator: "paraswap".to_string(),
			chain_id: request.chain_id,
			token_in: request.token_in,
			token_out: request.token_out,
			amount_in: request.amount_in,
			amount_out: route_dest_amount(&route)?,
			estimated_gas: route_gas_cost(&route),
			raw_transaction: None,
		})
	}

	async fn build_swap(&self, request: &SwapRequest) -> Result<SwapTransaction, AggregatorError> {
		self.check_chain(request.chain_id)?;

		let route = self
			.fetch_route(
				request.chain_id,
				request.token_in,
				request.token_out,
				request.amount_in,
			)
			.await?;
		let dest_amount = route_dest_amount(&route)?;

		// ParaSwap expects the slippage-adjusted minimum as destAmount.
		let min_out = dest_amount * U256::from(10_000 - request.slippage_bps) / U256::from(10_000u64);

		let url = format!("{}/transactions/{}", self.base_url, request.chain_id);
		let response = self
			.client
			.post(&url)
			.query(&[("ignoreChecks", "true")])
			.json(&json!({
				"srcToken": request.token_in.to_string(),
				"destToken": request.token_out.to_string(),
				"srcAmount": request.amount_in.to_string(),
				"destAmount": min_out.to_string(),
				"priceRoute": route,
				"userAddress": request.from_address.to_string(),
			}))
			.send()
			.await
			.map_err(|e| AggregatorError::Network(e.to_string()))?;

		if !response.status().is_success() {
			return Err(AggregatorError::Network(format!(
				"ParaSwap returned status {}",
				response.status()
			)));
		}

		let body: TransactionResponse = response
			.json()
			.await
			.map_err(|e| AggregatorError::InvalidResponse(e.to_string()))?;

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
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_route_dest_amount_parses_decimal_string() {
		let route = json!({ "destAmount": "123456789", "gasCost": "21000" });
		assert_eq!(route_dest_amount(&route).unwrap(), U256::from(123_456_789u64));
		assert_eq!(route_gas_cost(&route), Some(21_000));
	}

	#[test]
	fn test_route_dest_amount_rejects_missing_field() {
		let route = json!({ "gasCost": "21000" });
		assert!(route_dest_amount(&route).is_err());
	}
}
