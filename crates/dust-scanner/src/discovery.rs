//! Broad token discovery beyond the curated registry.
//!
//! When a chain has no curated token list, candidate tokens are pulled from
//! public token-list URLs and their balances read through Multicall3 in
//! chunks. Every stage is best-effort: an unreachable list, a failed chunk,
//! or a chain without a Multicall3 deployment degrades to whatever was
//! found elsewhere.

use crate::{erc20, ScannerError, ScannerService};
use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{sol, SolCall};
use dust_types::{format_units, ChainConfig, TokenBalance};
use std::collections::HashSet;

sol! {
	/// Multicall3 call descriptor.
	struct Call3 {
		address target;
		bool allowFailure;
		bytes callData;
	}

	/// Multicall3 per-call result.
	struct CallResult {
		bool success;
		bytes returnData;
	}

	/// Multicall3 batched call entry point.
	function aggregate3(Call3[] calldata calls) external payable returns (CallResult[] memory returnData);
}

/// A token candidate parsed from a public token list.
#[derive(Debug, Clone)]
pub struct TokenListEntry {
	pub address: Address,
	pub symbol: String,
	pub decimals: u8,
}

/// Parses one token-list JSON document into candidates.
///
/// Tolerates the common layouts: 1inch's `{ "tokens": { addr: {..} } }`
/// map, the token-list standard's `{ "tokens": [..] }` array, and a bare
/// array of token objects.
pub fn parse_token_list(raw: &serde_json::Value) -> Vec<TokenListEntry> {
	let mut out = Vec::new();

	let push = |out: &mut Vec<TokenListEntry>, addr: &str, obj: &serde_json::Value| {
		if let Ok(address) = addr.parse::<Address>() {
			out.push(TokenListEntry {
				address,
				symbol: obj
					.get("symbol")
					.and_then(|s| s.as_str())
					.unwrap_or("")
					.to_string(),
				decimals: obj
					.get("decimals")
					.and_then(|d| d.as_u64())
					.unwrap_or(18) as u8,
			});
		}
	};

	match raw.get("tokens") {
		Some(serde_json::Value::Object(map)) => {
			for (addr, obj) in map {
				push(&mut out, addr, obj);
			}
		}
		Some(serde_json::Value::Array(list)) => {
			for obj in list {
				if let Some(addr) = obj.get("address").and_then(|a| a.as_str()) {
					push(&mut out, addr, obj);
				}
			}
		}
		_ => {
			if let Some(list) = raw.as_array() {
				for obj in list {
					if let Some(addr) = obj.get("address").and_then(|a| a.as_str()) {
						push(&mut out, addr, obj);
					}
				}
			}
		}
	}

	out
}

/// Loads and merges the chain's token lists, deduplicating by address.
async fn load_token_lists(
	http: &reqwest::Client,
	chain: &ChainConfig,
) -> Vec<TokenListEntry> {
	let mut merged = Vec::new();
	let mut seen = HashSet::new();

	for url in &chain.token_list_urls {
		let raw: serde_json::Value = match http.get(url).send().await {
			Ok(response) => match response.json().await {
				Ok(json) => json,
				Err(e) => {
					tracing::debug!(url, error = %e, "Token list parse failed");
					continue;
				}
			},
			Err(e) => {
				tracing::debug!(url, error = %e, "Token list fetch failed");
				continue;
			}
		};

		for entry in parse_token_list(&raw) {
			if seen.insert(entry.address) {
				merged.push(entry);
			}
		}
	}

	merged
}

/// Discovers positive token balances for an owner via token lists and
/// Multicall3.
///
/// Returns an empty list when the chain has no Multicall3 deployment or no
/// token-list sources; the caller keeps whatever the curated registry
/// produced.
pub async fn discover_token_balances(
	http: &reqwest::Client,
	scanner: &ScannerService,
	chain_id: u64,
	chain: &ChainConfig,
	owner: Address,
	chunk_size: usize,
) -> Result<Vec<TokenBalance>, ScannerError> {
	let multicall = match chain.multicall3 {
		Some(address) => address,
		None => {
			tracing::debug!(chain_id, "No Multicall3 deployment, skipping discovery");
			return Ok(Vec::new());
		}
	};

	let candidates = load_token_lists(http, chain).await;
	if candidates.is_empty() {
		return Ok(Vec::new());
	}
	tracing::debug!(chain_id, candidates = candidates.len(), "Probing token list");

	let mut found = Vec::new();
	for chunk in candidates.chunks(chunk_size) {
		let calls: Vec<Call3> = chunk
			.iter()
			.map(|token| Call3 {
				target: token.address,
				allowFailure: true,
				callData: Bytes::from(erc20::balance_of_calldata(owner)),
			})
			.collect();

		let call_data = aggregate3Call { calls }.abi_encode();
		let return_data = match scanner.eth_call(chain_id, multicall, call_data).await {
			Ok(data) => data,
			Err(e) => {
				// Ignore this chunk; response-size limits and flaky
				// contracts shouldn't abort the rest.
				tracing::debug!(chain_id, error = %e, "Multicall chunk failed");
				continue;
			}
		};

		let decoded = match aggregate3Call::abi_decode_returns(&return_data, true) {
			Ok(ret) => ret.returnData,
			Err(e) => {
				tracing::debug!(chain_id, error = %e, "Multicall decode failed");
				continue;
			}
		};

		for (token, result) in chunk.iter().zip(decoded) {
			if !result.success {
				continue;
			}
			let amount = match erc20::decode_uint(&result.returnData) {
				Some(amount) if !amount.is_zero() => amount,
				_ => continue,
			};
			found.push(TokenBalance {
				token_address: token.address,
				symbol: token.symbol.clone(),
				decimals: token.decimals,
				amount_base_units: amount,
				balance_decimal: format_units(amount, token.decimals),
				usd_price: None,
				usd_value: None,
			});
		}
	}

	Ok(found)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_parse_oneinch_shape() {
		let raw = json!({
			"tokens": {
				"0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48": {
					"symbol": "USDC",
					"decimals": 6
				}
			}
		});
		let entries = parse_token_list(&raw);
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].symbol, "USDC");
		assert_eq!(entries[0].decimals, 6);
	}

	#[test]
	fn test_parse_token_list_array_shape() {
		let raw = json!({
			"tokens": [
				{ "address": "0x6B175474E89094C44Da98b954EedeAC495271d0F", "symbol": "DAI", "decimals": 18 },
				{ "symbol": "MISSING_ADDRESS" }
			]
		});
		let entries = parse_token_list(&raw);
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].symbol, "DAI");
	}

	#[test]
	fn test_parse_bare_array_defaults_decimals() {
		let raw = json!([
			{ "address": "0x6B175474E89094C44Da98b954EedeAC495271d0F" }
		]);
		let entries = parse_token_list(&raw);
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].decimals, 18);
	}

	#[test]
	fn test_parse_garbage_is_empty() {
		assert!(parse_token_list(&json!("nope")).is_empty());
		assert!(parse_token_list(&json!({"pairs": []})).is_empty());
	}
}
