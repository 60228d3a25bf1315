//! Pure dust classification over priced balance snapshots.
//!
//! Classification is deterministic and does no I/O, so it can rerun
//! whenever the user adjusts thresholds without touching the network.

use alloy_primitives::U256;
use dust_types::{BalanceSnapshot, DustClassification, DustThresholds, TokenBalance};

/// Classifies a snapshot against the given thresholds.
///
/// The native balance is dust when it is positive but below `native_min`
/// native units. A token balance is actionable when `include_non_dust`
/// admits every positive balance, or when its known USD value falls inside
/// the `[token_usd_min, token_usd_max]` window (inclusive on both ends).
/// Tokens without a USD value never pass the window filter.
pub fn classify(snapshot: &BalanceSnapshot, thresholds: &DustThresholds) -> DustClassification {
	let native: f64 = snapshot.native_balance.parse().unwrap_or(0.0);
	let is_native_dust = native > 0.0 && native < thresholds.native_min;

	let actionable_tokens = snapshot
		.token_balances
		.iter()
		.filter(|balance| is_actionable(balance, thresholds))
		.cloned()
		.collect();

	DustClassification {
		chain_id: snapshot.chain_id,
		is_native_dust,
		actionable_tokens,
	}
}

fn is_actionable(balance: &TokenBalance, thresholds: &DustThresholds) -> bool {
	if balance.amount_base_units == U256::ZERO {
		return false;
	}
	if thresholds.include_non_dust {
		return true;
	}
	match balance.usd_value {
		Some(value) => value >= thresholds.token_usd_min && value <= thresholds.token_usd_max,
		None => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::Address;
	use dust_types::current_timestamp_millis;

	fn token(symbol: &str, amount: u64, usd_value: Option<f64>) -> TokenBalance {
		TokenBalance {
			token_address: Address::repeat_byte(symbol.as_bytes()[0]),
			symbol: symbol.to_string(),
			decimals: 18,
			amount_base_units: U256::from(amount),
			balance_decimal: amount.to_string(),
			usd_price: None,
			usd_value,
		}
	}

	fn snapshot(native: &str, tokens: Vec<TokenBalance>) -> BalanceSnapshot {
		BalanceSnapshot {
			chain_id: 137,
			native_balance: native.to_string(),
			native_balance_wei: U256::from(1u64),
			token_balances: tokens,
			scanned_at_millis: current_timestamp_millis(),
		}
	}

	#[test]
	fn test_native_dust_window() {
		let thresholds = DustThresholds::default();
		assert!(classify(&snapshot("0.0005", vec![]), &thresholds).is_native_dust);
		assert!(!classify(&snapshot("0.0", vec![]), &thresholds).is_native_dust);
		assert!(!classify(&snapshot("0.001", vec![]), &thresholds).is_native_dust);
		assert!(!classify(&snapshot("1.5", vec![]), &thresholds).is_native_dust);
	}

	#[test]
	fn test_token_usd_window_is_inclusive() {
		let thresholds = DustThresholds::default();
		let result = classify(
			&snapshot(
				"0.0",
				vec![
					token("a", 100, Some(0.24)),
					token("b", 100, Some(0.25)),
					token("c", 100, Some(10.0)),
					token("d", 100, Some(25.0)),
					token("e", 100, Some(25.01)),
				],
			),
			&thresholds,
		);
		let symbols: Vec<_> = result
			.actionable_tokens
			.iter()
			.map(|t| t.symbol.as_str())
			.collect();
		assert_eq!(symbols, vec!["b", "c", "d"]);
	}

	#[test]
	fn test_unpriced_token_excluded_from_window() {
		let thresholds = DustThresholds::default();
		let result = classify(&snapshot("0.0", vec![token("a", 100, None)]), &thresholds);
		assert!(result.actionable_tokens.is_empty());
	}

	#[test]
	fn test_include_non_dust_admits_everything_positive() {
		let thresholds = DustThresholds {
			include_non_dust: true,
			..DustThresholds::default()
		};
		let result = classify(
			&snapshot(
				"0.0",
				vec![
					token("a", 100, None),
					token("b", 100, Some(9999.0)),
					token("c", 0, Some(1.0)),
				],
			),
			&thresholds,
		);
		let symbols: Vec<_> = result
			.actionable_tokens
			.iter()
			.map(|t| t.symbol.as_str())
			.collect();
		// A zero balance is never actionable, even with the override.
		assert_eq!(symbols, vec!["a", "b"]);
	}

	#[test]
	fn test_polygon_example_scenario() {
		// 0.0005 MATIC native plus a $0.25 token on chain 137: both dust.
		let thresholds = DustThresholds::default();
		let result = classify(
			&snapshot("0.0005", vec![token("usdc", 250_000, Some(0.25))]),
			&thresholds,
		);
		assert!(result.is_native_dust);
		assert_eq!(result.actionable_tokens.len(), 1);
	}
}
