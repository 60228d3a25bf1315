//! Balance snapshot types produced by scanning a chain for one address.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// A single ERC-20 balance found during a scan.
///
/// Amounts are carried both as raw base units (what planning needs) and as a
/// human-decimal string (what callers render), so nothing downstream has to
/// re-parse formatted output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalance {
	/// The token contract address.
	pub token_address: Address,
	/// The token symbol (e.g., "USDC").
	pub symbol: String,
	/// Number of decimal places for the token.
	pub decimals: u8,
	/// Raw balance in base units (wei-scale integer).
	pub amount_base_units: U256,
	/// Balance in human units, formatted with the token's decimals.
	pub balance_decimal: String,
	/// USD unit price, when price resolution succeeded.
	pub usd_price: Option<f64>,
	/// USD value (balance x unit price), when the price is known.
	pub usd_value: Option<f64>,
}

/// Result of scanning one chain for one address.
///
/// Created fresh per scan invocation and never mutated afterwards; a rescan
/// replaces the snapshot wholesale. Invariant: `token_balances` contains only
/// entries with strictly positive balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSnapshot {
	/// The chain this snapshot was taken on.
	pub chain_id: u64,
	/// Native coin balance in human units (e.g., "0.0005").
	pub native_balance: String,
	/// Native coin balance in wei.
	pub native_balance_wei: U256,
	/// Positive ERC-20 balances found on this chain.
	pub token_balances: Vec<TokenBalance>,
	/// Unix timestamp in milliseconds when the scan completed.
	pub scanned_at_millis: u64,
}

impl BalanceSnapshot {
	/// Creates an empty snapshot for a chain, used when a scan found nothing.
	pub fn empty(chain_id: u64, scanned_at_millis: u64) -> Self {
		Self {
			chain_id,
			native_balance: "0".to_string(),
			native_balance_wei: U256::ZERO,
			token_balances: Vec::new(),
			scanned_at_millis,
		}
	}

	/// Returns true when neither native nor token balances were found.
	pub fn is_empty(&self) -> bool {
		self.native_balance_wei.is_zero() && self.token_balances.is_empty()
	}
}
