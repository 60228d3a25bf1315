//! Dust threshold and classification types.

use crate::balance::TokenBalance;
use serde::{Deserialize, Serialize};

/// User-configurable thresholds deciding which balances are actionable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DustThresholds {
	/// Native balance below this (in native units) is considered dust.
	#[serde(default = "default_native_min")]
	pub native_min: f64,
	/// Lower bound of the token USD dust window (inclusive).
	#[serde(default = "default_token_usd_min")]
	pub token_usd_min: f64,
	/// Upper bound of the token USD dust window (inclusive).
	#[serde(default = "default_token_usd_max")]
	pub token_usd_max: f64,
	/// When true, every positive token balance is actionable regardless of
	/// the USD window.
	#[serde(default)]
	pub include_non_dust: bool,
}

fn default_native_min() -> f64 {
	0.001
}

fn default_token_usd_min() -> f64 {
	0.25
}

fn default_token_usd_max() -> f64 {
	25.0
}

impl Default for DustThresholds {
	fn default() -> Self {
		Self {
			native_min: default_native_min(),
			token_usd_min: default_token_usd_min(),
			token_usd_max: default_token_usd_max(),
			include_non_dust: false,
		}
	}
}

/// Derived classification of one snapshot against a set of thresholds.
///
/// Not persisted; recomputed whenever thresholds change. Invariant:
/// `actionable_tokens` is a subset of the snapshot's `token_balances`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DustClassification {
	/// The chain the underlying snapshot was taken on.
	pub chain_id: u64,
	/// Whether the native balance is positive but below `native_min`.
	pub is_native_dust: bool,
	/// Token balances passing the dust window or the include-all override.
	pub actionable_tokens: Vec<TokenBalance>,
}
