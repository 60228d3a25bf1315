//! DEX aggregator quote types.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Ready-to-send swap calldata returned by an aggregator's swap endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapTransaction {
	/// Target contract (the aggregator's router).
	pub to: Address,
	/// ABI-encoded call data.
	pub data: Bytes,
	/// Native value to attach, usually zero for ERC-20 swaps.
	pub value: U256,
}

/// A single point-in-time quote from one aggregator backend.
///
/// Quotes are never cached or reused across calls; every plan build
/// re-quotes so the minimum-output guarantee reflects current prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
	/// Name of the backend that produced the quote (e.g., "1inch").
	pub aggregator: String,
	/// The chain the quote applies to.
	pub chain_id: u64,
	/// Token being sold.
	pub token_in: Address,
	/// Token being bought.
	pub token_out: Address,
	/// Input amount in base units.
	pub amount_in: U256,
	/// Quoted output amount in base units.
	pub amount_out: U256,
	/// Backend gas estimate, when provided.
	pub estimated_gas: Option<u64>,
	/// Ready-to-send calldata, when the quote endpoint returned one.
	/// Absent quotes are rebuilt through the swap endpoint at execution.
	pub raw_transaction: Option<SwapTransaction>,
}

/// Parameters for requesting a quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
	pub chain_id: u64,
	pub token_in: Address,
	pub token_out: Address,
	pub amount_in: U256,
}

/// Parameters for building ready-to-send swap calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
	pub chain_id: u64,
	pub token_in: Address,
	pub token_out: Address,
	pub amount_in: U256,
	/// The address the swap executes on behalf of.
	pub from_address: Address,
	/// Slippage tolerance in basis points (100 = 1%).
	pub slippage_bps: u32,
}
