//! Claim plan and execution receipt types.

use crate::quote::{Quote, SwapTransaction};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// The kind of action a plan step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepType {
	/// ERC-20 approve for an aggregator spender.
	Approval,
	/// Swap through a DEX aggregator into the consolidation target.
	Swap,
	/// Direct transfer (single token or batched claim contract call).
	Transfer,
}

impl std::fmt::Display for StepType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			StepType::Approval => write!(f, "approval"),
			StepType::Swap => write!(f, "swap"),
			StepType::Transfer => write!(f, "transfer"),
		}
	}
}

/// One step of a chain plan. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
	pub step_type: StepType,
	/// Token being spent by this step.
	pub token_in: Address,
	/// Token being received; None for plain transfers.
	pub token_out: Option<Address>,
	/// Amount in base units.
	pub amount: U256,
	/// Minimum acceptable output, present only for swap steps
	/// (quoted output minus the slippage buffer).
	pub minimum_out: Option<U256>,
	/// Whether a separate approval transaction is required before this step.
	pub needs_approval: bool,
	/// Whether the token supports EIP-2612 permits, bundling approval with
	/// the swap instead of a separate transaction.
	pub use_permit: bool,
	/// The contract being approved to spend `token_in`, when relevant.
	pub spender: Option<Address>,
	/// The quote this step was derived from, for swap steps.
	pub quote: Option<Quote>,
	/// Ready-to-send calldata built at plan time (approvals, transfers,
	/// batched claim calls). Swap steps without one have their calldata
	/// rebuilt through the winning aggregator at execution time.
	pub prebuilt: Option<SwapTransaction>,
}

/// The ordered set of steps required to claim dust on one specific chain.
///
/// Built fresh per claim request and discarded after execution. Invariant:
/// the approval step for a token immediately precedes the swap or transfer
/// step consuming that token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainPlan {
	pub chain_id: u64,
	pub steps: Vec<PlanStep>,
}

impl ChainPlan {
	/// Number of approval steps in the plan.
	pub fn approvals_needed(&self) -> usize {
		self.steps
			.iter()
			.filter(|s| s.step_type == StepType::Approval)
			.count()
	}
}

/// Per-step outcome recorded by the executor, in submission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReceipt {
	pub step_type: StepType,
	pub success: bool,
	/// Transaction hash with 0x prefix, when one was submitted.
	pub tx_hash: Option<String>,
	/// Failure description, when the step did not succeed.
	pub error: Option<String>,
}

impl StepReceipt {
	/// Creates a failure receipt with an explanatory message.
	pub fn failure(step_type: StepType, error: impl Into<String>) -> Self {
		Self {
			step_type,
			success: false,
			tx_hash: None,
			error: Some(error.into()),
		}
	}

	/// Creates a success receipt carrying the submitted transaction hash.
	pub fn success(step_type: StepType, tx_hash: String) -> Self {
		Self {
			step_type,
			success: true,
			tx_hash: Some(tx_hash),
			error: None,
		}
	}
}
