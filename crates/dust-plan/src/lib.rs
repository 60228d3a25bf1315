//! Claim planning module for the dust sweeper.
//!
//! Takes actionable balances for a chain and produces an ordered step list
//! the executor can submit as-is: approvals immediately before the swaps
//! that depend on them, transfers prebuilt as calldata, and minimum-output
//! guarantees derived from live quotes.

use alloy_primitives::{Address, U256};
use dust_config::QuoteConfig;
use dust_quote::QuoteService;
use dust_types::{
	ChainPlan, ChainRegistryConfig, PlanStep, QuoteRequest, StepType, SwapTransaction, TokenBalance,
};
use std::sync::Arc;
use thiserror::Error;

pub mod classifier;
pub mod contracts;

pub use classifier::classify;

/// Errors reported by the plan builder.
#[derive(Debug, Error)]
pub enum PlanError {
	/// The chain is not present in the registry.
	#[error("Chain {0} is not configured")]
	UnsupportedChain(u64),
	/// On-chain state could not be read.
	#[error("State read failed: {0}")]
	StateRead(String),
}

/// How a chain's actionable balances should be consolidated.
#[derive(Debug, Clone)]
pub enum PlanMode {
	/// Move each balance to the recipient, batched through the DustClaim
	/// contract when one is deployed on the chain.
	Transfer { recipient: Address },
	/// Swap each balance into a single target token. `None` targets the
	/// chain's wrapped native token.
	SwapConsolidate { target_token: Option<Address> },
}

/// Read-only view of per-token on-chain state the planner needs.
///
/// Split out as a trait so tests drive the builder without RPC endpoints.
#[async_trait::async_trait]
pub trait TokenStateReader: Send + Sync {
	/// Current ERC-20 allowance of `spender` for `owner`.
	async fn allowance(
		&self,
		chain_id: u64,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, PlanError>;

	/// Whether the token exposes EIP-2612 permits.
	async fn supports_permit(&self, chain_id: u64, token: Address) -> bool;
}

#[async_trait::async_trait]
impl TokenStateReader for dust_scanner::ScannerService {
	async fn allowance(
		&self,
		chain_id: u64,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, PlanError> {
		dust_scanner::ScannerService::allowance(self, chain_id, token, owner, spender)
			.await
			.map_err(|e| PlanError::StateRead(e.to_string()))
	}

	async fn supports_permit(&self, chain_id: u64, token: Address) -> bool {
		dust_scanner::ScannerService::supports_permit(self, chain_id, token).await
	}
}

/// Builds per-chain claim plans from actionable balances.
pub struct PlanBuilder {
	chains: ChainRegistryConfig,
	quotes: Arc<QuoteService>,
	state: Arc<dyn TokenStateReader>,
	config: QuoteConfig,
}

impl PlanBuilder {
	pub fn new(
		chains: ChainRegistryConfig,
		quotes: Arc<QuoteService>,
		state: Arc<dyn TokenStateReader>,
		config: QuoteConfig,
	) -> Self {
		Self {
			chains,
			quotes,
			state,
			config,
		}
	}

	/// Builds the ordered step list for one chain.
	///
	/// Token order follows the input, so the same balances always produce
	/// the same plan. Tokens that cannot be planned (no quote, no spender
	/// config, already the target) are skipped with a log, never an error.
	///
	/// # Errors
	///
	/// Returns `PlanError::UnsupportedChain` when the chain is not in the
	/// registry. Everything else degrades to skipped tokens.
	pub async fn build_plan(
		&self,
		chain_id: u64,
		owner: Address,
		balances: &[TokenBalance],
		mode: &PlanMode,
	) -> Result<ChainPlan, PlanError> {
		let chain = self
			.chains
			.get(&chain_id)
			.ok_or(PlanError::UnsupportedChain(chain_id))?;

		let steps = match mode {
			PlanMode::Transfer { recipient } => {
				self.transfer_steps(chain.dust_claim_address, *recipient, balances)
			}
			PlanMode::SwapConsolidate { target_token } => {
				let target = target_token.or(chain.wrapped_native);
				match target {
					Some(target) => self.swap_steps(chain_id, owner, target, balances).await,
					None => {
						tracing::warn!(
							chain_id,
							"No consolidation target configured, skipping chain"
						);
						Vec::new()
					}
				}
			}
		};

		tracing::info!(
			chain_id,
			steps = steps.len(),
			mode = ?mode,
			"Built claim plan"
		);

		Ok(ChainPlan { chain_id, steps })
	}

	/// One batched DustClaim call when the contract is deployed, otherwise
	/// one plain `transfer` per token.
	fn transfer_steps(
		&self,
		claim_contract: Option<Address>,
		recipient: Address,
		balances: &[TokenBalance],
	) -> Vec<PlanStep> {
		if balances.is_empty() {
			return Vec::new();
		}

		if let Some(contract) = claim_contract {
			let tokens: Vec<Address> = balances.iter().map(|b| b.token_address).collect();
			let total: U256 = balances
				.iter()
				.fold(U256::ZERO, |acc, b| acc + b.amount_base_units);
			// Minimum returns and router calldata are left empty; the
			// contract falls back to its own conversion path.
			let data = contracts::encode_claim_dust_batch(
				tokens,
				vec![U256::ZERO; balances.len()],
				vec![Default::default(); balances.len()],
			);
			return vec![PlanStep {
				step_type: StepType::Transfer,
				// The step covers every token at once; individual amounts
				// live inside the calldata.
				token_in: Address::ZERO,
				token_out: None,
				amount: total,
				minimum_out: None,
				needs_approval: false,
				use_permit: false,
				spender: None,
				quote: None,
				prebuilt: Some(SwapTransaction {
					to: contract,
					data,
					value: U256::ZERO,
				}),
			}];
		}

		balances
			.iter()
			.map(|balance| PlanStep {
				step_type: StepType::Transfer,
				token_in: balance.token_address,
				token_out: None,
				amount: balance.amount_base_units,
				minimum_out: None,
				needs_approval: false,
				use_permit: false,
				spender: None,
				quote: None,
				prebuilt: Some(SwapTransaction {
					to: balance.token_address,
					data: contracts::encode_transfer(recipient, balance.amount_base_units),
					value: U256::ZERO,
				}),
			})
			.collect()
	}

	/// Per-token swap steps into the target, each preceded by an approval
	/// when the current allowance is short and the token has no permit.
	async fn swap_steps(
		&self,
		chain_id: u64,
		owner: Address,
		target: Address,
		balances: &[TokenBalance],
	) -> Vec<PlanStep> {
		let mut steps = Vec::new();

		for balance in balances {
			if balance.token_address == target {
				continue;
			}

			let request = QuoteRequest {
				chain_id,
				token_in: balance.token_address,
				token_out: target,
				amount_in: balance.amount_base_units,
			};
			let quote = match self.quotes.best_quote(&request).await {
				Ok(quote) => quote,
				Err(e) => {
					tracing::debug!(
						chain_id,
						token = %balance.token_address,
						error = %e,
						"No quote, skipping token"
					);
					continue;
				}
			};

			let Some(spender) = self.config.spender_for(&quote.aggregator, chain_id) else {
				tracing::warn!(
					chain_id,
					backend = quote.aggregator,
					"No spender configured for winning backend, skipping token"
				);
				continue;
			};

			let minimum_out = quote.amount_out * U256::from(10_000 - self.config.slippage_bps)
				/ U256::from(10_000u64);

			let use_permit = self
				.state
				.supports_permit(chain_id, balance.token_address)
				.await;
			let needs_approval = if use_permit {
				false
			} else {
				// An unreadable allowance is treated as zero so the plan
				// errs toward an extra approval rather than a failed swap.
				let allowance = self
					.state
					.allowance(chain_id, balance.token_address, owner, spender)
					.await
					.unwrap_or(U256::ZERO);
				allowance < balance.amount_base_units
			};

			if needs_approval {
				steps.push(PlanStep {
					step_type: StepType::Approval,
					token_in: balance.token_address,
					token_out: None,
					amount: balance.amount_base_units,
					minimum_out: None,
					needs_approval: false,
					use_permit: false,
					spender: Some(spender),
					quote: None,
					prebuilt: Some(SwapTransaction {
						to: balance.token_address,
						data: contracts::encode_approve(spender, balance.amount_base_units),
						value: U256::ZERO,
					}),
				});
			}

			let prebuilt = quote.raw_transaction.clone();
			steps.push(PlanStep {
				step_type: StepType::Swap,
				token_in: balance.token_address,
				token_out: Some(target),
				amount: balance.amount_base_units,
				minimum_out: Some(minimum_out),
				needs_approval,
				use_permit,
				spender: Some(spender),
				quote: Some(quote),
				prebuilt,
			});
		}

		steps
	}

}
