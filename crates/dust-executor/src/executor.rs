//! Step-by-step plan execution against a wallet session.

use crate::{WalletSession, WalletSubscription};
use alloy_primitives::Address;
use dust_config::QuoteConfig;
use dust_quote::QuoteService;
use dust_types::{
	ChainPlan, PlanStep, StepReceipt, StepType, SwapRequest, SwapTransaction, WalletTransaction,
};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported while resolving a step into a transaction.
#[derive(Debug, Error)]
pub enum ExecutorError {
	/// The wallet has no active account to execute from.
	#[error("No active account")]
	NoAccount,
	/// A swap step had no calldata and none could be rebuilt.
	#[error("Could not build swap calldata: {0}")]
	SwapBuild(String),
}

/// Where the executor currently is in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecutionState {
	SwitchingChain,
	ExecutingStep(usize),
	Done,
	Aborted,
}

/// Executes chain plans one step at a time.
///
/// Steps are submitted strictly sequentially so wallet nonces stay
/// ordered. A failed step never aborts the plan; only a failed chain
/// switch or a wallet disconnect does.
pub struct PlanExecutor {
	quotes: Arc<QuoteService>,
	config: QuoteConfig,
}

impl PlanExecutor {
	pub fn new(quotes: Arc<QuoteService>, config: QuoteConfig) -> Self {
		Self { quotes, config }
	}

	/// Runs every step of the plan, returning one receipt per step in
	/// submission order.
	///
	/// A failed approval marks its token so dependent swap steps are
	/// skipped with an explanatory receipt instead of burning gas on a
	/// swap that would revert.
	#[tracing::instrument(skip_all, fields(chain_id = plan.chain_id))]
	pub async fn execute(&self, plan: &ChainPlan, wallet: &dyn WalletSession) -> Vec<StepReceipt> {
		let mut receipts = Vec::with_capacity(plan.steps.len());
		if plan.steps.is_empty() {
			return receipts;
		}

		let mut subscription = wallet.subscribe();
		let mut state = ExecutionState::SwitchingChain;
		tracing::debug!(chain_id = plan.chain_id, ?state, "Starting plan execution");

		if wallet.current_chain_id() != Some(plan.chain_id) {
			if let Err(e) = wallet.switch_chain(plan.chain_id).await {
				state = ExecutionState::Aborted;
				tracing::warn!(chain_id = plan.chain_id, ?state, error = %e, "Chain switch failed");
				receipts.push(StepReceipt::failure(
					plan.steps[0].step_type,
					format!("Chain switch failed: {}", e),
				));
				return receipts;
			}
		}

		let mut failed_approvals: HashSet<Address> = HashSet::new();

		for (index, step) in plan.steps.iter().enumerate() {
			state = ExecutionState::ExecutingStep(index);
			tracing::debug!(chain_id = plan.chain_id, ?state, step_type = %step.step_type, "Executing step");

			if Self::disconnected(wallet, &mut subscription) {
				state = ExecutionState::Aborted;
				tracing::warn!(chain_id = plan.chain_id, ?state, "Wallet disconnected mid-plan");
				for remaining in &plan.steps[index..] {
					receipts.push(StepReceipt::failure(
						remaining.step_type,
						"Wallet disconnected, execution aborted",
					));
				}
				return receipts;
			}

			if step.step_type == StepType::Swap
				&& step.needs_approval
				&& failed_approvals.contains(&step.token_in)
			{
				receipts.push(StepReceipt::failure(
					StepType::Swap,
					format!("Skipped: approval for {} failed", step.token_in),
				));
				continue;
			}

			let tx = match self.resolve_transaction(plan.chain_id, step, wallet).await {
				Ok(tx) => tx,
				Err(e) => {
					if step.step_type == StepType::Approval {
						failed_approvals.insert(step.token_in);
					}
					receipts.push(StepReceipt::failure(step.step_type, e.to_string()));
					continue;
				}
			};

			match wallet.send_transaction(&tx).await {
				Ok(tx_hash) => {
					tracing::info!(
						chain_id = plan.chain_id,
						step_type = %step.step_type,
						tx_hash = %tx_hash,
						"Step submitted"
					);
					receipts.push(StepReceipt::success(step.step_type, tx_hash));
				}
				Err(e) => {
					tracing::warn!(
						chain_id = plan.chain_id,
						step_type = %step.step_type,
						error = %e,
						"Step failed"
					);
					if step.step_type == StepType::Approval {
						failed_approvals.insert(step.token_in);
					}
					receipts.push(StepReceipt::failure(step.step_type, e.to_string()));
				}
			}
		}

		state = ExecutionState::Done;
		tracing::debug!(chain_id = plan.chain_id, ?state, receipts = receipts.len(), "Plan finished");
		receipts
	}

	/// Checks both the queued events and the live connection flag.
	fn disconnected(wallet: &dyn WalletSession, subscription: &mut WalletSubscription) -> bool {
		while let Some(event) = subscription.try_recv() {
			if event == crate::WalletEvent::Disconnected {
				return true;
			}
		}
		!wallet.is_connected()
	}

	/// Resolves a step into a sendable transaction: plan-time calldata
	/// first, then the quote's bundled transaction, then a fresh build
	/// through the winning aggregator.
	async fn resolve_transaction(
		&self,
		chain_id: u64,
		step: &PlanStep,
		wallet: &dyn WalletSession,
	) -> Result<WalletTransaction, ExecutorError> {
		let swap_tx: SwapTransaction = if let Some(prebuilt) = &step.prebuilt {
			prebuilt.clone()
		} else if let Some(tx) = step.quote.as_ref().and_then(|q| q.raw_transaction.clone()) {
			tx
		} else {
			let quote = step
				.quote
				.as_ref()
				.ok_or_else(|| ExecutorError::SwapBuild("step carries no quote".to_string()))?;
			let from_address = wallet.current_account().ok_or(ExecutorError::NoAccount)?;
			self.quotes
				.build_swap(
					&quote.aggregator,
					&SwapRequest {
						chain_id: quote.chain_id,
						token_in: quote.token_in,
						token_out: quote.token_out,
						amount_in: quote.amount_in,
						from_address,
						slippage_bps: self.config.slippage_bps,
					},
				)
				.await
				.map_err(|e| ExecutorError::SwapBuild(e.to_string()))?
		};

		Ok(WalletTransaction {
			chain_id,
			to: swap_tx.to,
			data: swap_tx.data,
			value: swap_tx.value,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{WalletError, WalletEvent};
	use alloy_primitives::{Bytes, U256};
	use dust_quote::{AggregatorError, AggregatorInterface};
	use dust_types::{Quote, QuoteRequest};
	use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
	use std::sync::Mutex;
	use tokio::sync::broadcast;

	/// Wallet that records every call in order and can be told to fail
	/// specific transactions or disconnect after N submissions.
	struct MockWallet {
		calls: Mutex<Vec<String>>,
		chain_id: AtomicU64,
		connected: AtomicBool,
		fail_switch: bool,
		/// Targets whose transactions fail.
		failing_targets: Vec<Address>,
		/// Disconnect after this many successful submissions, when set.
		disconnect_after: Option<u64>,
		sent: AtomicU64,
		events: broadcast::Sender<WalletEvent>,
	}

	impl MockWallet {
		fn new() -> Self {
			let (events, _) = broadcast::channel(16);
			Self {
				calls: Mutex::new(Vec::new()),
				chain_id: AtomicU64::new(1),
				connected: AtomicBool::new(true),
				fail_switch: false,
				failing_targets: Vec::new(),
				disconnect_after: None,
				sent: AtomicU64::new(0),
				events,
			}
		}

		fn calls(&self) -> Vec<String> {
			self.calls.lock().unwrap().clone()
		}
	}

	#[async_trait::async_trait]
	impl WalletSession for MockWallet {
		fn is_connected(&self) -> bool {
			self.connected.load(Ordering::SeqCst)
		}

		fn current_account(&self) -> Option<Address> {
			Some(Address::repeat_byte(0xee))
		}

		fn current_chain_id(&self) -> Option<u64> {
			Some(self.chain_id.load(Ordering::SeqCst))
		}

		async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
			self.calls.lock().unwrap().push(format!("switch:{chain_id}"));
			if self.fail_switch {
				return Err(WalletError::ChainSwitch {
					chain_id,
					reason: "user rejected".to_string(),
				});
			}
			self.chain_id.store(chain_id, Ordering::SeqCst);
			Ok(())
		}

		async fn send_transaction(&self, tx: &WalletTransaction) -> Result<String, WalletError> {
			self.calls.lock().unwrap().push(format!("send:{}", tx.to));
			if self.failing_targets.contains(&tx.to) {
				return Err(WalletError::Transaction("reverted".to_string()));
			}
			let sent = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
			if self.disconnect_after == Some(sent) {
				self.connected.store(false, Ordering::SeqCst);
				let _ = self.events.send(WalletEvent::Disconnected);
			}
			Ok(format!("0x{:064x}", sent))
		}

		async fn sign_message(&self, _message: &[u8]) -> Result<String, WalletError> {
			Ok("0xsigned".to_string())
		}

		fn subscribe(&self) -> WalletSubscription {
			WalletSubscription::new(self.events.subscribe())
		}
	}

	fn prebuilt_step(step_type: StepType, token_byte: u8, needs_approval: bool) -> PlanStep {
		let token = Address::repeat_byte(token_byte);
		PlanStep {
			step_type,
			token_in: token,
			token_out: None,
			amount: U256::from(100u64),
			minimum_out: None,
			needs_approval,
			use_permit: false,
			spender: None,
			quote: None,
			prebuilt: Some(SwapTransaction {
				to: token,
				data: Bytes::from(vec![0x01]),
				value: U256::ZERO,
			}),
		}
	}

	fn executor() -> PlanExecutor {
		PlanExecutor::new(
			Arc::new(QuoteService::new(vec![], &QuoteConfig::default())),
			QuoteConfig::default(),
		)
	}

	#[tokio::test]
	async fn test_steps_execute_sequentially_after_chain_switch() {
		let wallet = MockWallet::new();
		let plan = ChainPlan {
			chain_id: 137,
			steps: vec![
				prebuilt_step(StepType::Approval, 0x01, false),
				prebuilt_step(StepType::Swap, 0x01, true),
				prebuilt_step(StepType::Approval, 0x02, false),
				prebuilt_step(StepType::Swap, 0x02, true),
			],
		};

		let receipts = executor().execute(&plan, &wallet).await;

		assert_eq!(receipts.len(), 4);
		assert!(receipts.iter().all(|r| r.success));
		let expected: Vec<String> = std::iter::once("switch:137".to_string())
			.chain(plan.steps.iter().map(|s| format!("send:{}", s.token_in)))
			.collect();
		assert_eq!(wallet.calls(), expected);
	}

	#[tokio::test]
	async fn test_chain_switch_failure_yields_single_receipt() {
		let mut wallet = MockWallet::new();
		wallet.fail_switch = true;
		let plan = ChainPlan {
			chain_id: 137,
			steps: vec![
				prebuilt_step(StepType::Approval, 0x01, false),
				prebuilt_step(StepType::Swap, 0x01, true),
			],
		};

		let receipts = executor().execute(&plan, &wallet).await;

		assert_eq!(receipts.len(), 1);
		assert!(!receipts[0].success);
		assert!(receipts[0].error.as_ref().unwrap().contains("Chain switch"));
		// Nothing was submitted.
		assert_eq!(wallet.calls(), vec!["switch:137".to_string()]);
	}

	#[tokio::test]
	async fn test_failed_approval_skips_dependent_swap_only() {
		let mut wallet = MockWallet::new();
		wallet.failing_targets = vec![Address::repeat_byte(0x01)];
		let plan = ChainPlan {
			chain_id: 137,
			steps: vec![
				prebuilt_step(StepType::Approval, 0x01, false),
				prebuilt_step(StepType::Swap, 0x01, true),
				prebuilt_step(StepType::Approval, 0x02, false),
				prebuilt_step(StepType::Swap, 0x02, true),
			],
		};

		let receipts = executor().execute(&plan, &wallet).await;

		assert_eq!(receipts.len(), 4);
		assert!(!receipts[0].success);
		assert!(!receipts[1].success);
		assert!(receipts[1].error.as_ref().unwrap().contains("Skipped"));
		assert!(receipts[2].success);
		assert!(receipts[3].success);
		// The skipped swap never reached the wallet.
		let sends = wallet
			.calls()
			.iter()
			.filter(|c| c.starts_with("send"))
			.count();
		assert_eq!(sends, 3);
	}

	#[tokio::test]
	async fn test_disconnect_aborts_remaining_steps() {
		let mut wallet = MockWallet::new();
		wallet.disconnect_after = Some(1);
		let plan = ChainPlan {
			chain_id: 137,
			steps: vec![
				prebuilt_step(StepType::Transfer, 0x01, false),
				prebuilt_step(StepType::Transfer, 0x02, false),
				prebuilt_step(StepType::Transfer, 0x03, false),
			],
		};

		let receipts = executor().execute(&plan, &wallet).await;

		assert_eq!(receipts.len(), 3);
		assert!(receipts[0].success);
		assert!(!receipts[1].success);
		assert!(!receipts[2].success);
		assert!(receipts[1].error.as_ref().unwrap().contains("disconnected"));
	}

	/// Backend whose build_swap returns a fixed router transaction.
	struct RouterBackend;

	#[async_trait::async_trait]
	impl AggregatorInterface for RouterBackend {
		fn name(&self) -> &'static str {
			"1inch"
		}

		async fn quote(&self, _request: &QuoteRequest) -> Result<Quote, AggregatorError> {
			Err(AggregatorError::Network("not under test".to_string()))
		}

		async fn build_swap(
			&self,
			_request: &SwapRequest,
		) -> Result<SwapTransaction, AggregatorError> {
			Ok(SwapTransaction {
				to: Address::repeat_byte(0xdd),
				data: Bytes::from(vec![0xab]),
				value: U256::ZERO,
			})
		}
	}

	#[tokio::test]
	async fn test_swap_without_calldata_is_rebuilt_at_execution() {
		let wallet = MockWallet::new();
		let token = Address::repeat_byte(0x01);
		let quote = Quote {
			aggregator: "1inch".to_string(),
			chain_id: 137,
			token_in: token,
			token_out: Address::repeat_byte(0x66),
			amount_in: U256::from(100u64),
			amount_out: U256::from(200u64),
			estimated_gas: None,
			raw_transaction: None,
		};
		let plan = ChainPlan {
			chain_id: 137,
			steps: vec![PlanStep {
				step_type: StepType::Swap,
				token_in: token,
				token_out: Some(Address::repeat_byte(0x66)),
				amount: U256::from(100u64),
				minimum_out: Some(U256::from(198u64)),
				needs_approval: false,
				use_permit: false,
				spender: Some(Address::repeat_byte(0x55)),
				quote: Some(quote),
				prebuilt: None,
			}],
		};

		let config = QuoteConfig::default();
		let executor = PlanExecutor::new(
			Arc::new(QuoteService::new(vec![Arc::new(RouterBackend)], &config)),
			config,
		);
		let receipts = executor.execute(&plan, &wallet).await;

		assert_eq!(receipts.len(), 1);
		assert!(receipts[0].success);
		// The rebuilt calldata targeted the router, not the token.
		assert_eq!(
			wallet.calls().last().unwrap(),
			&format!("send:{}", Address::repeat_byte(0xdd))
		);
	}
}
