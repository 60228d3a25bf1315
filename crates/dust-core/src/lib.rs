//! Core orchestration for the dust sweeper.
//!
//! `DustSweeper` wires the scanner, price feed, quote aggregation, planner,
//! and executor together behind one facade: scan a set of chains, classify
//! what came back, turn the actionable part into per-chain plans, and run
//! them against a wallet session. Every service is injected; nothing here
//! touches global state.

use alloy_primitives::Address;
use dust_config::Config;
use dust_executor::{PlanExecutor, WalletSession};
use dust_plan::{PlanBuilder, PlanMode, TokenStateReader};
use dust_price::implementations::coingecko::CoinGeckoPriceFeed;
use dust_price::implementations::mock::MockPriceFeed;
use dust_price::{PriceFeedError, PriceFeedInterface, PriceFeedService};
use dust_quote::implementations::oneinch::OneInchAggregator;
use dust_quote::implementations::paraswap::ParaSwapAggregator;
use dust_quote::implementations::zerox::ZeroXAggregator;
use dust_quote::{AggregatorInterface, QuoteService};
use dust_scanner::{ScannerError, ScannerService};
use dust_types::{
	BalanceSnapshot, ChainPlan, DustClassification, DustThresholds, StepReceipt,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that prevent the sweeper from being assembled.
#[derive(Debug, Error)]
pub enum SweeperError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error(transparent)]
	Scanner(#[from] ScannerError),
	#[error(transparent)]
	Price(#[from] PriceFeedError),
}

/// Facade over the full scan -> price -> classify -> plan -> execute
/// pipeline.
pub struct DustSweeper {
	config: Config,
	scanner: Arc<ScannerService>,
	prices: Arc<PriceFeedService>,
	builder: PlanBuilder,
	executor: PlanExecutor,
}

impl DustSweeper {
	/// Assembles every service from configuration.
	pub fn from_config(config: Config) -> Result<Self, SweeperError> {
		let scanner = Arc::new(ScannerService::new(
			config.chains.clone(),
			config.scanner.clone(),
		)?);

		let feed: Arc<dyn PriceFeedInterface> = match config.price.implementation.as_str() {
			"coingecko" => Arc::new(CoinGeckoPriceFeed::new(&config.price, &config.chains)?),
			"mock" => Arc::new(MockPriceFeed::new()),
			other => {
				return Err(SweeperError::Config(format!(
					"Unknown price feed implementation: {}",
					other
				)))
			}
		};
		let prices = Arc::new(PriceFeedService::new(feed, &config.price));

		let client = reqwest::Client::new();
		let mut backends: Vec<Arc<dyn AggregatorInterface>> = Vec::new();
		for name in &config.quotes.backends {
			match name.as_str() {
				"1inch" => backends.push(Arc::new(OneInchAggregator::new(client.clone()))),
				"paraswap" => backends.push(Arc::new(ParaSwapAggregator::new(client.clone()))),
				"0x" => backends.push(Arc::new(ZeroXAggregator::new(client.clone()))),
				other => {
					tracing::warn!(backend = other, "Unknown quote backend, skipping");
				}
			}
		}
		let quotes = Arc::new(QuoteService::new(backends, &config.quotes));

		let builder = PlanBuilder::new(
			config.chains.clone(),
			Arc::clone(&quotes),
			Arc::clone(&scanner) as Arc<dyn TokenStateReader>,
			config.quotes.clone(),
		);
		let executor = PlanExecutor::new(quotes, config.quotes.clone());

		Ok(Self {
			config,
			scanner,
			prices,
			builder,
			executor,
		})
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Scans the given chains for the owner and enriches token balances
	/// with USD prices. Pricing failures leave `usd_*` fields unset;
	/// scanning never waits on a price.
	pub async fn scan_chains(&self, chain_ids: &[u64], owner: Address) -> Vec<BalanceSnapshot> {
		let mut snapshots = self.scanner.scan_many(chain_ids, owner).await;

		for snapshot in &mut snapshots {
			let addresses: Vec<Address> = snapshot
				.token_balances
				.iter()
				.map(|b| b.token_address)
				.collect();
			let prices = self.prices.token_prices_usd(snapshot.chain_id, &addresses).await;
			enrich(snapshot, &prices);
		}

		snapshots
	}

	/// Classifies a snapshot against the given thresholds.
	pub fn classify(
		&self,
		snapshot: &BalanceSnapshot,
		thresholds: &DustThresholds,
	) -> DustClassification {
		dust_plan::classify(snapshot, thresholds)
	}

	/// Builds one plan per chain with actionable balances. A chain whose
	/// plan cannot be built is logged and skipped, never fatal.
	pub async fn build_claim_plan(
		&self,
		owner: Address,
		classifications: &[DustClassification],
		mode: &PlanMode,
	) -> Vec<ChainPlan> {
		let mut plans = Vec::new();

		for classification in classifications {
			if classification.actionable_tokens.is_empty() {
				continue;
			}
			match self
				.builder
				.build_plan(
					classification.chain_id,
					owner,
					&classification.actionable_tokens,
					mode,
				)
				.await
			{
				Ok(plan) if !plan.steps.is_empty() => plans.push(plan),
				Ok(_) => {
					tracing::debug!(
						chain_id = classification.chain_id,
						"Nothing plannable on chain"
					);
				}
				Err(e) => {
					tracing::warn!(
						chain_id = classification.chain_id,
						error = %e,
						"Plan build failed, skipping chain"
					);
				}
			}
		}

		plans
	}

	/// Executes a plan against the wallet, returning per-step receipts.
	pub async fn execute_plan(
		&self,
		plan: &ChainPlan,
		wallet: &dyn WalletSession,
	) -> Vec<StepReceipt> {
		self.executor.execute(plan, wallet).await
	}

	/// Total USD value held across the snapshots, native coins included.
	pub async fn total_usd_value(&self, snapshots: &[BalanceSnapshot]) -> f64 {
		let mut total = 0.0;
		for snapshot in snapshots {
			let native_units: f64 = snapshot.native_balance.parse().unwrap_or(0.0);
			if native_units > 0.0 {
				total += native_units * self.prices.native_price_usd(snapshot.chain_id).await;
			}
			total += snapshot
				.token_balances
				.iter()
				.filter_map(|b| b.usd_value)
				.sum::<f64>();
		}
		total
	}
}

/// Applies fetched prices to a snapshot in place. Tokens the feed did not
/// price keep `usd_price`/`usd_value` unset.
fn enrich(snapshot: &mut BalanceSnapshot, prices: &HashMap<Address, f64>) {
	for balance in &mut snapshot.token_balances {
		if let Some(&price) = prices.get(&balance.token_address) {
			if price > 0.0 {
				let units: f64 = balance.balance_decimal.parse().unwrap_or(0.0);
				balance.usd_price = Some(price);
				balance.usd_value = Some(price * units);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::U256;
	use dust_types::{current_timestamp_millis, TokenBalance};

	fn balance(byte: u8, decimal: &str) -> TokenBalance {
		TokenBalance {
			token_address: Address::repeat_byte(byte),
			symbol: format!("T{byte:02x}"),
			decimals: 18,
			amount_base_units: U256::from(1u64),
			balance_decimal: decimal.to_string(),
			usd_price: None,
			usd_value: None,
		}
	}

	fn snapshot(tokens: Vec<TokenBalance>) -> BalanceSnapshot {
		BalanceSnapshot {
			chain_id: 137,
			native_balance: "0.0".to_string(),
			native_balance_wei: U256::ZERO,
			token_balances: tokens,
			scanned_at_millis: current_timestamp_millis(),
		}
	}

	#[test]
	fn test_enrich_prices_only_known_tokens() {
		let mut snapshot = snapshot(vec![balance(0x01, "2.5"), balance(0x02, "10.0")]);
		let prices = HashMap::from([(Address::repeat_byte(0x01), 0.1)]);

		enrich(&mut snapshot, &prices);

		let priced = &snapshot.token_balances[0];
		assert_eq!(priced.usd_price, Some(0.1));
		assert_eq!(priced.usd_value, Some(0.25));
		let unpriced = &snapshot.token_balances[1];
		assert_eq!(unpriced.usd_price, None);
		assert_eq!(unpriced.usd_value, None);
	}

	#[test]
	fn test_enrich_ignores_zero_prices() {
		let mut snapshot = snapshot(vec![balance(0x01, "2.5")]);
		let prices = HashMap::from([(Address::repeat_byte(0x01), 0.0)]);

		enrich(&mut snapshot, &prices);

		assert_eq!(snapshot.token_balances[0].usd_value, None);
	}
}
