//! Command-line entry point for the dust sweeper.
//!
//! Two commands drive the facade: `scan` reports dust across the configured
//! chains, and `plan` builds the per-chain claim plans, optionally executing
//! them with a locally configured key.

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use dust_config::Config;
use dust_core::DustSweeper;
use dust_executor::implementations::local::LocalWalletSession;
use dust_plan::PlanMode;
use dust_types::{ChainPlan, DustClassification};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Scan the configured chains and report dust balances
	Scan {
		/// Wallet address to scan
		#[arg(short, long)]
		owner: Address,

		/// Restrict the scan to these chain ids
		#[arg(long, value_delimiter = ',')]
		chains: Vec<u64>,
	},
	/// Build claim plans for the dust found (dry-run unless --execute)
	Plan {
		/// Wallet address to scan and plan for
		#[arg(short, long)]
		owner: Address,

		/// Restrict the scan to these chain ids
		#[arg(long, value_delimiter = ',')]
		chains: Vec<u64>,

		/// Transfer dust to this recipient instead of swapping it
		#[arg(long)]
		recipient: Option<Address>,

		/// Execute the plans with the configured private key
		#[arg(long)]
		execute: bool,
	},
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};
	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));
	fmt().with_env_filter(env_filter).with_target(true).init();

	let config = Config::from_file(
		args.config
			.to_str()
			.ok_or_else(|| anyhow::anyhow!("Invalid config path"))?,
	)?;
	tracing::info!(chains = config.chains.len(), "Loaded configuration");

	let sweeper = DustSweeper::from_config(config)?;

	match args.command {
		Command::Scan { owner, chains } => scan(&sweeper, owner, chains).await,
		Command::Plan {
			owner,
			chains,
			recipient,
			execute,
		} => plan(&sweeper, owner, chains, recipient, execute).await,
	}
}

fn chain_ids(sweeper: &DustSweeper, requested: Vec<u64>) -> Vec<u64> {
	if requested.is_empty() {
		let mut ids: Vec<u64> = sweeper.config().chains.keys().copied().collect();
		ids.sort_unstable();
		ids
	} else {
		requested
	}
}

async fn scan(sweeper: &DustSweeper, owner: Address, chains: Vec<u64>) -> anyhow::Result<()> {
	let chains = chain_ids(sweeper, chains);
	let snapshots = sweeper.scan_chains(&chains, owner).await;
	let thresholds = sweeper.config().thresholds.clone();

	for snapshot in &snapshots {
		let classification = sweeper.classify(snapshot, &thresholds);
		let chain_name = sweeper
			.config()
			.chains
			.get(&snapshot.chain_id)
			.map(|c| c.name.as_str())
			.unwrap_or("unknown");
		println!(
			"chain {} ({}): native {}{}",
			snapshot.chain_id,
			chain_name,
			snapshot.native_balance,
			if classification.is_native_dust {
				" [dust]"
			} else {
				""
			}
		);
		for token in &classification.actionable_tokens {
			match token.usd_value {
				Some(value) => println!("  {} {} (${:.2})", token.balance_decimal, token.symbol, value),
				None => println!("  {} {} (unpriced)", token.balance_decimal, token.symbol),
			}
		}
	}

	let total = sweeper.total_usd_value(&snapshots).await;
	println!("total value across {} chains: ${:.2}", snapshots.len(), total);
	Ok(())
}

async fn plan(
	sweeper: &DustSweeper,
	owner: Address,
	chains: Vec<u64>,
	recipient: Option<Address>,
	execute: bool,
) -> anyhow::Result<()> {
	let chains = chain_ids(sweeper, chains);
	let snapshots = sweeper.scan_chains(&chains, owner).await;
	let thresholds = sweeper.config().thresholds.clone();
	let classifications: Vec<DustClassification> = snapshots
		.iter()
		.map(|s| sweeper.classify(s, &thresholds))
		.collect();

	let mode = match recipient {
		Some(recipient) => PlanMode::Transfer { recipient },
		None => PlanMode::SwapConsolidate { target_token: None },
	};
	let plans = sweeper.build_claim_plan(owner, &classifications, &mode).await;

	for plan in &plans {
		print_plan(plan);
	}
	if plans.is_empty() {
		println!("nothing to claim");
		return Ok(());
	}

	if !execute {
		println!("dry run; pass --execute to submit");
		return Ok(());
	}

	let private_key = sweeper
		.config()
		.executor
		.private_key
		.clone()
		.ok_or_else(|| anyhow::anyhow!("--execute requires executor.private_key in the config"))?;
	let wallet = LocalWalletSession::new(&private_key, &sweeper.config().chains)?;

	for plan in &plans {
		let receipts = sweeper.execute_plan(plan, &wallet).await;
		for receipt in receipts {
			match (&receipt.tx_hash, &receipt.error) {
				(Some(hash), _) => println!("chain {} {}: {}", plan.chain_id, receipt.step_type, hash),
				(None, Some(error)) => {
					println!("chain {} {}: failed ({})", plan.chain_id, receipt.step_type, error)
				}
				(None, None) => {}
			}
		}
	}
	Ok(())
}

fn print_plan(plan: &ChainPlan) {
	println!(
		"chain {}: {} steps ({} approvals)",
		plan.chain_id,
		plan.steps.len(),
		plan.approvals_needed()
	);
	for step in &plan.steps {
		let mut line = format!("  {} {}", step.step_type, step.token_in);
		if let Some(minimum_out) = step.minimum_out {
			line.push_str(&format!(", min out {}", minimum_out));
		}
		if step.use_permit {
			line.push_str(" (permit)");
		}
		println!("{}", line);
	}
}
