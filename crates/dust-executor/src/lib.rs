//! Plan execution module for the dust sweeper.
//!
//! Defines the `WalletSession` abstraction the executor drives (anything
//! that can switch chains, sign, and submit) and the `PlanExecutor` that
//! walks a chain plan step by step, recording a receipt per step.

use alloy_primitives::Address;
use dust_types::WalletTransaction;
use thiserror::Error;
use tokio::sync::broadcast;

pub mod executor;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

pub use executor::{ExecutorError, PlanExecutor};

/// Errors reported by wallet sessions.
#[derive(Debug, Error)]
pub enum WalletError {
	/// No account is connected.
	#[error("Wallet is not connected")]
	NotConnected,
	/// The wallet refused or failed to switch chains.
	#[error("Chain switch to {chain_id} failed: {reason}")]
	ChainSwitch { chain_id: u64, reason: String },
	/// Transaction signing or submission failed.
	#[error("Transaction failed: {0}")]
	Transaction(String),
	/// Message signing failed.
	#[error("Signing failed: {0}")]
	Signing(String),
}

/// Session-level events a wallet can emit while a plan is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
	/// The active account changed.
	AccountsChanged(Vec<Address>),
	/// The active chain changed.
	ChainChanged(u64),
	/// The session ended.
	Disconnected,
}

/// Receiver handle for wallet events. Dropping the handle unsubscribes.
pub struct WalletSubscription {
	receiver: broadcast::Receiver<WalletEvent>,
}

impl WalletSubscription {
	pub fn new(receiver: broadcast::Receiver<WalletEvent>) -> Self {
		Self { receiver }
	}

	/// Waits for the next event. Returns `None` once the sender side is
	/// gone.
	pub async fn recv(&mut self) -> Option<WalletEvent> {
		loop {
			match self.receiver.recv().await {
				Ok(event) => return Some(event),
				// A lagged receiver skips to the oldest retained event.
				Err(broadcast::error::RecvError::Lagged(_)) => continue,
				Err(broadcast::error::RecvError::Closed) => return None,
			}
		}
	}

	/// Drains any event already queued without waiting.
	pub fn try_recv(&mut self) -> Option<WalletEvent> {
		loop {
			match self.receiver.try_recv() {
				Ok(event) => return Some(event),
				Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
				Err(_) => return None,
			}
		}
	}
}

/// A connected wallet the executor can drive.
///
/// Implementations wrap whatever actually holds the keys: a local signer
/// for CLI use, or a remote session bridged over a wallet protocol.
#[async_trait::async_trait]
pub trait WalletSession: Send + Sync {
	/// Whether the session currently has a usable account.
	fn is_connected(&self) -> bool;

	/// The active account, when connected.
	fn current_account(&self) -> Option<Address>;

	/// The chain the session is currently on, when connected.
	fn current_chain_id(&self) -> Option<u64>;

	/// Moves the session to the given chain.
	async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

	/// Signs and submits a transaction, returning its 0x-prefixed hash.
	async fn send_transaction(&self, tx: &WalletTransaction) -> Result<String, WalletError>;

	/// Signs an arbitrary message with the active account.
	async fn sign_message(&self, message: &[u8]) -> Result<String, WalletError>;

	/// Subscribes to session events.
	fn subscribe(&self) -> WalletSubscription;
}
