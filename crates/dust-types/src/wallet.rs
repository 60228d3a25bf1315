//! Wallet-facing transaction request types.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A transaction handed to the wallet session for signing and submission.
///
/// Only the fields a wallet needs are carried; gas and nonce are filled in
/// by the wallet's provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
	/// The chain the transaction targets.
	pub chain_id: u64,
	/// Recipient contract or account.
	pub to: Address,
	/// ABI-encoded call data.
	pub data: Bytes,
	/// Native value to attach.
	pub value: U256,
}
