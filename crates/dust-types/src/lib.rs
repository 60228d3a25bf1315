//! Common types module for the dust sweeper.
//!
//! This module defines the core data types and structures shared by all
//! sweeper components: chain and token configuration, balance snapshots,
//! dust classification, quotes, claim plans, and execution receipts.

/// Balance snapshot types produced by the scanner.
pub mod balance;
/// Chain and token registry configuration types.
pub mod chains;
/// Dust threshold and classification types.
pub mod classify;
/// Claim plan and execution receipt types.
pub mod plan;
/// DEX aggregator quote types.
pub mod quote;
/// Utility functions for formatting and conversions.
pub mod utils;
/// Wallet-facing transaction request types.
pub mod wallet;

// Re-export all types for convenient access
pub use balance::*;
pub use chains::{deserialize_chains, ChainConfig, ChainRegistryConfig, TokenConfig};
pub use classify::*;
pub use plan::*;
pub use quote::*;
pub use utils::{
	current_timestamp_millis, format_units, parse_units, with_0x_prefix, without_0x_prefix,
};
pub use wallet::*;
