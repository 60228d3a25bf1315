//! Configuration module for the dust sweeper.
//!
//! This module provides structures and utilities for loading sweeper
//! configuration from TOML files: the chain registry, dust thresholds,
//! price feed settings, aggregator backends, and scanner/executor tuning.
//! Validation ensures all required values are properly set before any
//! service is constructed from them.

use alloy_primitives::Address;
use dust_types::{deserialize_chains, ChainRegistryConfig, DustThresholds};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the dust sweeper.
///
/// Contains all sections required to construct the scanner, price feed,
/// quote service, plan builder, and executor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Chain registry: one entry per supported chain, keyed by chain ID.
	#[serde(deserialize_with = "deserialize_chains")]
	pub chains: ChainRegistryConfig,
	/// Dust classification thresholds.
	#[serde(default)]
	pub thresholds: DustThresholds,
	/// Price feed configuration.
	#[serde(default)]
	pub price: PriceConfig,
	/// Quote aggregation configuration.
	#[serde(default)]
	pub quotes: QuoteConfig,
	/// Balance scanner tuning.
	#[serde(default)]
	pub scanner: ScannerConfig,
	/// Executor configuration (local wallet session only).
	#[serde(default)]
	pub executor: ExecutorConfig,
}

/// Configuration for the price feed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PriceConfig {
	/// Which implementation to use ("coingecko" or "mock").
	#[serde(default = "default_price_implementation")]
	pub implementation: String,
	/// Optional pro API key sent as a request header.
	#[serde(default)]
	pub api_key: Option<String>,
	/// How long cached prices stay fresh, in seconds.
	#[serde(default = "default_cache_ttl_seconds")]
	pub cache_ttl_seconds: u64,
	/// Per-request HTTP timeout, in seconds.
	#[serde(default = "default_price_timeout_seconds")]
	pub request_timeout_seconds: u64,
}

fn default_price_implementation() -> String {
	"coingecko".to_string()
}

fn default_cache_ttl_seconds() -> u64 {
	60
}

fn default_price_timeout_seconds() -> u64 {
	15
}

impl Default for PriceConfig {
	fn default() -> Self {
		Self {
			implementation: default_price_implementation(),
			api_key: None,
			cache_ttl_seconds: default_cache_ttl_seconds(),
			request_timeout_seconds: default_price_timeout_seconds(),
		}
	}
}

/// Configuration for quote aggregation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuoteConfig {
	/// Backend names in fixed priority order; the order breaks best-quote
	/// ties deterministically.
	#[serde(default = "default_backends")]
	pub backends: Vec<String>,
	/// Slippage buffer applied to quoted outputs, in basis points.
	#[serde(default = "default_slippage_bps")]
	pub slippage_bps: u32,
	/// Per-backend quote timeout, in seconds.
	#[serde(default = "default_quote_timeout_seconds")]
	pub timeout_seconds: u64,
	/// Router spender addresses per backend per chain
	/// (backend name -> chain id as string -> spender address).
	#[serde(default)]
	pub spenders: HashMap<String, HashMap<String, Address>>,
}

fn default_backends() -> Vec<String> {
	vec![
		"1inch".to_string(),
		"paraswap".to_string(),
		"0x".to_string(),
	]
}

fn default_slippage_bps() -> u32 {
	100
}

fn default_quote_timeout_seconds() -> u64 {
	10
}

impl Default for QuoteConfig {
	fn default() -> Self {
		Self {
			backends: default_backends(),
			slippage_bps: default_slippage_bps(),
			timeout_seconds: default_quote_timeout_seconds(),
			spenders: HashMap::new(),
		}
	}
}

impl QuoteConfig {
	/// Looks up the router spender for a backend on a chain.
	pub fn spender_for(&self, backend: &str, chain_id: u64) -> Option<Address> {
		self.spenders
			.get(backend)
			.and_then(|by_chain| by_chain.get(&chain_id.to_string()))
			.copied()
	}
}

/// Configuration for the balance scanner.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
	/// Per-chain scan timeout, in seconds.
	#[serde(default = "default_scan_timeout_seconds")]
	pub timeout_seconds: u64,
	/// Whether to run token-list/multicall discovery when the curated
	/// registry comes up empty.
	#[serde(default = "default_discovery_enabled")]
	pub discovery_enabled: bool,
	/// Multicall batch size for discovery reads.
	#[serde(default = "default_multicall_chunk_size")]
	pub multicall_chunk_size: usize,
}

fn default_scan_timeout_seconds() -> u64 {
	12
}

fn default_discovery_enabled() -> bool {
	true
}

fn default_multicall_chunk_size() -> usize {
	200
}

impl Default for ScannerConfig {
	fn default() -> Self {
		Self {
			timeout_seconds: default_scan_timeout_seconds(),
			discovery_enabled: default_discovery_enabled(),
			multicall_chunk_size: default_multicall_chunk_size(),
		}
	}
}

/// Configuration for the executor's local wallet session.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExecutorConfig {
	/// Hex-encoded private key for the signer-backed session. Only used by
	/// the CLI; interactive callers supply their own wallet session.
	#[serde(default)]
	pub private_key: Option<String>,
}

impl Config {
	/// Loads configuration from a TOML file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path)?;
		content.parse()
	}

	/// Validates the configuration for internal consistency.
	///
	/// # Errors
	///
	/// Returns `ConfigError::Validation` when a chain entry is unusable or
	/// a numeric bound is out of range.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.chains.is_empty() {
			return Err(ConfigError::Validation(
				"At least one chain must be configured".to_string(),
			));
		}

		for (chain_id, chain) in &self.chains {
			if chain.rpc_url.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Chain {} has no RPC URL",
					chain_id
				)));
			}
		}

		if self.quotes.slippage_bps >= 10_000 {
			return Err(ConfigError::Validation(format!(
				"slippage_bps must be below 10000, got {}",
				self.quotes.slippage_bps
			)));
		}

		if self.quotes.backends.is_empty() {
			return Err(ConfigError::Validation(
				"At least one quote backend must be configured".to_string(),
			));
		}

		if self.thresholds.token_usd_min > self.thresholds.token_usd_max {
			return Err(ConfigError::Validation(format!(
				"token_usd_min ({}) exceeds token_usd_max ({})",
				self.thresholds.token_usd_min, self.thresholds.token_usd_max
			)));
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let config: Config = toml::from_str(s)?;
		config.validate()?;
		Ok(config)
	}
}
