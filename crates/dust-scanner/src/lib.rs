//! Balance scanning module for the dust sweeper.
//!
//! This module reads native and ERC-20 balances across the configured
//! chains. Each chain gets its own Alloy provider built from the chain
//! registry at startup; a batch scan fans out one scan per chain and
//! tolerates per-chain failure, so a single unreachable RPC endpoint never
//! aborts scanning the rest.

use alloy_primitives::{Address, U256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::TransactionRequest;
use alloy_transport_http::Http;
use dust_config::ScannerConfig;
use dust_types::{
	current_timestamp_millis, format_units, BalanceSnapshot, ChainRegistryConfig, TokenBalance,
	TokenConfig,
};
use futures::future::join_all;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub mod discovery;
pub mod erc20;

/// Errors that can occur during balance scanning.
#[derive(Debug, Error)]
pub enum ScannerError {
	/// Error that occurs during network communication with an RPC endpoint.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when a chain is not in the registry.
	#[error("Chain {0} is not configured")]
	UnsupportedChain(u64),
	/// Error that occurs when a scan exceeds its deadline.
	#[error("Scan of chain {0} timed out")]
	Timeout(u64),
	/// Error that occurs when chain configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Service that reads balances across the configured chains.
///
/// Owns one HTTP provider per chain; the providers are created once from
/// the registry and shared by every scan.
pub struct ScannerService {
	providers: HashMap<u64, RootProvider<Http<reqwest::Client>>>,
	chains: ChainRegistryConfig,
	config: ScannerConfig,
	http: reqwest::Client,
}

impl ScannerService {
	/// Creates a new ScannerService with one provider per registry chain.
	pub fn new(chains: ChainRegistryConfig, config: ScannerConfig) -> Result<Self, ScannerError> {
		let mut providers = HashMap::new();

		for (chain_id, chain) in &chains {
			let url = chain.rpc_url.parse().map_err(|e| {
				ScannerError::Configuration(format!(
					"Invalid RPC URL for chain {}: {}",
					chain_id, e
				))
			})?;
			providers.insert(*chain_id, RootProvider::new_http(url));
		}

		let http = reqwest::Client::builder()
			.timeout(Duration::from_secs(config.timeout_seconds))
			.build()
			.map_err(|e| ScannerError::Configuration(format!("HTTP client: {}", e)))?;

		Ok(Self {
			providers,
			chains,
			config,
			http,
		})
	}

	fn provider(
		&self,
		chain_id: u64,
	) -> Result<&RootProvider<Http<reqwest::Client>>, ScannerError> {
		self.providers
			.get(&chain_id)
			.ok_or(ScannerError::UnsupportedChain(chain_id))
	}

	/// Issues a read-only `eth_call` against a contract.
	pub(crate) async fn eth_call(
		&self,
		chain_id: u64,
		to: Address,
		call_data: Vec<u8>,
	) -> Result<Vec<u8>, ScannerError> {
		let provider = self.provider(chain_id)?;
		let result = provider
			.call(&TransactionRequest::default().to(to).input(call_data.into()))
			.await
			.map_err(|e| ScannerError::Network(format!("eth_call failed: {}", e)))?;
		Ok(result.to_vec())
	}

	/// Scans one chain for one address.
	///
	/// Reads the native balance, probes every curated registry token, and
	/// falls back to on-chain discovery when the registry is empty. Zero
	/// balances are dropped before the snapshot is built.
	#[tracing::instrument(skip(self), fields(chain_id = chain_id))]
	pub async fn scan(&self, chain_id: u64, owner: Address) -> Result<BalanceSnapshot, ScannerError> {
		let chain = self
			.chains
			.get(&chain_id)
			.ok_or(ScannerError::UnsupportedChain(chain_id))?;
		let provider = self.provider(chain_id)?;

		let native_wei = provider
			.get_balance(owner)
			.await
			.map_err(|e| ScannerError::Network(format!("Failed to get balance: {}", e)))?;

		let mut token_balances = Vec::new();
		for token in &chain.tokens {
			match self.read_token_balance(chain_id, token, owner).await {
				Ok(Some(balance)) => token_balances.push(balance),
				Ok(None) => {}
				Err(e) => {
					// One bad token contract must not sink the scan.
					tracing::debug!(
						token = %token.address,
						error = %e,
						"Skipping unreadable token"
					);
				}
			}
		}

		// Broader discovery when the curated registry has nothing to probe.
		if chain.tokens.is_empty() && self.config.discovery_enabled {
			match discovery::discover_token_balances(
				&self.http,
				self,
				chain_id,
				chain,
				owner,
				self.config.multicall_chunk_size,
			)
			.await
			{
				Ok(discovered) => token_balances.extend(discovered),
				Err(e) => {
					tracing::warn!(chain_id, error = %e, "Token discovery failed");
				}
			}
		}

		Ok(BalanceSnapshot {
			chain_id,
			native_balance: format_units(native_wei, 18),
			native_balance_wei: native_wei,
			token_balances,
			scanned_at_millis: current_timestamp_millis(),
		})
	}

	/// Scans many chains concurrently with partial-failure semantics.
	///
	/// Each chain's outcome is independent: unreachable or timed-out chains
	/// are logged and contribute no snapshot. Callers should key results by
	/// `chain_id`; result order is not guaranteed.
	pub async fn scan_many(&self, chain_ids: &[u64], owner: Address) -> Vec<BalanceSnapshot> {
		let timeout = Duration::from_secs(self.config.timeout_seconds);

		let scans = chain_ids.iter().map(|&chain_id| async move {
			match tokio::time::timeout(timeout, self.scan(chain_id, owner)).await {
				Ok(Ok(snapshot)) => Some(snapshot),
				Ok(Err(e)) => {
					tracing::warn!(chain_id, error = %e, "Chain scan failed");
					None
				}
				Err(_) => {
					tracing::warn!(chain_id, "Chain scan timed out");
					None
				}
			}
		});

		join_all(scans).await.into_iter().flatten().collect()
	}

	async fn read_token_balance(
		&self,
		chain_id: u64,
		token: &TokenConfig,
		owner: Address,
	) -> Result<Option<TokenBalance>, ScannerError> {
		let return_data = self
			.eth_call(chain_id, token.address, erc20::balance_of_calldata(owner))
			.await?;
		let amount = erc20::decode_uint(&return_data)
			.ok_or_else(|| ScannerError::Network("Invalid balanceOf response".to_string()))?;

		if amount.is_zero() {
			return Ok(None);
		}

		let decimals = match token.decimals {
			Some(d) => d,
			None => self.token_decimals(chain_id, token.address).await?,
		};

		Ok(Some(TokenBalance {
			token_address: token.address,
			symbol: token.symbol.clone(),
			decimals,
			amount_base_units: amount,
			balance_decimal: format_units(amount, decimals),
			usd_price: None,
			usd_value: None,
		}))
	}

	/// Reads a token's decimals live from the contract.
	pub async fn token_decimals(&self, chain_id: u64, token: Address) -> Result<u8, ScannerError> {
		let return_data = self
			.eth_call(chain_id, token, erc20::decimals_calldata())
			.await?;
		erc20::decode_u8(&return_data)
			.ok_or_else(|| ScannerError::Network("Invalid decimals response".to_string()))
	}

	/// Reads the current ERC-20 allowance of a spender for an owner.
	pub async fn allowance(
		&self,
		chain_id: u64,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, ScannerError> {
		let return_data = self
			.eth_call(chain_id, token, erc20::allowance_calldata(owner, spender))
			.await?;
		erc20::decode_uint(&return_data)
			.ok_or_else(|| ScannerError::Network("Invalid allowance response".to_string()))
	}

	/// Probes whether a token supports EIP-2612 permits by calling
	/// `nonces(owner)`. Any failure means no permit support.
	pub async fn supports_permit(&self, chain_id: u64, token: Address) -> bool {
		let result = self
			.eth_call(chain_id, token, erc20::nonces_calldata(Address::ZERO))
			.await;
		matches!(result, Ok(data) if data.len() >= 32)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use dust_types::ChainConfig;
	use tokio::io::{AsyncReadExt, AsyncWriteExt};
	use tokio::net::TcpListener;

	/// Minimal JSON-RPC server answering every eth_getBalance with a fixed
	/// wei amount. Good enough to exercise the scan path end to end.
	async fn spawn_rpc_stub(balance_hex: &'static str) -> String {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();

		tokio::spawn(async move {
			loop {
				let (mut socket, _) = match listener.accept().await {
					Ok(conn) => conn,
					Err(_) => return,
				};
				tokio::spawn(async move {
					let mut buf = Vec::new();
					loop {
						// Read one HTTP request (headers + body).
						let mut chunk = [0u8; 4096];
						let header_end = loop {
							if let Some(pos) = buf
								.windows(4)
								.position(|w| w == b"\r\n\r\n")
							{
								break pos + 4;
							}
							match socket.read(&mut chunk).await {
								Ok(0) | Err(_) => return,
								Ok(n) => buf.extend_from_slice(&chunk[..n]),
							}
						};

						let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
						let content_length = headers
							.lines()
							.find_map(|l| {
								l.to_lowercase()
									.strip_prefix("content-length:")
									.map(|v| v.trim().parse::<usize>().unwrap_or(0))
							})
							.unwrap_or(0);

						while buf.len() < header_end + content_length {
							match socket.read(&mut chunk).await {
								Ok(0) | Err(_) => return,
								Ok(n) => buf.extend_from_slice(&chunk[..n]),
							}
						}

						let body: serde_json::Value =
							match serde_json::from_slice(&buf[header_end..header_end + content_length]) {
								Ok(v) => v,
								Err(_) => return,
							};
						buf.drain(..header_end + content_length);

						let id = body.get("id").cloned().unwrap_or(serde_json::json!(1));
						let response = serde_json::json!({
							"jsonrpc": "2.0",
							"id": id,
							"result": balance_hex,
						})
						.to_string();

						let reply = format!(
							"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
							response.len(),
							response
						);
						if socket.write_all(reply.as_bytes()).await.is_err() {
							return;
						}
					}
				});
			}
		});

		format!("http://{}", addr)
	}

	fn chain(rpc_url: String) -> ChainConfig {
		ChainConfig {
			name: "Test".to_string(),
			native_symbol: "ETH".to_string(),
			rpc_url,
			explorer_url: "https://example.org".to_string(),
			coingecko_platform: None,
			native_price_id: None,
			wrapped_native: None,
			multicall3: None,
			dust_claim_address: None,
			token_list_urls: Vec::new(),
			tokens: Vec::new(),
		}
	}

	fn owner() -> Address {
		"0x5FbDB2315678afecb367f032d93F642f64180aa3"
			.parse()
			.unwrap()
	}

	fn fast_config() -> ScannerConfig {
		ScannerConfig {
			timeout_seconds: 3,
			discovery_enabled: false,
			multicall_chunk_size: 200,
		}
	}

	#[tokio::test]
	async fn test_scan_many_isolates_unreachable_chains() {
		// 0.0005 ETH in wei.
		let good_url = spawn_rpc_stub("0x1c6bf52634000").await;

		let mut chains = ChainRegistryConfig::new();
		chains.insert(137, chain(good_url));
		// Nothing listens here; the connection is refused immediately.
		chains.insert(1, chain("http://127.0.0.1:9".to_string()));

		let scanner = ScannerService::new(chains, fast_config()).unwrap();
		let snapshots = scanner.scan_many(&[1, 137], owner()).await;

		assert_eq!(snapshots.len(), 1);
		assert_eq!(snapshots[0].chain_id, 137);
		assert_eq!(snapshots[0].native_balance, "0.0005");
		assert_eq!(
			snapshots[0].native_balance_wei,
			dust_types::parse_units("0.0005", 18).unwrap()
		);
	}

	#[tokio::test]
	async fn test_scan_many_never_errors_when_everything_is_down() {
		let mut chains = ChainRegistryConfig::new();
		chains.insert(1, chain("http://127.0.0.1:9".to_string()));
		chains.insert(10, chain("http://127.0.0.1:9".to_string()));

		let scanner = ScannerService::new(chains, fast_config()).unwrap();
		let snapshots = scanner.scan_many(&[1, 10], owner()).await;
		assert!(snapshots.is_empty());
	}

	#[tokio::test]
	async fn test_scan_rejects_unconfigured_chain() {
		let scanner = ScannerService::new(ChainRegistryConfig::new(), fast_config()).unwrap();
		let err = scanner.scan(42, owner()).await.unwrap_err();
		assert!(matches!(err, ScannerError::UnsupportedChain(42)));
	}
}
