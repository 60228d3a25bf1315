//! Local key-based wallet session.
//!
//! Backs the CLI: a single private key signs on every configured chain
//! through per-chain Alloy providers. Chain switching is just flipping
//! which provider subsequent transactions go through.

use crate::{WalletError, WalletEvent, WalletSession, WalletSubscription};
use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport_http::Http;
use async_trait::async_trait;
use dust_types::{with_0x_prefix, ChainRegistryConfig, WalletTransaction};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Wallet session backed by a local private key.
pub struct LocalWalletSession {
	/// Alloy providers for each supported chain, with the wallet filler
	/// attached so `send_transaction` signs locally.
	providers: HashMap<u64, Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>>,
	signer: PrivateKeySigner,
	/// Active chain id; zero means no chain selected yet.
	current_chain: AtomicU64,
	connected: AtomicBool,
	events: broadcast::Sender<WalletEvent>,
}

impl LocalWalletSession {
	/// Creates a session over every chain in the registry.
	pub fn new(private_key: &str, chains: &ChainRegistryConfig) -> Result<Self, WalletError> {
		let signer: PrivateKeySigner = private_key
			.parse()
			.map_err(|_| WalletError::Signing("Invalid private key format".to_string()))?;

		let mut providers = HashMap::new();
		for (chain_id, chain) in chains {
			let url = chain.rpc_url.parse().map_err(|e| {
				WalletError::Transaction(format!("Invalid RPC URL for chain {}: {}", chain_id, e))
			})?;

			let chain_signer = signer.clone().with_chain_id(Some(*chain_id));
			let wallet = EthereumWallet::from(chain_signer);
			let provider = ProviderBuilder::new()
				.with_recommended_fillers()
				.wallet(wallet)
				.on_http(url);

			providers.insert(
				*chain_id,
				Arc::new(provider) as Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
			);
		}

		let (events, _) = broadcast::channel(16);
		Ok(Self {
			providers,
			signer,
			current_chain: AtomicU64::new(0),
			connected: AtomicBool::new(true),
			events,
		})
	}

	/// Ends the session; subscribers see a `Disconnected` event.
	pub fn disconnect(&self) {
		self.connected.store(false, Ordering::SeqCst);
		let _ = self.events.send(WalletEvent::Disconnected);
	}

	fn provider(
		&self,
		chain_id: u64,
	) -> Result<&Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>, WalletError> {
		self.providers.get(&chain_id).ok_or_else(|| {
			WalletError::Transaction(format!("No provider configured for chain {}", chain_id))
		})
	}
}

#[async_trait]
impl WalletSession for LocalWalletSession {
	fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}

	fn current_account(&self) -> Option<Address> {
		if self.is_connected() {
			Some(self.signer.address())
		} else {
			None
		}
	}

	fn current_chain_id(&self) -> Option<u64> {
		match self.current_chain.load(Ordering::SeqCst) {
			0 => None,
			chain_id => Some(chain_id),
		}
	}

	async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
		if !self.providers.contains_key(&chain_id) {
			return Err(WalletError::ChainSwitch {
				chain_id,
				reason: "chain not configured".to_string(),
			});
		}
		self.current_chain.store(chain_id, Ordering::SeqCst);
		let _ = self.events.send(WalletEvent::ChainChanged(chain_id));
		Ok(())
	}

	async fn send_transaction(&self, tx: &WalletTransaction) -> Result<String, WalletError> {
		if !self.is_connected() {
			return Err(WalletError::NotConnected);
		}
		let provider = self.provider(tx.chain_id)?;

		let request = TransactionRequest::default()
			.to(tx.to)
			.input(tx.data.clone().into())
			.value(tx.value);

		let pending_tx = provider
			.send_transaction(request)
			.await
			.map_err(|e| WalletError::Transaction(format!("Failed to send transaction: {}", e)))?;

		let tx_hash = *pending_tx.tx_hash();
		let hash_str = with_0x_prefix(&hex::encode(tx_hash.0));
		tracing::info!(tx_hash = %hash_str, chain_id = tx.chain_id, "Submitted transaction");

		Ok(hash_str)
	}

	async fn sign_message(&self, message: &[u8]) -> Result<String, WalletError> {
		let signature = self
			.signer
			.sign_message(message)
			.await
			.map_err(|e| WalletError::Signing(e.to_string()))?;
		Ok(with_0x_prefix(&hex::encode(signature.as_bytes())))
	}

	fn subscribe(&self) -> WalletSubscription {
		WalletSubscription::new(self.events.subscribe())
	}
}
