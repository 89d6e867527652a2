//! Transaction signing and broadcasting for the funds-holding identity.
//! Uses Alloy providers for type-safe RPC interactions.
//!
//! Transactions are always signed locally so the same raw bytes can go to
//! the public mempool or into a private relay bundle.

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{parse_url, ChainError};
use crate::gas::{GasParams, GasPricing};

/// Cached nonce manager.
/// Avoids an RPC round trip per transaction by tracking the nonce locally.
#[derive(Debug)]
pub struct NonceManager {
    current: AtomicU64,
}

impl NonceManager {
    pub fn new(initial_nonce: u64) -> Self {
        Self {
            current: AtomicU64::new(initial_nonce),
        }
    }

    /// Get next nonce and increment counter.
    #[inline]
    pub fn next(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst)
    }

    #[inline]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Reset to the chain's view (after a revert or an unused signature).
    pub fn reset(&self, chain_nonce: u64) {
        self.current.store(chain_nonce, Ordering::SeqCst);
    }
}

/// A locally signed transaction, ready for broadcast or bundling.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    /// EIP-2718 encoded bytes
    pub raw: Bytes,
    pub hash: B256,
    pub nonce: u64,
}

/// Receipt fields the bot cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedTransaction {
    pub tx_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
    pub success: bool,
}

/// Signs with the funds-holding key and talks to the public RPC.
pub struct TransactionSender {
    rpc_url: reqwest::Url,
    wallet: EthereumWallet,
    /// Signer address
    pub address: Address,
    chain_id: u64,
    nonce_manager: NonceManager,
    gas_limit: u64,
    gas: GasPricing,
}

impl TransactionSender {
    /// Create a sender from a hex private key (with or without `0x`).
    /// Fetches the starting nonce from chain.
    pub async fn new(
        private_key: &str,
        rpc_url: &str,
        chain_id: u64,
        gas: GasPricing,
        gas_limit: u64,
    ) -> Result<Self, ChainError> {
        let signer = parse_private_key(private_key)?;
        let address = signer.address();
        let rpc_url = parse_url(rpc_url)?;

        let provider = ProviderBuilder::new().on_http(rpc_url.clone());
        let initial_nonce = provider.get_transaction_count(address).await?;

        info!(
            address = %address,
            chain_id,
            initial_nonce,
            gas_strategy = gas.name(),
            gas_limit,
            "Transaction sender initialized"
        );

        Ok(Self {
            rpc_url,
            wallet: EthereumWallet::from(signer),
            address,
            chain_id,
            nonce_manager: NonceManager::new(initial_nonce),
            gas_limit,
            gas,
        })
    }

    fn provider(&self) -> impl Provider {
        ProviderBuilder::new().on_http(self.rpc_url.clone())
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn current_nonce(&self) -> u64 {
        self.nonce_manager.current()
    }

    /// Build and sign a call to `to`. Consumes one nonce, which is handed
    /// back to the chain's view if signing fails.
    pub async fn sign(&self, to: Address, calldata: Bytes) -> Result<SignedTransaction, ChainError> {
        let start = Instant::now();
        let gas_params = self.gas.fetch(&self.provider()).await?;
        let nonce = self.nonce_manager.next();

        match self.build_signed(to, calldata, nonce, gas_params).await {
            Ok(signed) => {
                debug!(
                    tx_hash = %signed.hash,
                    nonce,
                    gas_price_gwei = gas_params.effective_gas_price() / 1_000_000_000,
                    sign_us = start.elapsed().as_micros(),
                    "Transaction signed"
                );
                Ok(signed)
            }
            Err(e) => {
                self.sync_nonce().await;
                Err(e)
            }
        }
    }

    async fn build_signed(
        &self,
        to: Address,
        calldata: Bytes,
        nonce: u64,
        gas_params: GasParams,
    ) -> Result<SignedTransaction, ChainError> {
        let tx = TransactionRequest::default()
            .with_from(self.address)
            .with_to(to)
            .with_input(calldata)
            .with_value(U256::ZERO)
            .with_nonce(nonce)
            .with_gas_limit(self.gas_limit)
            .with_chain_id(self.chain_id);
        let tx = gas_params.apply(tx);

        let envelope = tx
            .build(&self.wallet)
            .await
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        let hash = *envelope.tx_hash();

        Ok(SignedTransaction {
            raw: envelope.encoded_2718().into(),
            hash,
            nonce,
        })
    }

    /// Send to the public mempool and wait for the receipt.
    ///
    /// Any failure resyncs the nonce, whether or not the transaction left.
    pub async fn broadcast(&self, signed: &SignedTransaction) -> Result<ConfirmedTransaction, ChainError> {
        let result = self.send_and_confirm(signed).await;
        if let Err(e) = &result {
            warn!(error = %e, nonce = signed.nonce, "Broadcast failed, syncing nonce");
            self.sync_nonce().await;
        }
        result
    }

    async fn send_and_confirm(&self, signed: &SignedTransaction) -> Result<ConfirmedTransaction, ChainError> {
        let start = Instant::now();
        let pending = self.provider().send_raw_transaction(&signed.raw).await?;
        info!(tx_hash = %pending.tx_hash(), nonce = signed.nonce, "Transaction broadcast");

        let receipt = pending.get_receipt().await?;
        let confirmed = ConfirmedTransaction {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.unwrap_or_default(),
            gas_used: receipt.gas_used,
            success: receipt.status(),
        };

        if !confirmed.success {
            return Err(ChainError::Reverted(confirmed.tx_hash));
        }

        info!(
            tx_hash = %confirmed.tx_hash,
            block = confirmed.block_number,
            gas_used = confirmed.gas_used,
            confirm_ms = start.elapsed().as_millis(),
            "Transaction confirmed"
        );
        Ok(confirmed)
    }

    /// Receipt for `hash`, if mined.
    pub async fn receipt(&self, hash: B256) -> Result<Option<ConfirmedTransaction>, ChainError> {
        let receipt = self.provider().get_transaction_receipt(hash).await?;
        Ok(receipt.map(|r| ConfirmedTransaction {
            tx_hash: r.transaction_hash,
            block_number: r.block_number.unwrap_or_default(),
            gas_used: r.gas_used,
            success: r.status(),
        }))
    }

    pub async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.provider().get_block_number().await?)
    }

    /// Sync nonce from chain. Failures are logged, not returned.
    pub async fn sync_nonce(&self) {
        match self.provider().get_transaction_count(self.address).await {
            Ok(chain_nonce) => {
                self.nonce_manager.reset(chain_nonce);
                debug!(nonce = chain_nonce, "Nonce synced from chain");
            }
            Err(e) => {
                warn!(error = %e, "Failed to sync nonce from chain");
            }
        }
    }
}

impl std::fmt::Debug for TransactionSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionSender")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("gas_strategy", &self.gas.name())
            .finish_non_exhaustive()
    }
}

/// Parse a hex private key, with or without the `0x` prefix.
pub fn parse_private_key(private_key: &str) -> Result<PrivateKeySigner, ChainError> {
    private_key
        .trim()
        .trim_start_matches("0x")
        .parse::<PrivateKeySigner>()
        .map_err(|e| ChainError::Key(e.to_string()))
}
