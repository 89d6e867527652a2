//! Liquidator chain interaction layer.
//!
//! This crate provides:
//! - Contract bindings for Comet, the snapshot query helper and the executor
//! - Pinned-block snapshot reads and borrower discovery from `Withdraw` logs
//! - Transaction signing with a cached nonce
//! - Gas pricing (Legacy + EIP-1559)
//! - Private relay bundle submission
//!
//! Everything above the RPC boundary depends on the [`LendingReader`] trait,
//! not on alloy providers directly.

mod contracts;
mod error;
pub mod gas;
mod provider;
pub mod relay;
mod signer;
mod snapshot;

pub use contracts::{IComet, IOnChainLiquidator, ISnapshotQuery, LiquidatorContract};
pub use error::ChainError;
pub use gas::{GasParams, GasPricing};
pub use provider::{MarketAddresses, ProviderManager, DEFAULT_MAX_LOG_RANGE};
pub use relay::{BundleRequest, RelayClient, RelayNetwork};
pub use signer::{parse_private_key, ConfirmedTransaction, NonceManager, SignedTransaction, TransactionSender};
pub use snapshot::{BorrowerIndex, LendingReader, RawAccount, RawAssetInfo, RawReserve, RawSnapshot};
