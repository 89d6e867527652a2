//! Provider management for the Comet market.
//! Uses Alloy providers for type-safe RPC interactions.

use alloy::eips::BlockId;
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::Filter;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::contracts::{IComet, ISnapshotQuery};
use crate::error::{parse_url, ChainError};
use crate::snapshot::{BorrowerIndex, LendingReader, RawAccount, RawAssetInfo, RawReserve, RawSnapshot};

/// Default width of a single `eth_getLogs` request.
pub const DEFAULT_MAX_LOG_RANGE: u64 = 10_000;

/// Addresses the reader needs for one network/deployment pair.
#[derive(Debug, Clone, Copy)]
pub struct MarketAddresses {
    /// Comet proxy
    pub comet: Address,
    /// Deployed snapshot query helper
    pub snapshot_query: Address,
    /// Liquidator executor (its balance is the purchase budget)
    pub liquidator: Address,
}

/// Provider manager for the market's read path.
pub struct ProviderManager {
    /// HTTP RPC endpoint
    rpc_url: reqwest::Url,
    /// Contract addresses
    addresses: MarketAddresses,
    /// Width of each log query
    max_log_range: u64,
    /// Borrower candidates discovered so far
    borrowers: Mutex<BorrowerIndex>,
}

impl ProviderManager {
    /// Create a provider manager. Performs no network call.
    pub fn new(rpc_url: &str, addresses: MarketAddresses, start_block: u64) -> Result<Self, ChainError> {
        info!(
            rpc = rpc_url,
            comet = %addresses.comet,
            snapshot_query = %addresses.snapshot_query,
            start_block,
            "Initializing provider manager"
        );

        Ok(Self {
            rpc_url: parse_url(rpc_url)?,
            addresses,
            max_log_range: DEFAULT_MAX_LOG_RANGE,
            borrowers: Mutex::new(BorrowerIndex::new(start_block)),
        })
    }

    /// Override the log query width.
    pub fn with_max_log_range(mut self, max_log_range: u64) -> Self {
        self.max_log_range = max_log_range.max(1);
        self
    }

    /// Number of borrower candidates currently tracked.
    pub fn borrower_count(&self) -> usize {
        self.borrowers.lock().len()
    }

    fn provider(&self) -> impl Provider {
        ProviderBuilder::new().on_http(self.rpc_url.clone())
    }

    /// Pull `Withdraw` logs up to `block` into the borrower index and return
    /// the full candidate list.
    async fn sync_borrowers(&self, block: u64) -> Result<Vec<Address>, ChainError> {
        let ranges = self.borrowers.lock().pending_ranges(block, self.max_log_range);
        let provider = self.provider();

        for (from, to) in ranges {
            let filter = Filter::new()
                .address(self.addresses.comet)
                .event_signature(IComet::Withdraw::SIGNATURE_HASH)
                .from_block(from)
                .to_block(to);
            let logs = provider.get_logs(&filter).await?;

            let mut index = self.borrowers.lock();
            let mut added = 0usize;
            for log in &logs {
                let withdraw = log
                    .log_decode::<IComet::Withdraw>()
                    .map_err(|e| ChainError::Malformed(format!("withdraw log: {e}")))?;
                if index.insert(withdraw.inner.data.src) {
                    added += 1;
                }
            }
            index.advance_past(to);

            debug!(from, to, logs = logs.len(), added, total = index.len(), "Indexed borrower logs");
        }

        Ok(self.borrowers.lock().accounts().to_vec())
    }
}

#[async_trait]
impl LendingReader for ProviderManager {
    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.provider().get_block_number().await?)
    }

    async fn read_snapshot(&self, block: u64) -> Result<RawSnapshot, ChainError> {
        let candidates = self.sync_borrowers(block).await?;

        let provider = self.provider();
        let query = ISnapshotQuery::new(self.addresses.snapshot_query, &provider);
        let result = query
            .query(self.addresses.comet, self.addresses.liquidator, candidates.clone())
            .block(BlockId::number(block))
            .call()
            .await?;

        debug!(
            block,
            candidates = candidates.len(),
            accounts = result.accounts.len(),
            quotes = result.quotes.len(),
            "Snapshot query returned"
        );

        Ok(RawSnapshot {
            block_number: block,
            accounts: result
                .accounts
                .into_iter()
                .map(|a| RawAccount {
                    account: a.account,
                    is_liquidatable: a.isLiquidatable,
                    collateral_assets: a.collateralAssets,
                    collateral_balances: a.collateralBalances,
                    collateral_values: a.collateralValues,
                })
                .collect(),
            reserves: result
                .quotes
                .into_iter()
                .map(|q| RawReserve {
                    asset: q.asset,
                    reserves: q.reserves,
                    quoted_price: q.quotedPrice,
                    market_price: q.marketPrice,
                })
                .collect(),
            purchase_budget: result.purchaseBudget,
        })
    }

    async fn asset_infos(&self) -> Result<Vec<RawAssetInfo>, ChainError> {
        let provider = self.provider();
        let comet = IComet::new(self.addresses.comet, &provider);

        let count = comet.numAssets().call().await?._0;
        let mut infos = Vec::with_capacity(count as usize);
        for i in 0..count {
            let info = comet.getAssetInfo(i).call().await?._0;
            infos.push(RawAssetInfo {
                asset: info.asset,
                price_feed: info.priceFeed,
                scale: info.scale,
                liquidation_factor: info.liquidationFactor,
            });
        }

        debug!(count = infos.len(), "Enumerated market assets");
        Ok(infos)
    }
}

impl std::fmt::Debug for ProviderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderManager")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("addresses", &self.addresses)
            .field("borrowers", &self.borrower_count())
            .finish()
    }
}
