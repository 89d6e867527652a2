//! Chain state reader.
//!
//! Wraps a [`LendingReader`] with a per-call timeout and turns the raw
//! batched response into a validated [`ScanResult`]. Never retries.

use alloy::primitives::Address;
use liquidator_chain::{LendingReader, RawAssetInfo, RawSnapshot};
use smallvec::SmallVec;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use crate::error::ScanError;
use crate::snapshot::{BorrowerSnapshot, PurchasableCollateral, ScanResult, SeizableCollateral};

/// Reads pinned-block snapshots.
#[derive(Clone)]
pub struct StateReader {
    source: Arc<dyn LendingReader>,
    call_timeout: Duration,
}

impl StateReader {
    pub fn new(source: Arc<dyn LendingReader>, call_timeout: Duration) -> Self {
        Self {
            source,
            call_timeout,
        }
    }

    /// Current chain head.
    pub async fn block_number(&self) -> Result<u64, ScanError> {
        self.bounded("block_number", self.source.block_number()).await
    }

    /// Read and validate the market state at `block_number`.
    #[instrument(skip(self))]
    pub async fn scan(&self, block_number: u64) -> Result<ScanResult, ScanError> {
        let start = Instant::now();
        let raw = self
            .bounded("read_snapshot", self.source.read_snapshot(block_number))
            .await?;
        let scan = validate_snapshot(raw, block_number)?;

        debug!(
            accounts = scan.underwater.len(),
            liquidatable = scan.liquidatable().count(),
            purchasable = scan.purchasable.len(),
            scan_ms = start.elapsed().as_millis(),
            "Snapshot read"
        );
        Ok(scan)
    }

    /// Enumerate the market's collateral assets.
    pub async fn asset_infos(&self) -> Result<Vec<RawAssetInfo>, ScanError> {
        self.bounded("asset_infos", self.source.asset_infos()).await
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, ScanError>
    where
        F: Future<Output = Result<T, liquidator_chain::ChainError>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ScanError::Timeout {
                operation,
                after: self.call_timeout,
            }),
        }
    }
}

impl std::fmt::Debug for StateReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateReader")
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

/// Check a raw batched response and convert it.
///
/// Rejects a response for another block, parallel arrays of different
/// lengths and duplicate accounts.
pub fn validate_snapshot(raw: RawSnapshot, requested_block: u64) -> Result<ScanResult, ScanError> {
    if raw.block_number != requested_block {
        return Err(ScanError::Malformed(format!(
            "requested block {requested_block}, got {}",
            raw.block_number
        )));
    }

    let mut seen: HashSet<Address> = HashSet::with_capacity(raw.accounts.len());
    let mut underwater = Vec::with_capacity(raw.accounts.len());
    for account in raw.accounts {
        if !seen.insert(account.account) {
            return Err(ScanError::Malformed(format!(
                "account {} listed twice",
                account.account
            )));
        }

        let n = account.collateral_assets.len();
        if account.collateral_balances.len() != n || account.collateral_values.len() != n {
            return Err(ScanError::Malformed(format!(
                "account {}: {} assets, {} balances, {} values",
                account.account,
                n,
                account.collateral_balances.len(),
                account.collateral_values.len()
            )));
        }

        let seizable: SmallVec<[SeizableCollateral; 4]> = account
            .collateral_assets
            .into_iter()
            .zip(account.collateral_balances)
            .zip(account.collateral_values)
            .map(|((asset, balance), value)| SeizableCollateral {
                asset,
                balance,
                value,
            })
            .collect();

        underwater.push(BorrowerSnapshot {
            account: account.account,
            is_liquidatable: account.is_liquidatable,
            seizable,
        });
    }

    let purchasable = raw
        .reserves
        .into_iter()
        .map(|r| PurchasableCollateral {
            asset: r.asset,
            quantity: r.reserves,
            quoted_price: r.quoted_price,
            market_price: r.market_price,
        })
        .collect();

    Ok(ScanResult {
        block_number: requested_block,
        underwater,
        purchasable,
        purchase_budget: raw.purchase_budget,
    })
}
