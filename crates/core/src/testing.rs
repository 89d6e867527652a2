//! In-memory chain and submitter for unit tests.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use liquidator_chain::{ChainError, LendingReader, RawAccount, RawAssetInfo, RawSnapshot};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::action::{Action, Receipt, SubmissionContext, SubmissionMode, SubmissionOutcome};
use crate::error::SubmissionError;
use crate::submitter::Submitter;

/// Scripted [`LendingReader`].
///
/// Block heights are served in order; the last one repeats once the script
/// runs out. Blocks without a snapshot fail to read.
pub struct MockChain {
    blocks: Mutex<VecDeque<u64>>,
    head: Mutex<u64>,
    snapshots: Mutex<HashMap<u64, RawSnapshot>>,
    asset_infos: Mutex<Option<Vec<RawAssetInfo>>>,
    scanned: Mutex<Vec<u64>>,
    asset_calls: AtomicUsize,
    read_delay: Option<Duration>,
}

impl MockChain {
    pub fn new(blocks: &[u64]) -> Self {
        Self {
            blocks: Mutex::new(blocks.iter().copied().collect()),
            head: Mutex::new(blocks.first().copied().unwrap_or_default()),
            snapshots: Mutex::new(HashMap::new()),
            asset_infos: Mutex::new(None),
            scanned: Mutex::new(Vec::new()),
            asset_calls: AtomicUsize::new(0),
            read_delay: None,
        }
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    pub fn set_snapshot(&self, block: u64, snapshot: RawSnapshot) {
        self.snapshots.lock().insert(block, snapshot);
    }

    /// `None` makes enumeration fail.
    pub fn set_asset_infos(&self, infos: Option<Vec<RawAssetInfo>>) {
        *self.asset_infos.lock() = infos;
    }

    pub fn scanned_blocks(&self) -> Vec<u64> {
        self.scanned.lock().clone()
    }

    pub fn asset_calls(&self) -> usize {
        self.asset_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LendingReader for MockChain {
    async fn block_number(&self) -> Result<u64, ChainError> {
        let mut head = self.head.lock();
        if let Some(next) = self.blocks.lock().pop_front() {
            *head = next;
        }
        Ok(*head)
    }

    async fn read_snapshot(&self, block: u64) -> Result<RawSnapshot, ChainError> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        self.scanned.lock().push(block);
        self.snapshots
            .lock()
            .get(&block)
            .cloned()
            .ok_or_else(|| ChainError::Malformed(format!("no snapshot at block {block}")))
    }

    async fn asset_infos(&self) -> Result<Vec<RawAssetInfo>, ChainError> {
        self.asset_calls.fetch_add(1, Ordering::SeqCst);
        self.asset_infos
            .lock()
            .clone()
            .ok_or_else(|| ChainError::Malformed("asset enumeration failed".into()))
    }
}

/// Records every submission and confirms it in the block after the scan.
pub struct MockSubmitter {
    context: SubmissionContext,
    submissions: Mutex<Vec<(Action, u64)>>,
    resyncs: AtomicUsize,
    submit_delay: Option<Duration>,
}

impl MockSubmitter {
    pub fn new() -> Self {
        Self {
            context: SubmissionContext {
                signer: Address::repeat_byte(0x5e),
                relay_identity: None,
                network: "mainnet".into(),
                deployment: "usdc".into(),
            },
            submissions: Mutex::new(Vec::new()),
            resyncs: AtomicUsize::new(0),
            submit_delay: None,
        }
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    pub fn resyncs(&self) -> usize {
        self.resyncs.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<(Action, u64)> {
        self.submissions.lock().clone()
    }
}

#[async_trait]
impl Submitter for MockSubmitter {
    fn context(&self) -> &SubmissionContext {
        &self.context
    }

    async fn submit(&self, action: &Action, scanned_block: u64) -> Result<SubmissionOutcome, SubmissionError> {
        if action.is_no_action() {
            return Err(SubmissionError::NoAction);
        }
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        self.submissions.lock().push((action.clone(), scanned_block));
        Ok(SubmissionOutcome::Confirmed(Receipt {
            tx_hash: B256::repeat_byte(0x11),
            block_number: scanned_block + 1,
            gas_used: 400_000,
            mode: SubmissionMode::Direct,
        }))
    }

    async fn resync(&self) {
        self.resyncs.fetch_add(1, Ordering::SeqCst);
    }
}

/// Raw account with `(asset, balance, value)` collateral.
pub fn raw_account(account: Address, is_liquidatable: bool, collateral: &[(Address, u64, u64)]) -> RawAccount {
    RawAccount {
        account,
        is_liquidatable,
        collateral_assets: collateral.iter().map(|c| c.0).collect(),
        collateral_balances: collateral.iter().map(|c| U256::from(c.1)).collect(),
        collateral_values: collateral.iter().map(|c| U256::from(c.2)).collect(),
    }
}

pub fn raw_asset(asset: Address, decimals: u8, liquidation_factor: u64) -> RawAssetInfo {
    RawAssetInfo {
        asset,
        price_feed: Address::repeat_byte(0xfe),
        scale: 10u64.pow(decimals as u32),
        liquidation_factor,
    }
}
