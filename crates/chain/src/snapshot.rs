//! Raw chain-state types and the read capability the bot core depends on.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::ChainError;

/// One candidate account as returned by the batched query.
///
/// `collateral_assets`, `collateral_balances` and `collateral_values` are
/// parallel arrays; the core validates their lengths.
#[derive(Debug, Clone, Default)]
pub struct RawAccount {
    pub account: Address,
    pub is_liquidatable: bool,
    pub collateral_assets: Vec<Address>,
    pub collateral_balances: Vec<U256>,
    /// 8-decimal USD values at the protocol oracle price
    pub collateral_values: Vec<U256>,
}

/// Collateral held in protocol reserves.
#[derive(Debug, Clone, Default)]
pub struct RawReserve {
    pub asset: Address,
    pub reserves: U256,
    /// Discounted store-front price (8 decimals)
    pub quoted_price: U256,
    /// Oracle price (8 decimals)
    pub market_price: U256,
}

/// Result of one batched read, pinned to `block_number`.
#[derive(Debug, Clone, Default)]
pub struct RawSnapshot {
    pub block_number: u64,
    pub accounts: Vec<RawAccount>,
    pub reserves: Vec<RawReserve>,
    /// Liquidator's spendable base balance in 8-decimal USD
    pub purchase_budget: U256,
}

/// Collateral asset configuration as enumerated from the market.
#[derive(Debug, Clone)]
pub struct RawAssetInfo {
    pub asset: Address,
    pub price_feed: Address,
    /// `10^decimals`
    pub scale: u64,
    /// 1e18-scaled
    pub liquidation_factor: u64,
}

/// Read capability over the lending market.
///
/// Implementations perform exactly the network work described per method and
/// never retry.
#[async_trait]
pub trait LendingReader: Send + Sync {
    /// Current chain head.
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// Underwater accounts and purchasable collateral, all read at `block`.
    async fn read_snapshot(&self, block: u64) -> Result<RawSnapshot, ChainError>;

    /// Full enumeration of the market's collateral assets.
    async fn asset_infos(&self) -> Result<Vec<RawAssetInfo>, ChainError>;
}

/// Append-only set of accounts that have ever borrowed from the market,
/// built from `Withdraw` logs.
#[derive(Debug, Clone)]
pub struct BorrowerIndex {
    accounts: Vec<Address>,
    seen: HashSet<Address>,
    /// First block whose logs have not been indexed yet
    next_block: u64,
}

impl BorrowerIndex {
    pub fn new(start_block: u64) -> Self {
        Self {
            accounts: Vec::new(),
            seen: HashSet::new(),
            next_block: start_block,
        }
    }

    /// Add an account. Returns `false` if it was already known.
    pub fn insert(&mut self, account: Address) -> bool {
        if account.is_zero() || !self.seen.insert(account) {
            return false;
        }
        self.accounts.push(account);
        true
    }

    /// Accounts in discovery order.
    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    pub fn next_block(&self) -> u64 {
        self.next_block
    }

    /// Mark every block up to and including `block` as indexed.
    pub fn advance_past(&mut self, block: u64) {
        self.next_block = self.next_block.max(block + 1);
    }

    /// Inclusive block ranges still to scan up to `to_block`, each at most
    /// `max_range` blocks wide.
    pub fn pending_ranges(&self, to_block: u64, max_range: u64) -> Vec<(u64, u64)> {
        let max_range = max_range.max(1);
        let mut ranges = Vec::new();
        let mut from = self.next_block;
        while from <= to_block {
            let to = (from + max_range - 1).min(to_block);
            ranges.push((from, to));
            from = to + 1;
        }
        ranges
    }

    pub(crate) fn len(&self) -> usize {
        self.accounts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_insert_keeps_discovery_order_and_dedups() {
        let a = address!("00000000000000000000000000000000000000aa");
        let b = address!("00000000000000000000000000000000000000bb");
        let mut index = BorrowerIndex::new(0);

        assert!(index.insert(b));
        assert!(index.insert(a));
        assert!(!index.insert(b));
        assert!(!index.insert(Address::ZERO));
        assert_eq!(index.accounts(), &[b, a]);
    }

    #[test]
    fn test_pending_ranges_are_bounded() {
        let index = BorrowerIndex::new(100);
        assert_eq!(
            index.pending_ranges(125, 10),
            vec![(100, 109), (110, 119), (120, 125)]
        );
        assert!(index.pending_ranges(99, 10).is_empty());
    }

    #[test]
    fn test_advance_never_moves_backwards() {
        let mut index = BorrowerIndex::new(50);
        index.advance_past(80);
        assert_eq!(index.next_block(), 81);
        index.advance_past(60);
        assert_eq!(index.next_block(), 81);
        assert_eq!(index.pending_ranges(81, 1000), vec![(81, 81)]);
    }
}
