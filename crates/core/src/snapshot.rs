//! Per-block market state as consumed by the evaluator.

use alloy::primitives::{Address, U256};
use smallvec::SmallVec;

/// One collateral position that would be seized on absorption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeizableCollateral {
    pub asset: Address,
    /// Token amount
    pub balance: U256,
    /// 8-decimal USD value at the protocol price
    pub value: U256,
}

/// An account returned by the snapshot query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowerSnapshot {
    pub account: Address,
    pub is_liquidatable: bool,
    /// Most accounts hold few collateral assets; avoid heap allocation
    pub seizable: SmallVec<[SeizableCollateral; 4]>,
}

/// Collateral the protocol holds in reserves and sells at a discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchasableCollateral {
    pub asset: Address,
    /// Token amount available
    pub quantity: U256,
    /// Store-front price, 8 decimals
    pub quoted_price: U256,
    /// Oracle price, 8 decimals
    pub market_price: U256,
}

/// Everything one decision is made from, read at `block_number`.
///
/// Superseded, never merged, by the next scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub block_number: u64,
    pub underwater: Vec<BorrowerSnapshot>,
    pub purchasable: Vec<PurchasableCollateral>,
    /// Liquidator's spendable base balance, 8-decimal USD
    pub purchase_budget: U256,
}

impl ScanResult {
    /// Accounts that can be absorbed now, in snapshot order.
    pub fn liquidatable(&self) -> impl Iterator<Item = &BorrowerSnapshot> {
        self.underwater.iter().filter(|b| b.is_liquidatable)
    }

    pub fn has_liquidatable(&self) -> bool {
        self.underwater.iter().any(|b| b.is_liquidatable)
    }
}
