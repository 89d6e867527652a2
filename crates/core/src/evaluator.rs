//! Opportunity evaluation.
//!
//! Liquidation strictly dominates arbitrage: when any account in the scan is
//! liquidatable the evaluator returns a liquidation and does not look at the
//! protocol's reserves at all.
//!
//! ## Liquidation selection
//!
//! Among liquidatable accounts the one with the largest discount captured on
//! absorption wins: `Σ value × (1 − liquidation_factor)` over its collateral
//! in registered assets with a non-zero balance. Ties keep snapshot order.
//!
//! ## Arbitrage selection
//!
//! Each reserve entry is sized to the purchase budget and priced at the gap
//! between the oracle and the store-front quote. Entries whose net profit
//! (after the configured cost estimate) is below the minimum are skipped.
//! The largest net profit wins; ties keep snapshot order.

use alloy::primitives::{Address, U256};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::action::Action;
use crate::assets::{Asset, AssetLookup};
use crate::config::ArbitrageConfig;
use crate::snapshot::{BorrowerSnapshot, PurchasableCollateral, ScanResult, SeizableCollateral};
use crate::u256_math::{mul_div, pow10, token_value_usd8, usd8_to_f64};

/// Profit estimate for one arbitrage candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitEstimate {
    pub asset: Address,
    /// Quantity after budget capping
    pub quantity: U256,
    /// USD cost at the quoted price
    pub cost_usd: f64,
    /// USD gain at the market price, before execution costs
    pub gross_profit_usd: f64,
    /// `gross_profit_usd` minus the estimated execution cost
    pub net_profit_usd: f64,
}

/// Stateless decision maker. Same inputs, same action.
#[derive(Debug, Clone)]
pub struct Evaluator {
    min_profit_usd: f64,
    estimated_cost_usd: f64,
}

impl Evaluator {
    pub fn new(config: &ArbitrageConfig) -> Self {
        Self {
            min_profit_usd: config.min_profit_usd,
            estimated_cost_usd: config.estimated_cost_usd,
        }
    }

    /// Decide what to do with `scan`, given the current collateral set.
    pub fn decide(&self, scan: &ScanResult, assets: &[Asset]) -> Action {
        if scan.has_liquidatable() {
            return self.select_liquidation(scan, assets);
        }

        match self.select_arbitrage(scan, assets) {
            Some(best) => {
                debug!(
                    asset = %best.asset,
                    quantity = %best.quantity,
                    cost_usd = best.cost_usd,
                    net_profit_usd = best.net_profit_usd,
                    "Arbitrage selected"
                );
                Action::Arbitrage {
                    asset: best.asset,
                    quantity: best.quantity,
                }
            }
            None => Action::NoAction,
        }
    }

    /// Liquidation for the best liquidatable account. Falls back to
    /// `NoAction` only when the scan has no liquidatable account.
    pub fn select_liquidation(&self, scan: &ScanResult, assets: &[Asset]) -> Action {
        let mut best: Option<(&BorrowerSnapshot, U256)> = None;
        for borrower in scan.liquidatable() {
            let discount = Self::absorption_discount(borrower, assets);
            trace!(account = %borrower.account, discount = %discount, "Liquidation candidate");
            match best {
                Some((_, top)) if discount <= top => {}
                _ => best = Some((borrower, discount)),
            }
        }

        let Some((borrower, discount)) = best else {
            return Action::NoAction;
        };

        let seized_assets: SmallVec<[SeizableCollateral; 4]> = borrower
            .seizable
            .iter()
            .filter(|c| !c.balance.is_zero() && assets.find(c.asset).is_some())
            .copied()
            .collect();

        debug!(
            account = %borrower.account,
            discount_usd = usd8_to_f64(discount),
            seized = seized_assets.len(),
            "Liquidation selected"
        );

        Action::Liquidate {
            account: borrower.account,
            seized_assets,
        }
    }

    /// `Σ value × (1 − liquidation_factor)` in 8-decimal USD.
    fn absorption_discount(borrower: &BorrowerSnapshot, assets: &[Asset]) -> U256 {
        borrower
            .seizable
            .iter()
            .filter(|c| !c.balance.is_zero())
            .filter_map(|c| assets.find(c.asset).map(|a| a.discount(c.value)))
            .fold(U256::ZERO, |acc, d| acc.saturating_add(d))
    }

    /// Most profitable reserve purchase, if any clears the minimum.
    pub fn select_arbitrage(&self, scan: &ScanResult, assets: &[Asset]) -> Option<ProfitEstimate> {
        let mut best: Option<ProfitEstimate> = None;
        for entry in &scan.purchasable {
            let Some(estimate) = self.estimate(entry, scan.purchase_budget, assets) else {
                continue;
            };
            if estimate.net_profit_usd < self.min_profit_usd {
                trace!(
                    asset = %entry.asset,
                    net_profit_usd = estimate.net_profit_usd,
                    "Arbitrage below minimum profit"
                );
                continue;
            }
            match best {
                Some(top) if estimate.net_profit_usd <= top.net_profit_usd => {}
                _ => best = Some(estimate),
            }
        }
        best
    }

    /// Size and price one reserve entry. `None` when it cannot be bought at
    /// a discount: unknown asset, nothing available, no budget, or a quote
    /// at or above market.
    pub fn estimate(
        &self,
        entry: &PurchasableCollateral,
        budget: U256,
        assets: &[Asset],
    ) -> Option<ProfitEstimate> {
        let asset = assets.find(entry.asset)?;
        if entry.quantity.is_zero()
            || entry.quoted_price.is_zero()
            || entry.quoted_price >= entry.market_price
        {
            return None;
        }

        let affordable = mul_div(budget, pow10(asset.decimals), entry.quoted_price);
        let quantity = entry.quantity.min(affordable);
        if quantity.is_zero() {
            return None;
        }

        let spread = entry.market_price - entry.quoted_price;
        let gross = token_value_usd8(quantity, spread, asset.decimals);
        let cost = token_value_usd8(quantity, entry.quoted_price, asset.decimals);
        let gross_profit_usd = usd8_to_f64(gross);

        Some(ProfitEstimate {
            asset: entry.asset,
            quantity,
            cost_usd: usd8_to_f64(cost),
            gross_profit_usd,
            net_profit_usd: gross_profit_usd - self.estimated_cost_usd,
        })
    }
}
