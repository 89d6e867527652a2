//! Asset registry for the Comet market.
//!
//! The collateral set is enumerated from chain and swapped as a whole. A
//! failed refresh keeps the previous set.

use alloy::primitives::{Address, U256};
use liquidator_chain::RawAssetInfo;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::ScanError;
use crate::reader::StateReader;
use crate::u256_math::{decimals_from_scale, discount_by_factor};

/// Largest valid liquidation factor (1.0 at 1e18 scale).
const MAX_LIQUIDATION_FACTOR: u64 = 1_000_000_000_000_000_000;

/// A supported collateral asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asset {
    /// Token contract address
    pub address: Address,
    /// Token decimals
    pub decimals: u8,
    /// Price feed used by the protocol
    pub price_feed: Address,
    /// Fraction of collateral value credited on absorption, 1e18-scaled
    pub liquidation_factor: u64,
}

impl Asset {
    /// Validate and convert one enumerated asset.
    pub fn from_raw(info: &RawAssetInfo) -> Result<Self, ScanError> {
        let decimals = decimals_from_scale(info.scale).ok_or_else(|| {
            ScanError::Malformed(format!("asset {}: scale {} is not a power of ten", info.asset, info.scale))
        })?;
        if info.liquidation_factor > MAX_LIQUIDATION_FACTOR {
            return Err(ScanError::Malformed(format!(
                "asset {}: liquidation factor {} exceeds 1e18",
                info.asset, info.liquidation_factor
            )));
        }
        Ok(Self {
            address: info.asset,
            decimals,
            price_feed: info.price_feed,
            liquidation_factor: info.liquidation_factor,
        })
    }

    /// Value of `value` the liquidator captures as discount on absorption.
    #[inline]
    pub fn discount(&self, value: U256) -> U256 {
        discount_by_factor(value, self.liquidation_factor)
    }
}

/// Lookup by token address. Sets are small, so a linear scan.
pub trait AssetLookup {
    fn find(&self, address: Address) -> Option<&Asset>;
}

impl AssetLookup for [Asset] {
    fn find(&self, address: Address) -> Option<&Asset> {
        self.iter().find(|a| a.address == address)
    }
}

/// Current collateral set.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    current: Option<Arc<[Asset]>>,
}

impl AssetRegistry {
    /// Empty, never-populated registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with `assets`.
    pub fn with_assets(assets: Vec<Asset>) -> Self {
        Self {
            current: Some(assets.into()),
        }
    }

    /// Whether any refresh has succeeded yet.
    pub fn is_populated(&self) -> bool {
        self.current.is_some()
    }

    /// Snapshot of the current set; empty before the first refresh.
    pub fn current(&self) -> Arc<[Asset]> {
        self.current.clone().unwrap_or_else(|| Arc::from(Vec::new()))
    }

    pub(crate) fn len(&self) -> usize {
        self.current.as_ref().map_or(0, |a| a.len())
    }

    /// Re-enumerate the collateral set. On any failure the previous set
    /// stays in effect and the error is returned for logging.
    pub async fn refresh(&mut self, reader: &StateReader) -> Result<Arc<[Asset]>, ScanError> {
        let infos = reader.asset_infos().await?;
        let assets = infos
            .iter()
            .map(Asset::from_raw)
            .collect::<Result<Vec<_>, _>>()?;

        for asset in &assets {
            debug!(
                asset = %asset.address,
                decimals = asset.decimals,
                price_feed = %asset.price_feed,
                liquidation_factor = asset.liquidation_factor,
                "Collateral asset"
            );
        }

        let previous = self.len();
        let assets: Arc<[Asset]> = assets.into();
        if previous > 0 && previous != assets.len() {
            warn!(previous, current = assets.len(), "Collateral set changed size");
        }
        info!(count = assets.len(), "Asset registry refreshed");

        self.current = Some(assets.clone());
        Ok(assets)
    }
}
