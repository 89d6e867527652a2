//! Gas pricing for submitted transactions.
//!
//! Prices come from the node (`eth_gasPrice` or the EIP-1559 fee estimate)
//! and are capped; no local fee modelling is done.

use alloy::network::TransactionBuilder;
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;

use crate::error::ChainError;

const GWEI: f64 = 1e9;

/// Gas parameters fetched for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasParams {
    /// Legacy gas pricing (pre-EIP-1559).
    Legacy { gas_price: u128 },
    /// EIP-1559 gas pricing.
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
}

impl GasParams {
    /// Upper bound paid per gas unit.
    pub fn effective_gas_price(&self) -> u128 {
        match self {
            GasParams::Legacy { gas_price } => *gas_price,
            GasParams::Eip1559 { max_fee_per_gas, .. } => *max_fee_per_gas,
        }
    }

    /// Set the pricing fields on a transaction request.
    pub fn apply(&self, tx: TransactionRequest) -> TransactionRequest {
        match *self {
            GasParams::Legacy { gas_price } => tx.with_gas_price(gas_price),
            GasParams::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => tx
                .with_max_fee_per_gas(max_fee_per_gas)
                .with_max_priority_fee_per_gas(max_priority_fee_per_gas),
        }
    }
}

/// How a network prices gas, with the caps applied to node estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasPricing {
    Legacy {
        /// Cap in wei
        max_gas_price: u128,
    },
    Eip1559 {
        /// Cap on `max_fee_per_gas` in wei
        max_fee_per_gas: u128,
        /// Floor on the priority fee in wei
        min_priority_fee: u128,
    },
}

impl GasPricing {
    /// Build from network config values ("legacy" or "eip1559", gwei).
    /// Unknown models fall back to Legacy.
    pub fn from_config(model: &str, max_gas_price_gwei: f64, priority_fee_gwei: Option<f64>) -> Self {
        let cap = (max_gas_price_gwei * GWEI) as u128;
        match model.to_lowercase().as_str() {
            "eip1559" | "eip-1559" => GasPricing::Eip1559 {
                max_fee_per_gas: cap,
                min_priority_fee: (priority_fee_gwei.unwrap_or(1.0) * GWEI) as u128,
            },
            _ => GasPricing::Legacy { max_gas_price: cap },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GasPricing::Legacy { .. } => "Legacy",
            GasPricing::Eip1559 { .. } => "EIP-1559",
        }
    }

    /// Fetch current prices from the node and apply caps.
    pub async fn fetch<P: Provider>(&self, provider: &P) -> Result<GasParams, ChainError> {
        match *self {
            GasPricing::Legacy { .. } => {
                let gas_price = provider.get_gas_price().await?;
                Ok(self.cap(GasParams::Legacy { gas_price }))
            }
            GasPricing::Eip1559 { .. } => {
                let estimate = provider.estimate_eip1559_fees().await?;
                Ok(self.cap(GasParams::Eip1559 {
                    max_fee_per_gas: estimate.max_fee_per_gas,
                    max_priority_fee_per_gas: estimate.max_priority_fee_per_gas,
                }))
            }
        }
    }

    /// Clamp fetched params to the configured bounds.
    pub fn cap(&self, params: GasParams) -> GasParams {
        match (*self, params) {
            (GasPricing::Legacy { max_gas_price }, GasParams::Legacy { gas_price }) => {
                GasParams::Legacy {
                    gas_price: gas_price.min(max_gas_price),
                }
            }
            (
                GasPricing::Eip1559 {
                    max_fee_per_gas: cap,
                    min_priority_fee,
                },
                GasParams::Eip1559 {
                    max_fee_per_gas,
                    max_priority_fee_per_gas,
                },
            ) => {
                let max_fee = max_fee_per_gas.min(cap);
                let priority = max_priority_fee_per_gas.max(min_priority_fee).min(max_fee);
                GasParams::Eip1559 {
                    max_fee_per_gas: max_fee,
                    max_priority_fee_per_gas: priority,
                }
            }
            (_, other) => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        assert_eq!(
            GasPricing::from_config("Legacy", 10.0, None),
            GasPricing::Legacy {
                max_gas_price: 10_000_000_000
            }
        );
        assert_eq!(GasPricing::from_config("Eip1559", 200.0, Some(2.0)).name(), "EIP-1559");
        assert_eq!(GasPricing::from_config("unknown", 1.0, None).name(), "Legacy");
    }

    #[test]
    fn test_legacy_cap() {
        let pricing = GasPricing::Legacy { max_gas_price: 100 };
        assert_eq!(
            pricing.cap(GasParams::Legacy { gas_price: 250 }),
            GasParams::Legacy { gas_price: 100 }
        );
        assert_eq!(
            pricing.cap(GasParams::Legacy { gas_price: 40 }),
            GasParams::Legacy { gas_price: 40 }
        );
    }

    #[test]
    fn test_eip1559_cap_keeps_priority_below_max_fee() {
        let pricing = GasPricing::Eip1559 {
            max_fee_per_gas: 50,
            min_priority_fee: 10,
        };
        let capped = pricing.cap(GasParams::Eip1559 {
            max_fee_per_gas: 80,
            max_priority_fee_per_gas: 2,
        });
        assert_eq!(
            capped,
            GasParams::Eip1559 {
                max_fee_per_gas: 50,
                max_priority_fee_per_gas: 10
            }
        );
        assert_eq!(capped.effective_gas_price(), 50);
    }
}
