//! Decisions and what became of them.

use alloy::primitives::{Address, B256, U256};
use smallvec::SmallVec;
use std::fmt;

use crate::snapshot::SeizableCollateral;

/// What the evaluator wants done this block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Absorb `account` and buy back its registered collateral.
    Liquidate {
        account: Address,
        seized_assets: SmallVec<[SeizableCollateral; 4]>,
    },
    /// Buy `quantity` of `asset` from protocol reserves.
    Arbitrage { asset: Address, quantity: U256 },
    NoAction,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Liquidate { .. } => "liquidate",
            Action::Arbitrage { .. } => "arbitrage",
            Action::NoAction => "none",
        }
    }

    pub fn is_no_action(&self) -> bool {
        matches!(self, Action::NoAction)
    }

    /// Arguments of the executor call: accounts to absorb, assets to buy and
    /// the maximum amount of each. `None` for `NoAction`.
    pub fn executor_args(&self) -> Option<(Vec<Address>, Vec<Address>, Vec<U256>)> {
        match self {
            Action::Liquidate {
                account,
                seized_assets,
            } => Some((
                vec![*account],
                seized_assets.iter().map(|c| c.asset).collect(),
                seized_assets.iter().map(|c| c.balance).collect(),
            )),
            Action::Arbitrage { asset, quantity } => Some((vec![], vec![*asset], vec![*quantity])),
            Action::NoAction => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Liquidate {
                account,
                seized_assets,
            } => write!(f, "liquidate {account} ({} assets)", seized_assets.len()),
            Action::Arbitrage { asset, quantity } => write!(f, "arbitrage {quantity} of {asset}"),
            Action::NoAction => f.write_str("no action"),
        }
    }
}

/// How transactions leave the process. Fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
    /// Public mempool broadcast
    Direct,
    /// Single-transaction bundle to a private relay, next block only
    PrivateRelay,
}

impl SubmissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionMode::Direct => "direct",
            SubmissionMode::PrivateRelay => "private-relay",
        }
    }
}

/// Identities and targets used for every submission of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionContext {
    /// Funds-holding signer
    pub signer: Address,
    /// Relay reputation identity; present only in private relay mode
    pub relay_identity: Option<Address>,
    pub network: String,
    pub deployment: String,
}

impl SubmissionContext {
    pub fn mode(&self) -> SubmissionMode {
        if self.relay_identity.is_some() {
            SubmissionMode::PrivateRelay
        } else {
            SubmissionMode::Direct
        }
    }
}

/// A mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
    pub mode: SubmissionMode,
}

/// Result of a submission that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Confirmed(Receipt),
    /// The bundle missed its block. Not an error.
    NotIncluded { target_block: u64, tx_hash: B256 },
}
