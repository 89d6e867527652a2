//! Liquidator core logic.
//!
//! This crate provides the decision loop of the Comet liquidation bot:
//! - Chain state reader with pinned-block, validated snapshots
//! - Asset registry with replace-on-success refresh
//! - Opportunity evaluator (liquidation first, then arbitrage)
//! - Transaction submitter (direct or private relay)
//! - Poll scheduler owning timing, block-change detection and backoff
//! - Configuration: bot profiles, environment, network files

mod action;
mod assets;
pub mod config;
mod error;
mod evaluator;
mod reader;
mod scheduler;
mod snapshot;
mod submitter;
pub mod u256_math;

#[cfg(test)]
mod testing;

pub use action::{Action, Receipt, SubmissionContext, SubmissionMode, SubmissionOutcome};
pub use assets::{Asset, AssetLookup, AssetRegistry};
pub use config::{BotConfig, EnvConfig, NetworkConfig, StartupPlan};
pub use error::{ConfigError, PipelineError, ScanError, SubmissionError};
pub use evaluator::{Evaluator, ProfitEstimate};
pub use reader::{validate_snapshot, StateReader};
pub use scheduler::{CycleOutcome, PipelineOutcome, Scheduler, SchedulerConfig};
pub use snapshot::{BorrowerSnapshot, PurchasableCollateral, ScanResult, SeizableCollateral};
pub use submitter::{ChainSubmitter, Submitter};
