//! Configuration system for the liquidation bot.
//!
//! This module provides:
//! - Bot runtime configuration (profiles, timing, thresholds)
//! - Process environment (identities, network, deployment, mode)
//! - Network configuration (RPC endpoint, gas, deployment addresses)
//! - Startup resolution that fails fast on anything fatal

mod bot;
mod env;
mod network;
mod startup;

pub use bot::{ArbitrageConfig, BotConfig, SchedulerTimingConfig, SubmissionConfig};
pub use env::{vars, EnvConfig};
pub use network::{
    expand_env_with, DeploymentEntry, GasConfig, GasPricingModel, NetworkConfig, NetworkDetails,
    ResolvedMarket,
};
pub use startup::StartupPlan;
