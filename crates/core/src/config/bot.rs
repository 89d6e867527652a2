//! Configuration management with profile support.
//!
//! Provides the runtime parameters of the bot with support for different
//! profiles (testing, production, aggressive) or a TOML file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Main configuration structure containing all bot parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Profile name (for logging/identification)
    #[serde(default = "default_profile_name")]
    pub profile: String,

    /// Poll loop timing and per-call bounds
    #[serde(default)]
    pub scheduler: SchedulerTimingConfig,

    /// Arbitrage profitability thresholds
    #[serde(default)]
    pub arbitrage: ArbitrageConfig,

    /// Transaction submission parameters
    #[serde(default)]
    pub submission: SubmissionConfig,
}

fn default_profile_name() -> String {
    "default".to_string()
}

/// Poll loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerTimingConfig {
    /// Sleep when the head has not moved or a cycle failed (milliseconds)
    #[serde(default = "default_loop_delay")]
    pub loop_delay_ms: u64,

    /// Cycles between collateral set refreshes
    #[serde(default = "default_asset_refresh_cycles")]
    pub asset_refresh_cycles: u64,

    /// Bound on each chain read (milliseconds)
    #[serde(default = "default_call_timeout")]
    pub call_timeout_ms: u64,

    /// Bound on one submission, inclusion wait included (milliseconds)
    #[serde(default = "default_submit_timeout")]
    pub submit_timeout_ms: u64,

    /// Drop a decision when the head moved past the scanned block
    #[serde(default = "default_skip_stale")]
    pub skip_stale_decisions: bool,
}

fn default_loop_delay() -> u64 {
    5_000
}
fn default_asset_refresh_cycles() -> u64 {
    1_000
}
fn default_call_timeout() -> u64 {
    10_000
}
fn default_submit_timeout() -> u64 {
    120_000
}
fn default_skip_stale() -> bool {
    true
}

impl Default for SchedulerTimingConfig {
    fn default() -> Self {
        Self {
            loop_delay_ms: default_loop_delay(),
            asset_refresh_cycles: default_asset_refresh_cycles(),
            call_timeout_ms: default_call_timeout(),
            submit_timeout_ms: default_submit_timeout(),
            skip_stale_decisions: default_skip_stale(),
        }
    }
}

impl SchedulerTimingConfig {
    pub fn loop_delay(&self) -> Duration {
        Duration::from_millis(self.loop_delay_ms)
    }
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }
}

/// Arbitrage profitability thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageConfig {
    /// Minimum net profit USD to buy collateral
    #[serde(default = "default_min_profit")]
    pub min_profit_usd: f64,

    /// Flat execution cost USD subtracted from gross profit
    #[serde(default = "default_estimated_cost")]
    pub estimated_cost_usd: f64,
}

fn default_min_profit() -> f64 {
    0.0
}
fn default_estimated_cost() -> f64 {
    25.0
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            min_profit_usd: default_min_profit(),
            estimated_cost_usd: default_estimated_cost(),
        }
    }
}

/// Transaction submission parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Gas limit for executor calls
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,

    /// Head polling interval while waiting for a bundle's block (milliseconds)
    #[serde(default = "default_inclusion_poll")]
    pub inclusion_poll_ms: u64,
}

fn default_gas_limit() -> u64 {
    1_500_000
}
fn default_inclusion_poll() -> u64 {
    1_000
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            gas_limit: default_gas_limit(),
            inclusion_poll_ms: default_inclusion_poll(),
        }
    }
}

impl SubmissionConfig {
    pub fn inclusion_poll(&self) -> Duration {
        Duration::from_millis(self.inclusion_poll_ms)
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            scheduler: SchedulerTimingConfig::default(),
            arbitrage: ArbitrageConfig::default(),
            submission: SubmissionConfig::default(),
        }
    }
}

impl BotConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Create a testing profile: fast polling, no profit floor.
    pub fn testing() -> Self {
        Self {
            profile: "testing".to_string(),
            scheduler: SchedulerTimingConfig {
                loop_delay_ms: 1_000,
                asset_refresh_cycles: 100,
                call_timeout_ms: 5_000,
                submit_timeout_ms: 60_000,
                skip_stale_decisions: true,
            },
            arbitrage: ArbitrageConfig {
                min_profit_usd: 0.0,
                estimated_cost_usd: 0.0, // Testnets: gas is free
            },
            submission: SubmissionConfig {
                gas_limit: 2_000_000,
                inclusion_poll_ms: 500,
            },
        }
    }

    /// Create a production profile with conservative settings.
    pub fn production() -> Self {
        Self {
            profile: "production".to_string(),
            scheduler: SchedulerTimingConfig::default(),
            arbitrage: ArbitrageConfig {
                min_profit_usd: 50.0,
                estimated_cost_usd: 40.0,
            },
            submission: SubmissionConfig::default(),
        }
    }

    /// Create an aggressive profile for maximum speed.
    pub fn aggressive() -> Self {
        Self {
            profile: "aggressive".to_string(),
            scheduler: SchedulerTimingConfig {
                loop_delay_ms: 1_000, // Sub-block polling
                asset_refresh_cycles: 5_000,
                call_timeout_ms: 4_000,
                submit_timeout_ms: 30_000,
                skip_stale_decisions: true,
            },
            arbitrage: ArbitrageConfig {
                min_profit_usd: 5.0,
                estimated_cost_usd: 25.0,
            },
            submission: SubmissionConfig {
                gas_limit: 2_500_000,
                inclusion_poll_ms: 250,
            },
        }
    }

    /// Profile by name. Supported values: testing, production, aggressive;
    /// anything else is the default profile.
    pub fn from_profile(profile: &str) -> Self {
        match profile.to_lowercase().as_str() {
            "testing" | "test" => Self::testing(),
            "production" | "prod" => Self::production(),
            "aggressive" | "aggro" => Self::aggressive(),
            _ => Self::default(),
        }
    }

    /// A config file wins over a profile name.
    pub fn resolve(profile: Option<&str>, file: Option<&Path>) -> Result<Self, ConfigError> {
        match (file, profile) {
            (Some(path), _) => Self::from_file(path),
            (None, Some(name)) => Ok(Self::from_profile(name)),
            (None, None) => Ok(Self::default()),
        }
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        tracing::info!(profile = %self.profile, "Bot configuration loaded");
        tracing::info!(
            loop_delay_ms = self.scheduler.loop_delay_ms,
            asset_refresh_cycles = self.scheduler.asset_refresh_cycles,
            call_timeout_ms = self.scheduler.call_timeout_ms,
            submit_timeout_ms = self.scheduler.submit_timeout_ms,
            skip_stale = self.scheduler.skip_stale_decisions,
            "Scheduler timing"
        );
        tracing::info!(
            min_profit = self.arbitrage.min_profit_usd,
            estimated_cost = self.arbitrage.estimated_cost_usd,
            "Arbitrage thresholds"
        );
        tracing::info!(
            gas_limit = self.submission.gas_limit,
            inclusion_poll_ms = self.submission.inclusion_poll_ms,
            "Submission parameters"
        );
    }
}
