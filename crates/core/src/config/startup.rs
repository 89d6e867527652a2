//! Startup resolution. Everything fatal is decided here, before any network
//! call is made.

use alloy::primitives::Address;
use liquidator_chain::{GasPricing, MarketAddresses, RelayNetwork};
use tracing::info;

use super::bot::BotConfig;
use super::env::EnvConfig;
use super::network::{NetworkConfig, ResolvedMarket};
use crate::error::ConfigError;

/// Fully resolved startup configuration.
#[derive(Debug, Clone)]
pub struct StartupPlan {
    pub env: EnvConfig,
    pub bot: BotConfig,
    pub chain_id: u64,
    /// RPC endpoint with environment references expanded
    pub rpc_url: String,
    pub max_log_range: u64,
    pub gas: GasPricing,
    pub market: ResolvedMarket,
    /// Set only in private relay mode
    pub relay: Option<RelayNetwork>,
}

impl StartupPlan {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup = |name: &str| std::env::var(name).ok();
        Self::prepare(EnvConfig::from_lookup(lookup)?, lookup)
    }

    /// Resolve everything the process needs. Performs file reads only.
    ///
    /// The relay network is checked first, so an unsupported network in
    /// relay mode fails before any configuration file is touched.
    pub fn prepare<F>(env: EnvConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let relay = if env.use_flashbots {
            Some(RelayNetwork::from_network(&env.network)?)
        } else {
            None
        };

        let bot = BotConfig::resolve(env.bot_profile.as_deref(), env.bot_config.as_deref())?;
        let network = NetworkConfig::load(&env.config_dir, &env.network)?;
        let market = network.resolve_deployment(&env.deployment, &lookup)?;
        let rpc_url = network.rpc_url(&lookup)?;

        Ok(Self {
            bot,
            chain_id: network.network.chain_id,
            rpc_url,
            max_log_range: network.network.max_log_range,
            gas: network.gas_pricing(),
            market,
            relay,
            env,
        })
    }

    /// Addresses for the chain reader.
    pub fn market_addresses(&self) -> MarketAddresses {
        MarketAddresses {
            comet: self.market.comet,
            snapshot_query: self.market.snapshot_query,
            liquidator: self.env.liquidator,
        }
    }

    pub fn liquidator(&self) -> Address {
        self.env.liquidator
    }

    pub fn log_plan(&self) {
        info!(
            network = %self.env.network,
            deployment = %self.env.deployment,
            chain_id = self.chain_id,
            comet = %self.market.comet,
            liquidator = %self.env.liquidator,
            relay = self.relay.map(|r| r.relay_url()).unwrap_or("disabled"),
            gas_strategy = self.gas.name(),
            "Startup configuration resolved"
        );
    }
}
