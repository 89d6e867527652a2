//! Process environment.

use alloy::primitives::Address;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Environment variable names.
pub mod vars {
    pub const LIQUIDATOR_ADDRESS: &str = "LIQUIDATOR_ADDRESS";
    pub const DEPLOYMENT: &str = "DEPLOYMENT";
    pub const NETWORK: &str = "NETWORK";
    pub const USE_FLASHBOTS: &str = "USE_FLASHBOTS";
    pub const ETH_PK: &str = "ETH_PK";
    pub const CONFIG_DIR: &str = "CONFIG_DIR";
    pub const BOT_PROFILE: &str = "BOT_PROFILE";
    pub const BOT_CONFIG: &str = "BOT_CONFIG";
}

const DEFAULT_CONFIG_DIR: &str = "config";

/// Settings read from the environment at startup.
#[derive(Clone)]
pub struct EnvConfig {
    /// Liquidator executor contract
    pub liquidator: Address,
    pub deployment: String,
    pub network: String,
    /// Submit through a private relay instead of the public mempool
    pub use_flashbots: bool,
    /// Funds-holding key, hex
    pub private_key: String,
    pub config_dir: PathBuf,
    pub bot_profile: Option<String>,
    pub bot_config: Option<PathBuf>,
}

impl EnvConfig {
    /// Read from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read through `lookup`. Empty values count as unset.
    ///
    /// In relay mode the signing key is checked before anything else.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let use_flashbots = get(vars::USE_FLASHBOTS).is_some_and(|v| v.eq_ignore_ascii_case("true"));
        if use_flashbots {
            require(vars::ETH_PK)?;
        }

        let liquidator = require(vars::LIQUIDATOR_ADDRESS)?
            .parse::<Address>()
            .map_err(|e| ConfigError::invalid(vars::LIQUIDATOR_ADDRESS, e))?;
        let deployment = require(vars::DEPLOYMENT)?;
        let network = require(vars::NETWORK)?;
        let private_key = require(vars::ETH_PK)?;

        Ok(Self {
            liquidator,
            deployment,
            network,
            use_flashbots,
            private_key,
            config_dir: get(vars::CONFIG_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
            bot_profile: get(vars::BOT_PROFILE),
            bot_config: get(vars::BOT_CONFIG).map(PathBuf::from),
        })
    }
}

impl std::fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvConfig")
            .field("liquidator", &self.liquidator)
            .field("deployment", &self.deployment)
            .field("network", &self.network)
            .field("use_flashbots", &self.use_flashbots)
            .field("private_key", &"<redacted>")
            .field("config_dir", &self.config_dir)
            .field("bot_profile", &self.bot_profile)
            .field("bot_config", &self.bot_config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("LIQUIDATOR_ADDRESS", "0x1111111111111111111111111111111111111111"),
        ("DEPLOYMENT", "usdc"),
        ("NETWORK", "mainnet"),
        ("ETH_PK", "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"),
    ];

    #[test]
    fn test_direct_mode() {
        let env = EnvConfig::from_lookup(lookup(BASE)).unwrap();
        assert!(!env.use_flashbots);
        assert_eq!(env.deployment, "usdc");
        assert_eq!(env.config_dir, PathBuf::from("config"));
        assert!(env.bot_profile.is_none());
    }

    #[test]
    fn test_flashbots_flag_is_case_insensitive() {
        let mut pairs = BASE.to_vec();
        pairs.push(("USE_FLASHBOTS", "TRUE"));
        assert!(EnvConfig::from_lookup(lookup(&pairs)).unwrap().use_flashbots);

        let mut pairs = BASE.to_vec();
        pairs.push(("USE_FLASHBOTS", "yes"));
        assert!(!EnvConfig::from_lookup(lookup(&pairs)).unwrap().use_flashbots);
    }

    #[test]
    fn test_relay_mode_checks_key_first() {
        let err = EnvConfig::from_lookup(lookup(&[("USE_FLASHBOTS", "true")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ETH_PK")));
    }

    #[test]
    fn test_missing_required() {
        let pairs: Vec<_> = BASE.iter().copied().filter(|(k, _)| *k != "DEPLOYMENT").collect();
        let err = EnvConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DEPLOYMENT")));

        let mut pairs = BASE.to_vec();
        pairs.retain(|(k, _)| *k != "ETH_PK");
        let err = EnvConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ETH_PK")));
    }

    #[test]
    fn test_invalid_liquidator_address() {
        let mut pairs = BASE.to_vec();
        pairs[0] = ("LIQUIDATOR_ADDRESS", "0x1234");
        let err = EnvConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_debug_redacts_key() {
        let env = EnvConfig::from_lookup(lookup(BASE)).unwrap();
        let debug = format!("{env:?}");
        assert!(!debug.contains("ac0974"));
    }
}
