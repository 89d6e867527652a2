//! Network configuration: RPC endpoint, gas pricing and the Comet
//! deployments available on the network.
//!
//! One file per network at `<config_dir>/networks/<network>.toml`. String
//! values may reference the environment as `${VAR}`.

use alloy::primitives::Address;
use liquidator_chain::{GasPricing, DEFAULT_MAX_LOG_RANGE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Parsed network file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network: NetworkDetails,
    /// Deployments by name (e.g. "usdc", "weth")
    #[serde(default)]
    pub deployments: BTreeMap<String, DeploymentEntry>,
}

/// Network details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDetails {
    /// Network name; must match the file name
    pub name: String,
    pub chain_id: u64,
    /// HTTP RPC endpoint
    pub rpc_url: String,
    /// Width of each `eth_getLogs` request
    #[serde(default = "default_max_log_range")]
    pub max_log_range: u64,
    #[serde(default)]
    pub gas: GasConfig,
}

fn default_max_log_range() -> u64 {
    DEFAULT_MAX_LOG_RANGE
}

/// Gas pricing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    #[serde(default)]
    pub pricing: GasPricingModel,
    /// Maximum gas price willing to pay (in gwei)
    #[serde(default = "default_max_gas_price")]
    pub max_gas_price_gwei: f64,
    /// Priority fee floor for EIP-1559 transactions (in gwei)
    #[serde(default)]
    pub priority_fee_gwei: Option<f64>,
}

fn default_max_gas_price() -> f64 {
    100.0
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            pricing: GasPricingModel::default(),
            max_gas_price_gwei: default_max_gas_price(),
            priority_fee_gwei: None,
        }
    }
}

/// Gas pricing model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasPricingModel {
    /// Legacy gas pricing (gas price only)
    Legacy,
    /// EIP-1559 (base fee + priority fee)
    #[default]
    Eip1559,
}

/// One Comet deployment as written in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentEntry {
    /// Comet proxy address
    pub comet: String,
    /// Snapshot query helper address
    pub snapshot_query: String,
    /// First block to index borrowers from
    #[serde(default)]
    pub start_block: u64,
}

/// Deployment with addresses resolved and checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMarket {
    pub comet: Address,
    pub snapshot_query: Address,
    pub start_block: u64,
}

impl NetworkConfig {
    /// Location of a network's file.
    pub fn path(config_dir: &Path, network: &str) -> PathBuf {
        config_dir.join("networks").join(format!("{network}.toml"))
    }

    /// Load the file for `network`.
    pub fn load(config_dir: &Path, network: &str) -> Result<Self, ConfigError> {
        let path = Self::path(config_dir, network);
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::parse(&content, &path)?;

        if config.network.name != network {
            return Err(ConfigError::invalid(
                "network.name",
                format!("{} declares network `{}`", path.display(), config.network.name),
            ));
        }
        Ok(config)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// RPC endpoint with `${VAR}` references expanded.
    pub fn rpc_url<F>(&self, lookup: F) -> Result<String, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        expand_env_with("network.rpc_url", &self.network.rpc_url, &lookup)
    }

    pub fn gas_pricing(&self) -> GasPricing {
        let model = match self.network.gas.pricing {
            GasPricingModel::Legacy => "legacy",
            GasPricingModel::Eip1559 => "eip1559",
        };
        GasPricing::from_config(
            model,
            self.network.gas.max_gas_price_gwei,
            self.network.gas.priority_fee_gwei,
        )
    }

    /// Resolve the addresses of `deployment`. A missing entry or address is
    /// an error; so is the zero address.
    pub fn resolve_deployment<F>(&self, deployment: &str, lookup: F) -> Result<ResolvedMarket, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let entry = self
            .deployments
            .get(deployment)
            .ok_or_else(|| ConfigError::UnknownDeployment {
                network: self.network.name.clone(),
                deployment: deployment.to_string(),
            })?;

        let address = |field: &str, raw: &str| -> Result<Address, ConfigError> {
            let key = format!("deployments.{deployment}.{field}");
            let value = expand_env_with(&key, raw, &lookup)?;
            let address: Address = value.parse().map_err(|e| ConfigError::invalid(&key, e))?;
            if address.is_zero() {
                return Err(ConfigError::invalid(key, "zero address"));
            }
            Ok(address)
        };

        Ok(ResolvedMarket {
            comet: address("comet", &entry.comet)?,
            snapshot_query: address("snapshot_query", &entry.snapshot_query)?,
            start_block: entry.start_block,
        })
    }
}

/// Expand `${VAR_NAME}` patterns through `lookup`. An unset variable is an
/// error naming `key`.
pub fn expand_env_with<F>(key: &str, value: &str, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::invalid(key, e))?;

    let mut result = value.to_string();
    for cap in re.captures_iter(value) {
        if let (Some(full_match), Some(var_match)) = (cap.get(0), cap.get(1)) {
            let var_name = var_match.as_str();
            let resolved = lookup(var_name).filter(|v| !v.is_empty()).ok_or_else(|| {
                ConfigError::invalid(key, format!("environment variable {var_name} is not set"))
            })?;
            result = result.replace(full_match.as_str(), &resolved);
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const MAINNET: &str = r#"
        [network]
        name = "mainnet"
        chain_id = 1
        rpc_url = "https://eth-mainnet.example/v2/${RPC_KEY}"

        [network.gas]
        pricing = "eip1559"
        max_gas_price_gwei = 200.0
        priority_fee_gwei = 2.0

        [deployments.usdc]
        comet = "0xc3d688B66703497DAA19211EEdff47f25384cdc3"
        snapshot_query = "${SNAPSHOT_QUERY_ADDRESS}"
        start_block = 15331586

        [deployments.broken]
        comet = "0x0000000000000000000000000000000000000000"
        snapshot_query = "0x1111111111111111111111111111111111111111"
    "#;

    fn config() -> NetworkConfig {
        NetworkConfig::parse(MAINNET, Path::new("networks/mainnet.toml")).unwrap()
    }

    fn env(name: &str) -> Option<String> {
        match name {
            "RPC_KEY" => Some("secret".into()),
            "SNAPSHOT_QUERY_ADDRESS" => Some("0x2222222222222222222222222222222222222222".into()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_env() {
        assert_eq!(expand_env_with("k", "${RPC_KEY}", &env).unwrap(), "secret");
        assert_eq!(expand_env_with("k", "a_${RPC_KEY}_b", &env).unwrap(), "a_secret_b");
        assert_eq!(expand_env_with("k", "no_vars", &env).unwrap(), "no_vars");
        assert!(matches!(
            expand_env_with("k", "${UNSET_VAR}", &env),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_network_details() {
        let config = config();
        assert_eq!(config.network.chain_id, 1);
        assert_eq!(config.network.max_log_range, DEFAULT_MAX_LOG_RANGE);
        assert_eq!(config.rpc_url(env).unwrap(), "https://eth-mainnet.example/v2/secret");
        assert_eq!(config.gas_pricing().name(), "EIP-1559");
    }

    #[test]
    fn test_resolve_deployment() {
        let market = config().resolve_deployment("usdc", env).unwrap();
        assert_eq!(market.comet, address!("c3d688B66703497DAA19211EEdff47f25384cdc3"));
        assert_eq!(market.snapshot_query, address!("2222222222222222222222222222222222222222"));
        assert_eq!(market.start_block, 15_331_586);
    }

    #[test]
    fn test_unresolved_addresses_are_fatal() {
        let config = config();
        assert!(matches!(
            config.resolve_deployment("weth", env),
            Err(ConfigError::UnknownDeployment { .. })
        ));
        assert!(matches!(
            config.resolve_deployment("broken", env),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            config.resolve_deployment("usdc", |_: &str| None),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = NetworkConfig::load(Path::new("/nonexistent"), "mainnet").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
