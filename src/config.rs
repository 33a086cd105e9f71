use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const PRIVATE_KEY_ENV: &str = "DEPLOYER_PRIVATE_KEY";
pub const RPC_URL_ENV: &str = "GODWOKEN_RPC_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub networks: HashMap<String, NetworkConfig>,
    pub default_network: String,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub account: AccountConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub explorer_url: Option<String>,
    pub gas: GasConfig,
    pub godwoken: GodwokenConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    /// Gas allowance attached to every write, deploy and transfer
    pub default_gas_limit: u64,
    /// Fixed legacy gas price in wei; the node's `eth_gasPrice` is used when unset
    pub gas_price: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GodwokenConfig {
    pub rollup_type_hash: String,
    pub eth_account_lock_type_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    pub search_dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub check_balance_before_write: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    pub private_key: Option<String>,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            search_dirs: vec![PathBuf::from("build/contracts"), PathBuf::from(".")],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut networks = HashMap::new();

        networks.insert(
            "godwoken-testnet".to_string(),
            NetworkConfig {
                rpc_url: "https://godwoken-testnet-web3-rpc.ckbapp.dev".to_string(),
                chain_id: 71393,
                explorer_url: Some("https://aggron.gwscan.com".to_string()),
                gas: GasConfig {
                    default_gas_limit: 6_000_000,
                    gas_price: None,
                },
                godwoken: GodwokenConfig {
                    rollup_type_hash:
                        "0x4cc2e6526204ae6a2e8fcf12f7ad472f41a1606d5b9624beebd215d780809f6a"
                            .to_string(),
                    eth_account_lock_type_hash:
                        "0xdeec13a7b8e100579541384ccaf4b5223733e4a5483c3aec95ddc4c1d5ea5b22"
                            .to_string(),
                },
            },
        );

        Self {
            networks,
            default_network: "godwoken-testnet".to_string(),
            artifacts: ArtifactsConfig::default(),
            security: SecurityConfig::default(),
            account: AccountConfig::default(),
        }
    }
}

/// Settings given outside the config file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub network: Option<String>,
    pub rpc_url: Option<String>,
    pub private_key: Option<String>,
}

impl Overrides {
    /// `GODWOKEN_RPC_URL` and `DEPLOYER_PRIVATE_KEY`, ignoring empty values
    pub fn from_env() -> Self {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|value| !value.trim().is_empty())
        };

        Self {
            network: None,
            rpc_url: var(RPC_URL_ENV),
            private_key: var(PRIVATE_KEY_ENV),
        }
    }

    /// Keeps every value set in `self` and fills the rest from `fallback`
    pub fn or(self, fallback: Overrides) -> Self {
        Self {
            network: self.network.or(fallback.network),
            rpc_url: self.rpc_url.or(fallback.rpc_url),
            private_key: self.private_key.or(fallback.private_key),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        Ok(config)
    }

    /// Load configuration with fallback to default
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        let mut config = match path {
            Some(path) => match Self::load_from_file(path).await {
                Ok(config) => {
                    tracing::info!("Loaded configuration from file");
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to load config file, using defaults: {}", e);
                    Self::default()
                }
            },
            None => match Self::default_config_path() {
                Ok(path) if path.exists() => Self::load_from_file(&path).await.unwrap_or_else(|e| {
                    tracing::warn!("Failed to load {:?}, using defaults: {}", path, e);
                    Self::default()
                }),
                _ => Self::default(),
            },
        };

        config
    }

    pub fn network(&self, name: Option<&str>) -> Result<&NetworkConfig> {
        let network_name = name.unwrap_or(&self.default_network);
        self.networks.get(network_name).ok_or_else(|| {
            let mut available: Vec<&String> = self.networks.keys().collect();
            available.sort();
            anyhow!(
                "Network '{}' not configured. Available networks: {}",
                network_name,
                available
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
    }

    pub fn network_mut(&mut self, name: Option<&str>) -> Result<&mut NetworkConfig> {
        let network_name = name.unwrap_or(&self.default_network).to_string();
        self.networks
            .get_mut(&network_name)
            .ok_or_else(|| anyhow!("Network '{}' not configured", network_name))
    }

    /// Applies `overrides` on top of the loaded file. The endpoint override
    /// lands on the network selected after `overrides.network` is applied.
    pub fn apply_overrides(&mut self, overrides: Overrides) -> Result<()> {
        if let Some(network) = overrides.network {
            self.default_network = network;
        }

        if let Some(rpc_url) = overrides.rpc_url {
            tracing::debug!("Using {} for network {}", rpc_url, self.default_network);
            self.network_mut(None)?.rpc_url = rpc_url;
        }

        if let Some(private_key) = overrides.private_key {
            self.account.private_key = Some(private_key);
        }

        Ok(())
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("godwoken-scripts").join("config.toml"))
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let sample_config = r#"# godwoken-scripts configuration file

# Network used when --network is not given
default_network = "godwoken-testnet"

[networks.godwoken-testnet]
rpc_url = "https://godwoken-testnet-web3-rpc.ckbapp.dev"
chain_id = 71393
explorer_url = "https://aggron.gwscan.com"

[networks.godwoken-testnet.gas]
default_gas_limit = 6000000
# gas_price = 0  # fixed legacy gas price in wei, eth_gasPrice is used when unset

[networks.godwoken-testnet.godwoken]
rollup_type_hash = "0x4cc2e6526204ae6a2e8fcf12f7ad472f41a1606d5b9624beebd215d780809f6a"
eth_account_lock_type_hash = "0xdeec13a7b8e100579541384ccaf4b5223733e4a5483c3aec95ddc4c1d5ea5b22"

# Directories searched, in order, for compiled contract artifacts
[artifacts]
search_dirs = ["build/contracts", "."]

[security]
# Deploys always check the balance first; set this to check before writes too
check_balance_before_write = false

[account]
# private_key = "0x..."

# Environment variables that can be used:
# DEPLOYER_PRIVATE_KEY - signing key, overrides account.private_key
# GODWOKEN_RPC_URL - RPC endpoint for the default network
"#;
        sample_config.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        let network = config.network(None).unwrap();
        assert_eq!(network.gas.default_gas_limit, 6_000_000);
        assert_eq!(network.chain_id, 71393);
        assert_eq!(
            config.artifacts.search_dirs,
            vec![PathBuf::from("build/contracts"), PathBuf::from(".")]
        );
        assert!(!config.security.check_balance_before_write);
        assert!(config.network(Some("mainnet")).is_err());
    }

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(&Config::generate_sample()).unwrap();
        let default = Config::default();
        let network = config.network(None).unwrap();
        let default_network = default.network(None).unwrap();

        assert_eq!(config.default_network, default.default_network);
        assert_eq!(network.rpc_url, default_network.rpc_url);
        assert_eq!(
            network.godwoken.rollup_type_hash,
            default_network.godwoken.rollup_type_hash
        );
        assert_eq!(network.gas.gas_price, None);
        assert_eq!(config.account.private_key, None);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        let sample = Config::generate_sample().replace("6000000", "1000000");
        std::fs::write(&path, sample).unwrap();

        let config = Config::load_from_file(&path).await.unwrap();
        assert_eq!(config.network(None).unwrap().gas.default_gas_limit, 1_000_000);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let result = Config::load_from_file(temp_dir.path().join("missing.toml")).await;
        assert!(result.is_err());
    }

    fn two_network_config() -> Config {
        let mut config = Config::default();
        let mut devnet = config.network(None).unwrap().clone();
        devnet.rpc_url = "http://devnet.example:8024".to_string();
        config.networks.insert("devnet".to_string(), devnet);
        config.account.private_key = Some("file-key".to_string());
        config
    }

    #[test]
    fn test_rpc_override_targets_selected_network() {
        let mut config = two_network_config();
        let testnet_url = config.network(None).unwrap().rpc_url.clone();
        let env = Overrides {
            rpc_url: Some("http://override.example:9000".to_string()),
            ..Default::default()
        };
        let cli = Overrides {
            network: Some("devnet".to_string()),
            ..Default::default()
        };

        config.apply_overrides(cli.or(env)).unwrap();
        assert_eq!(config.default_network, "devnet");
        assert_eq!(
            config.network(None).unwrap().rpc_url,
            "http://override.example:9000"
        );
        assert_eq!(
            config.network(Some("godwoken-testnet")).unwrap().rpc_url,
            testnet_url
        );
    }

    #[test]
    fn test_override_precedence() {
        let env = Overrides {
            rpc_url: Some("http://env.example".to_string()),
            private_key: Some("env-key".to_string()),
            ..Default::default()
        };

        let mut config = two_network_config();
        config.apply_overrides(Overrides::default().or(env.clone())).unwrap();
        assert_eq!(config.network(None).unwrap().rpc_url, "http://env.example");
        assert_eq!(config.account.private_key.as_deref(), Some("env-key"));

        let cli = Overrides {
            network: None,
            rpc_url: Some("http://cli.example".to_string()),
            private_key: Some("cli-key".to_string()),
        };
        let mut config = two_network_config();
        config.apply_overrides(cli.or(env)).unwrap();
        assert_eq!(config.network(None).unwrap().rpc_url, "http://cli.example");
        assert_eq!(config.account.private_key.as_deref(), Some("cli-key"));

        let mut config = two_network_config();
        config.apply_overrides(Overrides::default()).unwrap();
        assert_eq!(config.account.private_key.as_deref(), Some("file-key"));
    }

    #[test]
    fn test_unknown_network_override_is_an_error() {
        let mut config = two_network_config();
        let overrides = Overrides {
            network: Some("mainnet".to_string()),
            rpc_url: Some("http://cli.example".to_string()),
            ..Default::default()
        };
        assert!(config.apply_overrides(overrides).is_err());
    }
}
