//! Environment-based Configuration for the custody engine
//!
//! All secrets (keystore password, operator password) come from environment
//! variables. Devnet falls back to local-node defaults so a fresh checkout can
//! run against a development chain without any setup.
//!
//! # Environment Variables
//!
//! ## Network
//! - `CUSTODY_NETWORK` - "mainnet", "testnet" or "devnet" (default: "devnet")
//! - `CUSTODY_RPC_URL` - JSON-RPC endpoint of the node
//!
//! ## Storage
//! - `CUSTODY_DATA_DIR` - directory holding the pool document and ledgers
//!
//! ## Treasury & Keys
//! - `CUSTODY_TREASURY_ADDRESS` - sweep destination and withdrawal source
//! - `CUSTODY_KEYSTORE_PASSWORD` - unlocks node-held account keys
//! - `CUSTODY_ADMIN_PASSWORD` - operator login password
//!
//! ## Transfers
//! - `CUSTODY_GAS_LIMIT` - fixed gas limit for value transfers
//! - `CUSTODY_GAS_PREMIUM_WEI` - premium added on top of the suggested gas price
//!
//! ## Optional Settings
//! - `CUSTODY_RECONCILE_CONCURRENCY` - parallel ledger reconciliations
//! - `CUSTODY_LOG_LEVEL` - Logging level (debug, info, warn, error)

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Default JSON-RPC endpoint of a local node
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// Default data directory
pub const DEFAULT_DATA_DIR: &str = "./SystemData";

/// Devnet treasury used when none is configured
pub const DEVNET_TREASURY: &str = "0xc0093215bec3cbb9522352dcb4e3fa8fd5b665d1";

/// Devnet password for both the keystore and operator login
pub const DEVNET_PASSWORD: &str = "admin";

/// Fixed gas limit for plain value transfers
pub const DEFAULT_GAS_LIMIT: u64 = 80_000;

/// 5 gwei on top of the suggested price
pub const DEFAULT_GAS_PREMIUM_WEI: u128 = 5_000_000_000;

pub const DEFAULT_RECONCILE_CONCURRENCY: usize = 4;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("network mismatch: expected {0}, got {1}")]
    NetworkMismatch(String, String),

    #[error("insecure default for {0} not allowed on {1}")]
    InsecureDefault(String, String),
}

/// Network environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "devnet" | "dev" => Ok(Network::Devnet),
            _ => Err(ConfigError::InvalidValue(
                "CUSTODY_NETWORK".to_string(),
                format!("unknown network: {}", s),
            )),
        }
    }
}

impl Network {
    /// Whether local-node defaults may stand in for missing settings
    pub fn allows_defaults(&self) -> bool {
        matches!(self, Network::Devnet)
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct CustodyConfig {
    /// Network environment
    pub network: Network,

    /// JSON-RPC endpoint
    pub rpc_url: String,

    /// Directory with `addresses.txt` and `AccountInfo/`
    pub data_dir: PathBuf,

    /// Treasury address (lowercase hex)
    pub treasury_address: String,

    /// Password unlocking node-held keys
    pub keystore_password: String,

    /// Operator login password
    pub admin_password: String,

    /// Gas limit for transfers
    pub gas_limit: u64,

    /// Premium added to the suggested gas price, in wei
    pub gas_premium_wei: u128,

    /// Bound of the reconcile-all worker pool
    pub reconcile_concurrency: usize,

    /// Log level
    pub log_level: String,
}

impl CustodyConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let network: Network = env::var("CUSTODY_NETWORK")
            .unwrap_or_else(|_| "devnet".to_string())
            .parse()?;

        let rpc_url = env::var("CUSTODY_RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());

        let data_dir = env::var("CUSTODY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        let treasury_address =
            get_required_or_devnet_default("CUSTODY_TREASURY_ADDRESS", DEVNET_TREASURY, network)?
                .to_lowercase();

        let keystore_password =
            get_required_or_devnet_default("CUSTODY_KEYSTORE_PASSWORD", DEVNET_PASSWORD, network)?;

        let admin_password =
            get_required_or_devnet_default("CUSTODY_ADMIN_PASSWORD", DEVNET_PASSWORD, network)?;

        let gas_limit = parse_or_default("CUSTODY_GAS_LIMIT", DEFAULT_GAS_LIMIT)?;
        let gas_premium_wei = parse_or_default("CUSTODY_GAS_PREMIUM_WEI", DEFAULT_GAS_PREMIUM_WEI)?;

        let reconcile_concurrency: usize =
            parse_or_default("CUSTODY_RECONCILE_CONCURRENCY", DEFAULT_RECONCILE_CONCURRENCY)?;
        if reconcile_concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "CUSTODY_RECONCILE_CONCURRENCY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let log_level = env::var("CUSTODY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            network,
            rpc_url,
            data_dir,
            treasury_address,
            keystore_password,
            admin_password,
            gas_limit,
            gas_premium_wei,
            reconcile_concurrency,
            log_level,
        })
    }

    /// Local devnet configuration rooted at `data_dir`
    pub fn devnet(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            network: Network::Devnet,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            data_dir: data_dir.into(),
            treasury_address: DEVNET_TREASURY.to_string(),
            keystore_password: DEVNET_PASSWORD.to_string(),
            admin_password: DEVNET_PASSWORD.to_string(),
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_premium_wei: DEFAULT_GAS_PREMIUM_WEI,
            reconcile_concurrency: DEFAULT_RECONCILE_CONCURRENCY,
            log_level: "info".to_string(),
        }
    }

    /// Path of the pool document
    pub fn pool_path(&self) -> PathBuf {
        self.data_dir.join("addresses.txt")
    }

    /// Directory of per-address ledger documents
    pub fn ledger_dir(&self) -> PathBuf {
        self.data_dir.join("AccountInfo")
    }

    /// Validate configuration for production readiness
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if self.network != Network::Mainnet {
            return Err(ConfigError::NetworkMismatch(
                "mainnet".to_string(),
                format!("{:?}", self.network),
            ));
        }

        if self.keystore_password == DEVNET_PASSWORD {
            return Err(ConfigError::InsecureDefault(
                "CUSTODY_KEYSTORE_PASSWORD".to_string(),
                "mainnet".to_string(),
            ));
        }

        if self.admin_password == DEVNET_PASSWORD {
            return Err(ConfigError::InsecureDefault(
                "CUSTODY_ADMIN_PASSWORD".to_string(),
                "mainnet".to_string(),
            ));
        }

        Ok(())
    }

    /// Print configuration summary (hiding sensitive values)
    pub fn print_summary(&self) {
        println!("=== Custody Configuration ===");
        println!("Network: {:?}", self.network);
        println!("RPC URL: {}", self.rpc_url);
        println!("Data Dir: {}", self.data_dir.display());
        println!("Treasury: {}", self.treasury_address);
        println!("Gas Limit: {}", self.gas_limit);
        println!("Gas Premium: {} wei", self.gas_premium_wei);
        println!("Reconcile Concurrency: {}", self.reconcile_concurrency);
        println!("Log Level: {}", self.log_level);
        println!("=============================");
    }
}

/// Get required env var, or use default for devnet only
fn get_required_or_devnet_default(
    var_name: &str,
    devnet_default: &str,
    network: Network,
) -> Result<String, ConfigError> {
    match env::var(var_name) {
        Ok(value) => Ok(value),
        Err(_) => {
            if network.allows_defaults() {
                Ok(devnet_default.to_string())
            } else {
                Err(ConfigError::MissingEnvVar(var_name.to_string()))
            }
        }
    }
}

fn parse_or_default<T: FromStr>(var_name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(var_name) {
        Ok(value) => value.trim().parse().map_err(|_| {
            ConfigError::InvalidValue(var_name.to_string(), format!("not a number: {}", value))
        }),
        Err(_) => Ok(default),
    }
}
