//! Wallet configuration
//!
//! Loaded from `<data_dir>/config.json`, then overridden by environment:
//! `SHADE_NETWORK`, `SHADE_RPC_URL`, `SHADE_DATA_DIR`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::hd::{DEFAULT_ACCOUNT_COUNT, STEALTH_ACCOUNT_OFFSET};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const STORE_DIR_NAME: &str = "wallet.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown network: {0}")]
    InvalidNetwork(String),

    #[error("Account count must be between 1 and {max}, got {got}")]
    InvalidAccountCount { got: u32, max: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    Mainnet,
    #[default]
    Devnet,
}

impl NetworkMode {
    pub fn default_rpc_url(self) -> &'static str {
        match self {
            NetworkMode::Mainnet => "https://api.mainnet-beta.solana.com",
            NetworkMode::Devnet => "https://api.devnet.solana.com",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NetworkMode::Mainnet => "mainnet",
            NetworkMode::Devnet => "devnet",
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "mainnet-beta" => Ok(NetworkMode::Mainnet),
            "devnet" => Ok(NetworkMode::Devnet),
            other => Err(ConfigError::InvalidNetwork(other.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WalletConfig {
    #[serde(default)]
    pub network: NetworkMode,

    /// Falls back to the network's public endpoint when unset.
    #[serde(default)]
    pub rpc_url: Option<String>,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_account_count")]
    pub account_count: u32,

    /// Seconds of inactivity before the session locks itself. 0 disables.
    #[serde(default = "default_auto_lock_secs")]
    pub auto_lock_secs: u64,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".shade")
}

fn default_account_count() -> u32 {
    DEFAULT_ACCOUNT_COUNT
}

fn default_auto_lock_secs() -> u64 {
    300
}

impl Default for WalletConfig {
    fn default() -> Self {
        WalletConfig {
            network: NetworkMode::default(),
            rpc_url: None,
            data_dir: default_data_dir(),
            account_count: default_account_count(),
            auto_lock_secs: default_auto_lock_secs(),
        }
    }
}

impl WalletConfig {
    /// Load from the default location with environment overrides applied.
    ///
    /// A missing file yields the defaults; nothing is written.
    pub fn load() -> Result<Self, ConfigError> {
        let data_dir = std::env::var("SHADE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        let mut config = Self::load_from(data_dir.join(CONFIG_FILE_NAME))?;
        config.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: WalletConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn with_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `SHADE_*` overrides from an arbitrary lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(network) = lookup("SHADE_NETWORK") {
            self.network = network.parse()?;
        }
        if let Some(url) = lookup("SHADE_RPC_URL") {
            let url = url.trim();
            if !url.is_empty() {
                self.rpc_url = Some(url.to_string());
            }
        }
        if let Some(dir) = lookup("SHADE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account_count == 0 || self.account_count > STEALTH_ACCOUNT_OFFSET {
            return Err(ConfigError::InvalidAccountCount {
                got: self.account_count,
                max: STEALTH_ACCOUNT_OFFSET,
            });
        }
        Ok(())
    }

    pub fn rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_rpc_url())
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE_NAME)
    }

    /// Per-network sled directory.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(self.network.as_str()).join(STORE_DIR_NAME)
    }

    pub fn auto_lock_timeout(&self) -> Option<Duration> {
        match self.auto_lock_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
