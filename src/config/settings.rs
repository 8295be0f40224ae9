use crate::core::BLOCK_REWARD;
use crate::error::{BlockchainError, Result};
use crate::network::{NodeOptions, MAX_FRAME_SIZE};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

static DEFAULT_NODE_ADDR: &str = "127.0.0.1:9000";
static DEFAULT_DB_PATH: &str = "chaingo.db";
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

const CONFIG_FILE_KEY: &str = "CHAINGO_CONFIG";
const NODE_ADDRESS_KEY: &str = "NODE_ADDRESS";
const DB_PATH_KEY: &str = "CHAINGO_DB";

/// Node settings. Layered as defaults, then the TOML file named by
/// `CHAINGO_CONFIG`, then `NODE_ADDRESS` / `CHAINGO_DB`, then CLI flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node_addr: String,
    pub db_path: PathBuf,
    pub max_frame_size: usize,
    pub connect_timeout_ms: u64,
    pub block_reward: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            node_addr: String::from(DEFAULT_NODE_ADDR),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            max_frame_size: MAX_FRAME_SIZE,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            block_reward: BLOCK_REWARD,
        }
    }
}

impl Config {
    /// Reads the environment: optional config file first, then overrides
    pub fn load() -> Result<Config> {
        let mut config = match env::var(CONFIG_FILE_KEY) {
            Ok(path) => Config::from_file(path)?,
            Err(_) => Config::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Config::from_toml_str(&contents)
    }

    /// Missing keys keep their defaults
    pub fn from_toml_str(contents: &str) -> Result<Config> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup(NODE_ADDRESS_KEY) {
            self.node_addr = addr;
        }
        if let Some(path) = lookup(DB_PATH_KEY) {
            self.db_path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_addr.is_empty() {
            return Err(BlockchainError::Config("node_addr must not be empty".to_string()));
        }
        if self.max_frame_size == 0 {
            return Err(BlockchainError::Config(
                "max_frame_size must be positive".to_string(),
            ));
        }
        if self.block_reward <= 0 {
            return Err(BlockchainError::Config(
                "block_reward must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn node_options(&self) -> NodeOptions {
        NodeOptions {
            max_frame_size: self.max_frame_size,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }
}
