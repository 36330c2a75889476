//! Runner configuration

use std::path::{Path, PathBuf};

use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use packswap_engine::FeeSettings;
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "PACKSWAP_CONFIG";

/// Config file used when neither a flag nor the environment names one
pub const DEFAULT_CONFIG_PATH: &str = "packswap.toml";

/// Initial token balance seeded into a fresh state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSeed {
    pub token: Address,
    pub holder: Address,
    pub amount: U256,

    /// Also approve the engine to pull the whole amount
    #[serde(default)]
    pub approve: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Address the engine holds tokens under
    pub engine_address: Address,

    /// Only identity allowed to change fee settings
    pub admin: Address,

    /// Default caller for `run`
    pub caller: Address,

    /// State snapshot (pools and balances), `~` is expanded
    pub state_path: String,

    /// Clock used for permit deadlines
    pub now: u64,

    pub fees: FeeSettings,

    /// Balances for a fresh state; ignored once the state file exists
    #[serde(default)]
    pub balances: Vec<BalanceSeed>,
}

impl Config {
    /// Config path from the flag, then the environment, then the default
    pub fn resolve_path(path: Option<&Path>) -> PathBuf {
        match path {
            Some(path) => path.to_path_buf(),
            None => std::env::var(CONFIG_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&config_str).context("Failed to parse config TOML")?;

        config
            .fees
            .validate()
            .context("Invalid fee settings in config")?;

        Ok(config)
    }

    /// Local simulation defaults: two tokens funded and approved for the caller
    pub fn default_local() -> Self {
        let caller = Address::repeat_byte(0xa1);
        let amount = U256::from(1_000_000_000_000_000_000_000u128);

        Self {
            engine_address: Address::repeat_byte(0xee),
            admin: Address::repeat_byte(0xad),
            caller,
            state_path: "~/.packswap/state.json".to_string(),
            now: 0,
            fees: FeeSettings::default(),
            balances: [1u8, 2]
                .into_iter()
                .map(|b| BalanceSeed {
                    token: Address::with_last_byte(b),
                    holder: caller,
                    amount,
                    approve: true,
                })
                .collect(),
        }
    }

    /// Write default config to file
    pub fn write_default(path: &Path) -> Result<()> {
        let config = Self::default_local();
        let toml_str = toml::to_string_pretty(&config).context("Failed to serialize config")?;

        std::fs::write(path, toml_str)
            .context(format!("Failed to write config to {}", path.display()))?;

        log::info!("Created default config at {}", path.display());
        Ok(())
    }

    /// State path with `~` expanded
    pub fn state_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.state_path).as_ref())
    }
}
