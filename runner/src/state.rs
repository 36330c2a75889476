//! Persisted simulation state: pools plus host balances

use std::path::Path;

use anyhow::{Context, Result};
use packswap_engine::{MemoryHost, Pool};
use serde::{Deserialize, Serialize};

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub pools: Vec<Pool>,
    pub host: MemoryHost,
}

impl Snapshot {
    /// Fresh state seeded from the config's balances
    pub fn seed(config: &Config) -> Self {
        let mut host = MemoryHost::new(config.engine_address);
        for seed in &config.balances {
            host.mint(seed.token, seed.holder, seed.amount);
            if seed.approve {
                host.approve(seed.token, seed.holder, seed.amount);
            }
        }
        Self {
            pools: Vec::new(),
            host,
        }
    }

    /// Read the state file, or seed a fresh state if there is none yet
    pub fn load_or_seed(path: &Path, config: &Config) -> Result<Self> {
        if !path.exists() {
            log::info!("No state at {}, seeding from config", path.display());
            return Ok(Self::seed(config));
        }

        let bytes = std::fs::read(path)
            .context(format!("Failed to read state file: {}", path.display()))?;
        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).context("Failed to parse state JSON")?;

        if snapshot.host.engine() != config.engine_address {
            anyhow::bail!(
                "State file belongs to engine {}, config names {}",
                snapshot.host.engine(),
                config.engine_address
            );
        }
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context(format!("Failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize state")?;
        std::fs::write(path, json)
            .context(format!("Failed to write state to {}", path.display()))?;
        log::debug!("Saved state to {}", path.display());
        Ok(())
    }
}
