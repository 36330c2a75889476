//! Packswap runner
//!
//! Off-chain driver for the engine: loads a config and a persisted state,
//! executes hex-encoded programs against the in-memory host, and saves the
//! result only when the execution commits.

mod config;
mod program;
mod state;

use std::path::{Path, PathBuf};

use alloy_primitives::Address;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use packswap_engine::{Engine, Program};
use state::Snapshot;

#[derive(Parser)]
#[command(name = "packswap")]
#[command(about = "Execute packed AMM programs against a local simulated state", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: $PACKSWAP_CONFIG, then ./packswap.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    InitConfig {
        /// Output path
        #[arg(default_value = config::DEFAULT_CONFIG_PATH)]
        path: PathBuf,
    },

    /// Execute a hex-encoded program and persist the committed state
    Run {
        /// Program file (hex, optional 0x prefix)
        program: PathBuf,

        /// Caller identity (overrides the config)
        #[arg(long)]
        caller: Option<Address>,

        /// Execute without saving the resulting state
        #[arg(long)]
        dry_run: bool,
    },

    /// Decode a hex-encoded program and print its operations as JSON
    Disasm {
        program: PathBuf,
    },

    /// Encode a JSON program description as hex
    Assemble {
        /// JSON file with `ledger_capacity` and `operations`
        source: PathBuf,

        /// Write the hex here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print every pool in the persisted state
    Pools,

    /// Print every non-zero balance in the persisted state
    Balances,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_path = Config::resolve_path(cli.config.as_deref());

    match cli.command {
        Commands::InitConfig { path } => Config::write_default(&path),
        Commands::Run {
            program,
            caller,
            dry_run,
        } => {
            let config = load_config(&config_path);
            run(&config, &program, caller.unwrap_or(config.caller), dry_run)
        }
        Commands::Disasm { program } => {
            let bytes = program::read_hex(&program)?;
            let decoded = Program::decode(&bytes)
                .map_err(|e| anyhow::anyhow!("{} ({:?})", e, e.class()))?;
            println!("{}", serde_json::to_string_pretty(&decoded)?);
            Ok(())
        }
        Commands::Assemble { source, output } => {
            let program = program::read_json(&source)?;
            let hex = program::to_hex(&program);
            match output {
                Some(path) => std::fs::write(&path, format!("{}\n", hex))
                    .context(format!("Failed to write {}", path.display())),
                None => {
                    println!("{}", hex);
                    Ok(())
                }
            }
        }
        Commands::Pools => {
            let config = load_config(&config_path);
            let snapshot = Snapshot::load_or_seed(&config.state_path(), &config)?;
            println!("{}", serde_json::to_string_pretty(&snapshot.pools)?);
            Ok(())
        }
        Commands::Balances => {
            let config = load_config(&config_path);
            let snapshot = Snapshot::load_or_seed(&config.state_path(), &config)?;
            for (token, holder, amount) in snapshot.host.balances() {
                println!("{} {} {}", token, holder, amount);
            }
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Config {
    Config::load(path).unwrap_or_else(|e| {
        log::warn!("Failed to load config ({:#}), using local defaults", e);
        Config::default_local()
    })
}

/// Execute one program; the host is restored and nothing is saved on failure
fn run(config: &Config, program: &Path, caller: Address, dry_run: bool) -> Result<()> {
    let bytes = program::read_hex(program)?;
    let state_path = config.state_path();
    let mut snapshot = Snapshot::load_or_seed(&state_path, config)?;

    let engine = Engine::new(config.engine_address, config.admin, config.fees)
        .context("Invalid engine configuration")?
        .with_pools(snapshot.pools.clone());

    let mut host = snapshot.host.clone();
    host.set_now(config.now);

    log::info!(
        "Executing {} ({} bytes) as {}",
        program.display(),
        bytes.len(),
        caller
    );

    let receipt = match engine.execute(caller, &bytes, &mut host) {
        Ok(receipt) => receipt,
        Err(e) => {
            // `host` is dropped; the persisted balances are untouched
            anyhow::bail!("Execution failed ({:?}): {}", e.class(), e);
        }
    };

    println!("{}", serde_json::to_string_pretty(&receipt)?);

    if dry_run {
        log::info!("Dry run, state not saved");
        return Ok(());
    }

    snapshot.pools = engine.pools_snapshot()?;
    snapshot.host = host;
    snapshot.save(&state_path)?;
    log::info!("State saved to {}", state_path.display());
    Ok(())
}
