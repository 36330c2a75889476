//! Program files: hex for execution, JSON for authoring

use std::path::Path;

use alloy_primitives::hex;
use anyhow::{Context, Result};
use packswap_engine::Program;

/// Parse hex text; whitespace is ignored and a `0x` prefix is optional
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).context("Program is not valid hex")
}

pub fn read_hex(path: &Path) -> Result<Vec<u8>> {
    let text = std::fs::read_to_string(path)
        .context(format!("Failed to read program: {}", path.display()))?;
    parse_hex(&text)
}

pub fn read_json(path: &Path) -> Result<Program> {
    let text = std::fs::read_to_string(path)
        .context(format!("Failed to read program source: {}", path.display()))?;
    serde_json::from_str(&text).context("Failed to parse program JSON")
}

pub fn to_hex(program: &Program) -> String {
    hex::encode_prefixed(program.encode())
}
