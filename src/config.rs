//! Transformer configuration loading
//!
//! A config file is JSON:
//!
//! ```json
//! {
//!   "contract_address": "0x08cb6176addcca2e1d1ffe21bee464e2a5eb6bd9",
//!   "contract_abi_path": "flipper.abi.json",
//!   "topics": ["0xbac86238bdba81d21995024470425ecb370078fa62b7271b90cf28cbd1e3e87e"],
//!   "starting_block_number": 8928152,
//!   "ending_block_number": 8928200
//! }
//! ```
//!
//! The ABI is given inline as `contract_abi` or as a file path relative to
//! the config file. `topics` defaults to the FlipKick signature hash.

use crate::event::Event;
use crate::flip_kick::FlipKick;
use crate::transformer::TransformerConfig;
use alloy_primitives::Address;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    contract_address: Address,
    #[serde(default)]
    contract_abi: Option<String>,
    #[serde(default)]
    contract_abi_path: Option<PathBuf>,
    #[serde(default)]
    topics: Option<Vec<String>>,
    starting_block_number: u64,
    ending_block_number: u64,
}

/// Load a FlipKick transformer config from a JSON file.
pub fn load_config(path: &Path) -> Result<TransformerConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let file: ConfigFile = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid config file: {:?}", path))?;

    let contract_abi = match (file.contract_abi, file.contract_abi_path) {
        (Some(abi), None) => abi,
        (None, Some(abi_path)) => {
            let abi_path = match path.parent() {
                Some(dir) if abi_path.is_relative() => dir.join(abi_path),
                _ => abi_path,
            };
            fs::read_to_string(&abi_path)
                .with_context(|| format!("Failed to read contract ABI: {:?}", abi_path))?
        }
        (Some(_), Some(_)) => {
            anyhow::bail!("Set only one of contract_abi and contract_abi_path")
        }
        (None, None) => anyhow::bail!("One of contract_abi or contract_abi_path is required"),
    };

    let topics = file
        .topics
        .unwrap_or_else(|| vec![format!("0x{:x}", FlipKick::signature_hash())]);

    Ok(TransformerConfig {
        contract_address: file.contract_address,
        contract_abi,
        topics,
        starting_block_number: file.starting_block_number,
        ending_block_number: file.ending_block_number,
    })
}
