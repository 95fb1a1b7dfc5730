//! FlipKick event
//!
//! Emitted by a Maker flip auction contract when a new collateral auction
//! is kicked off.

use crate::abi::DecodedLog;
use crate::event::Event;
use crate::types::RawLog;
use alloy_primitives::{Address, B256, U256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// ABI fragment for the flipper `Kick` event.
pub const FLIP_KICK_ABI: &str = r#"[
  {
    "type": "event",
    "name": "Kick",
    "anonymous": false,
    "inputs": [
      {"name": "id", "type": "uint256", "indexed": true},
      {"name": "lot", "type": "uint256", "indexed": false},
      {"name": "bid", "type": "uint256", "indexed": false},
      {"name": "gal", "type": "address", "indexed": false},
      {"name": "end", "type": "uint48", "indexed": false},
      {"name": "urn", "type": "bytes32", "indexed": true},
      {"name": "tab", "type": "uint256", "indexed": false}
    ]
  }
]"#;

/// Descriptor for the flipper `Kick` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlipKick;

/// Decoded `Kick` log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlipKickEntity {
    /// Auction (bid) id
    pub id: U256,
    /// Collateral up for auction
    pub lot: U256,
    /// Starting bid
    pub bid: U256,
    /// Recipient of auction income
    pub gal: Address,
    /// Auction expiry (unix seconds)
    pub end: u64,
    /// CDP the collateral came from
    pub urn: B256,
    /// Debt to be covered
    pub tab: U256,
    pub raw: RawLog,
}

/// Storage row for one `Kick` occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlipKickModel {
    pub bid_id: String,
    pub lot: String,
    pub bid: String,
    pub gal: String,
    pub end: u64,
    pub urn: String,
    pub tab: String,
    pub transaction_index: u64,
    pub log_index: u64,
    /// JSON of the originating log
    pub raw: Vec<u8>,
}

impl Event for FlipKick {
    const NAME: &'static str = "FlipKick";
    const ABI_NAME: &'static str = "Kick";
    const SIGNATURE: &'static str =
        "Kick(uint256,uint256,uint256,address,uint48,bytes32,uint256)";

    type Entity = FlipKickEntity;
    type Model = FlipKickModel;

    fn to_entity(decoded: &DecodedLog, raw: &RawLog) -> Result<FlipKickEntity> {
        let end = decoded.uint("end")?;
        let end = u64::try_from(end).map_err(|_| anyhow::anyhow!("Kick end {} out of range", end))?;

        Ok(FlipKickEntity {
            id: decoded.uint("id")?,
            lot: decoded.uint("lot")?,
            bid: decoded.uint("bid")?,
            gal: decoded.address("gal")?,
            end,
            urn: decoded.fixed_bytes("urn")?,
            tab: decoded.uint("tab")?,
            raw: raw.clone(),
        })
    }

    fn to_model(entity: FlipKickEntity) -> Result<FlipKickModel> {
        let raw = serde_json::to_vec(&entity.raw).context("Failed to serialize raw log")?;

        Ok(FlipKickModel {
            bid_id: entity.id.to_string(),
            lot: entity.lot.to_string(),
            bid: entity.bid.to_string(),
            gal: format!("0x{:x}", entity.gal),
            end: entity.end,
            urn: format!("0x{:x}", entity.urn),
            tab: entity.tab.to_string(),
            transaction_index: entity.raw.transaction_index,
            log_index: entity.raw.log_index,
            raw,
        })
    }

    fn occurrence(model: &FlipKickModel) -> u64 {
        model.log_index
    }
}
