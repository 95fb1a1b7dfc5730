//! Event descriptors
//!
//! A transformer handles exactly one contract event. Everything that differs
//! between events (names, signature, entity and model shapes, and the
//! mappings between them) lives behind the [`Event`] trait, so one generic
//! pipeline serves every event type.

use crate::abi::DecodedLog;
use crate::types::RawLog;
use alloy_primitives::{keccak256, B256};
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Descriptor for one contract event.
pub trait Event: Send + Sync + 'static {
    /// Label used in error messages and storage keys (e.g. `FlipKick`).
    const NAME: &'static str;

    /// Name of the event inside the contract ABI (e.g. `Kick`).
    const ABI_NAME: &'static str;

    /// Canonical Solidity signature.
    const SIGNATURE: &'static str;

    /// Typed in-memory form of one decoded log.
    type Entity: Debug + Clone + PartialEq + Send + Sync;

    /// Storage-shaped projection of an entity.
    type Model: Debug + Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync;

    /// keccak256 of [`Event::SIGNATURE`], the topic0 of every matching log.
    fn signature_hash() -> B256 {
        keccak256(Self::SIGNATURE.as_bytes())
    }

    /// Build an entity from a decoded log and the log it came from.
    fn to_entity(decoded: &DecodedLog, raw: &RawLog) -> Result<Self::Entity>;

    /// Project an entity into its persistable model.
    fn to_model(entity: Self::Entity) -> Result<Self::Model>;

    /// Distinguishes several occurrences of the event under one header.
    fn occurrence(model: &Self::Model) -> u64;
}
