//! Event ABI lookup and log decoding
//!
//! Finds one event in a JSON contract ABI and decodes raw logs against it
//! with alloy's dynamic ABI decoder.

use crate::types::RawLog;
use alloy_dyn_abi::{DynSolValue, EventExt};
use alloy_json_abi::{Event as AbiEvent, JsonAbi};
use alloy_primitives::{Address, B256, U256};
use anyhow::{Context, Result};

/// An event definition taken from a contract ABI.
#[derive(Debug, Clone)]
pub struct EventAbi {
    event: AbiEvent,
}

/// A log decoded against an [`EventAbi`], values in ABI parameter order.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLog {
    pub values: Vec<(String, DynSolValue)>,
}

impl EventAbi {
    /// Parse a JSON contract ABI and pick out the event called `name`.
    pub fn from_json(abi: &str, name: &str) -> Result<Self> {
        let abi: JsonAbi = serde_json::from_str(abi).context("Invalid contract ABI JSON")?;
        let event = match abi.event(name).map(Vec::as_slice) {
            Some([event]) => event.clone(),
            Some([]) | None => anyhow::bail!("Event '{}' not found in contract ABI", name),
            Some(_) => anyhow::bail!("Event '{}' is overloaded in contract ABI", name),
        };
        Ok(Self { event })
    }

    pub fn name(&self) -> &str {
        &self.event.name
    }

    /// Canonical signature, e.g. `Transfer(address,address,uint256)`.
    pub fn signature(&self) -> String {
        self.event.signature()
    }

    /// keccak256 of the signature.
    pub fn topic0(&self) -> B256 {
        self.event.selector()
    }

    /// Decode a log's topics and data into named values.
    pub fn decode(&self, log: &RawLog) -> Result<DecodedLog> {
        let indexed_count = self.event.inputs.iter().filter(|p| p.indexed).count();
        let expected_topics = indexed_count + usize::from(!self.event.anonymous);
        if log.topics.len() != expected_topics {
            anyhow::bail!(
                "{} expects {} topics, log has {}",
                self.event.name,
                expected_topics,
                log.topics.len()
            );
        }
        if !self.event.anonymous && log.topic0() != Some(self.topic0()) {
            anyhow::bail!(
                "Log topic0 {:?} does not match {}",
                log.topic0(),
                self.signature()
            );
        }

        let decoded = self
            .event
            .decode_log_parts(log.topics.iter().copied(), &log.data)
            .with_context(|| format!("Failed to decode {} log", self.event.name))?;

        let mut indexed = decoded.indexed.into_iter();
        let mut body = decoded.body.into_iter();
        let values = self
            .event
            .inputs
            .iter()
            .map(|param| {
                let value = if param.indexed {
                    indexed.next()
                } else {
                    body.next()
                };
                value
                    .map(|v| (param.name.clone(), v))
                    .with_context(|| format!("No decoded value for '{}'", param.name))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DecodedLog { values })
    }
}

impl DecodedLog {
    /// Value of the parameter called `name`.
    pub fn value(&self, name: &str) -> Result<&DynSolValue> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .with_context(|| format!("No parameter named '{}'", name))
    }

    pub fn uint(&self, name: &str) -> Result<U256> {
        match self.value(name)? {
            DynSolValue::Uint(value, _) => Ok(*value),
            other => anyhow::bail!("Parameter '{}' is not a uint: {:?}", name, other),
        }
    }

    pub fn address(&self, name: &str) -> Result<Address> {
        match self.value(name)? {
            DynSolValue::Address(address) => Ok(*address),
            other => anyhow::bail!("Parameter '{}' is not an address: {:?}", name, other),
        }
    }

    /// A `bytesN` value, left-aligned in a 32-byte word.
    pub fn fixed_bytes(&self, name: &str) -> Result<B256> {
        match self.value(name)? {
            DynSolValue::FixedBytes(word, _) => Ok(*word),
            other => anyhow::bail!("Parameter '{}' is not fixed bytes: {:?}", name, other),
        }
    }
}
