//! ABI-backed log converter
//!
//! Decodes raw logs with the contract ABI and maps them through the event
//! descriptor into entities.

use crate::abi::EventAbi;
use crate::event::Event;
use crate::transformer::LogConverter;
use crate::types::RawLog;
use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::marker::PhantomData;

/// Converter for event `E` driven by the configured contract ABI.
pub struct AbiLogConverter<E> {
    _event: PhantomData<fn() -> E>,
}

impl<E: Event> AbiLogConverter<E> {
    pub fn new() -> Self {
        Self {
            _event: PhantomData,
        }
    }
}

impl<E: Event> Default for AbiLogConverter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> LogConverter<E> for AbiLogConverter<E> {
    fn to_entities(
        &self,
        contract_address: Address,
        contract_abi: &str,
        logs: &[RawLog],
    ) -> Result<Vec<E::Entity>> {
        let event = EventAbi::from_json(contract_abi, E::ABI_NAME)?;
        if event.signature() != E::SIGNATURE {
            anyhow::bail!(
                "ABI event {} does not match {} signature {}",
                event.signature(),
                E::NAME,
                E::SIGNATURE
            );
        }

        logs.iter()
            .map(|log| {
                if log.address != contract_address {
                    anyhow::bail!(
                        "Log {} in block {} was emitted by 0x{:x}, expected 0x{:x}",
                        log.log_index,
                        log.block_number,
                        log.address,
                        contract_address
                    );
                }
                if log.removed {
                    anyhow::bail!(
                        "Log {} in block {} was removed by a reorg",
                        log.log_index,
                        log.block_number
                    );
                }
                let decoded = event.decode(log).with_context(|| {
                    format!(
                        "Failed to decode {} log {} in block {}",
                        E::NAME,
                        log.log_index,
                        log.block_number
                    )
                })?;
                E::to_entity(&decoded, log)
            })
            .collect()
    }
}
