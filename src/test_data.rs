//! Shared fixtures and recording test doubles for the transformer
//! collaborators.

use crate::event::Event;
use crate::flip_kick::{FlipKick, FlipKickEntity, FlipKickModel};
use crate::records::Header;
use crate::transformer::{HeaderSource, LogConverter, LogFetcher, RecordRepository};
use crate::types::RawLog;
use alloy_primitives::{address, b256, Address, B256, U256};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

pub const FLIP_KICK_SIGNATURE_HEX: &str =
    "0xbac86238bdba81d21995024470425ecb370078fa62b7271b90cf28cbd1e3e87e";
pub const FLIP_KICK_BLOCK_NUMBER: u64 = 94;

pub fn flipper_address() -> Address {
    address!("08cb6176addcca2e1d1ffe21bee464e2a5eb6bd9")
}

fn gal() -> Address {
    address!("07fa9ef6609ca7921112231f8f195138ebba2977")
}

fn urn() -> B256 {
    b256!("00000000000000000000000007fa9ef6609ca7921112231f8f195138ebba2977")
}

const END: u64 = 1_535_991_025;

fn word(value: U256) -> [u8; 32] {
    value.to_be_bytes::<32>()
}

/// A `Kick` log as a node would return it.
pub fn eth_flip_kick_log() -> RawLog {
    let mut data = Vec::with_capacity(5 * 32);
    data.extend_from_slice(&word(U256::from(1_000_000_000_000_000_000u64))); // lot
    data.extend_from_slice(&word(U256::from(0u64))); // bid
    let mut gal_word = [0u8; 32];
    gal_word[12..].copy_from_slice(gal().as_slice());
    data.extend_from_slice(&gal_word);
    data.extend_from_slice(&word(U256::from(END)));
    data.extend_from_slice(&word(U256::from(50u64))); // tab

    RawLog {
        address: flipper_address(),
        topics: vec![
            FlipKick::signature_hash(),
            B256::from(word(U256::from(1u64))),
            urn(),
        ],
        data,
        block_number: FLIP_KICK_BLOCK_NUMBER,
        block_hash: b256!("32f8b12023b3a1b4c73f9a46da976931b0355714ada8b8044ebcb2cd295751a9"),
        transaction_hash: b256!("d11ab35cfb1ad71f790d3dd488cc1a2046080e765b150e8997aa0200947d4a9b"),
        transaction_index: 0,
        log_index: 3,
        removed: false,
    }
}

pub fn flip_kick_entity() -> FlipKickEntity {
    FlipKickEntity {
        id: U256::from(1u64),
        lot: U256::from(1_000_000_000_000_000_000u64),
        bid: U256::ZERO,
        gal: gal(),
        end: END,
        urn: urn(),
        tab: U256::from(50u64),
        raw: eth_flip_kick_log(),
    }
}

pub fn flip_kick_model() -> FlipKickModel {
    FlipKickModel {
        bid_id: "1".to_string(),
        lot: "1000000000000000000".to_string(),
        bid: "0".to_string(),
        gal: "0x07fa9ef6609ca7921112231f8f195138ebba2977".to_string(),
        end: END,
        urn: "0x00000000000000000000000007fa9ef6609ca7921112231f8f195138ebba2977".to_string(),
        tab: "50".to_string(),
        transaction_index: 0,
        log_index: 3,
        raw: serde_json::to_vec(&eth_flip_kick_log()).unwrap(),
    }
}

// ─────────────────────────────────────────────────────────────────
// Header source
// ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct HeaderSourceState {
    headers: Vec<Header>,
    error: Option<String>,
    requested_ranges: Vec<(u64, u64)>,
}

#[derive(Default)]
pub struct MockHeaderSource {
    state: Mutex<HeaderSourceState>,
}

impl MockHeaderSource {
    pub fn set_headers_to_return(&self, headers: Vec<Header>) {
        self.state.lock().unwrap().headers = headers;
    }

    pub fn set_missing_headers_error(&self, message: &str) {
        self.state.lock().unwrap().error = Some(message.to_string());
    }

    pub fn requested_ranges(&self) -> Vec<(u64, u64)> {
        self.state.lock().unwrap().requested_ranges.clone()
    }
}

impl HeaderSource<FlipKick> for MockHeaderSource {
    fn missing_headers(&self, starting: u64, ending: u64) -> Result<Vec<Header>> {
        let mut state = self.state.lock().unwrap();
        state.requested_ranges.push((starting, ending));
        if let Some(message) = &state.error {
            anyhow::bail!("{}", message);
        }
        Ok(state.headers.clone())
    }
}

// ─────────────────────────────────────────────────────────────────
// Log fetcher
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct FetchCall {
    pub contract_address: Address,
    pub topics: Vec<Vec<B256>>,
    pub block_number: u64,
}

#[derive(Default)]
struct FetcherState {
    logs: Vec<RawLog>,
    logs_by_block: HashMap<u64, Vec<RawLog>>,
    error: Option<String>,
    errors_by_block: HashMap<u64, String>,
    calls: Vec<FetchCall>,
}

/// Returns the same logs for every block unless overridden per block.
#[derive(Default)]
pub struct MockLogFetcher {
    state: Mutex<FetcherState>,
}

impl MockLogFetcher {
    pub fn set_fetched_logs(&self, logs: Vec<RawLog>) {
        self.state.lock().unwrap().logs = logs;
    }

    pub fn set_logs_for_block(&self, block_number: u64, logs: Vec<RawLog>) {
        self.state
            .lock()
            .unwrap()
            .logs_by_block
            .insert(block_number, logs);
    }

    pub fn set_fetcher_error(&self, message: &str) {
        self.state.lock().unwrap().error = Some(message.to_string());
    }

    pub fn fail_for_block(&self, block_number: u64, message: &str) {
        self.state
            .lock()
            .unwrap()
            .errors_by_block
            .insert(block_number, message.to_string());
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl LogFetcher for MockLogFetcher {
    async fn fetch_logs(
        &self,
        contract_address: Address,
        topics: &[Vec<B256>],
        block_number: u64,
    ) -> Result<Vec<RawLog>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(FetchCall {
            contract_address,
            topics: topics.to_vec(),
            block_number,
        });
        if let Some(message) = state
            .errors_by_block
            .get(&block_number)
            .or(state.error.as_ref())
        {
            anyhow::bail!("{}", message);
        }
        Ok(state
            .logs_by_block
            .get(&block_number)
            .unwrap_or(&state.logs)
            .clone())
    }
}

// ─────────────────────────────────────────────────────────────────
// Converter
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertCall {
    pub contract_address: Address,
    pub contract_abi: String,
    pub logs: Vec<RawLog>,
}

#[derive(Default)]
struct ConverterState {
    entities: Option<Vec<FlipKickEntity>>,
    error: Option<String>,
    calls: Vec<ConvertCall>,
}

/// Returns the fixture entity once per log unless told otherwise.
#[derive(Default)]
pub struct MockFlipKickConverter {
    state: Mutex<ConverterState>,
}

impl MockFlipKickConverter {
    pub fn set_entities_to_return(&self, entities: Vec<FlipKickEntity>) {
        self.state.lock().unwrap().entities = Some(entities);
    }

    pub fn set_converter_error(&self, message: &str) {
        self.state.lock().unwrap().error = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<ConvertCall> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl LogConverter<FlipKick> for MockFlipKickConverter {
    fn to_entities(
        &self,
        contract_address: Address,
        contract_abi: &str,
        logs: &[RawLog],
    ) -> Result<Vec<FlipKickEntity>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ConvertCall {
            contract_address,
            contract_abi: contract_abi.to_string(),
            logs: logs.to_vec(),
        });
        if let Some(message) = &state.error {
            anyhow::bail!("{}", message);
        }
        Ok(match &state.entities {
            Some(entities) => entities.clone(),
            None => logs.iter().map(|_| flip_kick_entity()).collect(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Repository
// ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RepositoryState {
    header_ids: Vec<u64>,
    created: Vec<FlipKickModel>,
    checked: Vec<u64>,
    error: Option<String>,
    errors_by_header: HashMap<u64, String>,
    errors_by_log: HashMap<u64, String>,
}

/// Records successful writes only.
#[derive(Default)]
pub struct MockRecordRepository {
    state: Mutex<RepositoryState>,
}

impl MockRecordRepository {
    pub fn set_create_record_error(&self, message: &str) {
        self.state.lock().unwrap().error = Some(message.to_string());
    }

    pub fn fail_for_header(&self, header_id: u64, message: &str) {
        self.state
            .lock()
            .unwrap()
            .errors_by_header
            .insert(header_id, message.to_string());
    }

    pub fn fail_for_log(&self, log_index: u64, message: &str) {
        self.state
            .lock()
            .unwrap()
            .errors_by_log
            .insert(log_index, message.to_string());
    }

    pub fn header_ids(&self) -> Vec<u64> {
        self.state.lock().unwrap().header_ids.clone()
    }

    pub fn created(&self) -> Vec<FlipKickModel> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn checked(&self) -> Vec<u64> {
        self.state.lock().unwrap().checked.clone()
    }
}

impl RecordRepository<FlipKick> for MockRecordRepository {
    fn create_record(&self, header_id: u64, model: &<FlipKick as Event>::Model) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state
            .errors_by_header
            .get(&header_id)
            .or_else(|| state.errors_by_log.get(&model.log_index))
            .or(state.error.as_ref())
        {
            anyhow::bail!("{}", message);
        }
        state.header_ids.push(header_id);
        state.created.push(model.clone());
        Ok(())
    }

    fn mark_header_checked(&self, header_id: u64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.error {
            anyhow::bail!("{}", message);
        }
        state.checked.push(header_id);
        Ok(())
    }
}
