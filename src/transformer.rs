//! Event transformer
//!
//! For one event type: find the stored headers in a block range that have no
//! record yet, fetch the matching logs for each header's block, decode them
//! into entities, and persist one model per log linked to its header.
//!
//! A run is a single best-effort pass. The header lookup failing aborts the
//! run; failures at later stages are collected per header and reported
//! together once every header has been tried.

use crate::error::{Stage, StageFailure, StageFailures, TransformError};
use crate::event::Event;
use crate::records::Header;
use crate::types::{parse_b256_padded, RawLog};
use alloy_primitives::{Address, B256};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Supplies stored headers that have no record of event `E` yet.
pub trait HeaderSource<E: Event>: Send + Sync {
    /// Headers with `starting <= block_number <= ending` not yet marked
    /// checked for `E`, ordered by block number.
    fn missing_headers(
        &self,
        starting_block_number: u64,
        ending_block_number: u64,
    ) -> Result<Vec<Header>>;
}

/// Fetches raw logs from the chain.
#[async_trait]
pub trait LogFetcher: Send + Sync {
    /// Logs emitted by `contract_address` in block `block_number` matching
    /// `topics`, one OR-group per topic position.
    async fn fetch_logs(
        &self,
        contract_address: Address,
        topics: &[Vec<B256>],
        block_number: u64,
    ) -> Result<Vec<RawLog>>;
}

/// Decodes raw logs into entities of event `E`.
pub trait LogConverter<E: Event>: Send + Sync {
    /// One entity per log, in the same order. Fails if any log does not
    /// decode.
    fn to_entities(
        &self,
        contract_address: Address,
        contract_abi: &str,
        logs: &[RawLog],
    ) -> Result<Vec<E::Entity>>;
}

/// Persists models of event `E`.
pub trait RecordRepository<E: Event>: Send + Sync {
    /// Store `model` for `header_id`. Writing the same model twice is a no-op.
    fn create_record(&self, header_id: u64, model: &E::Model) -> Result<()>;

    /// Remember that every matching log of `header_id` has been stored, or
    /// that it had none.
    fn mark_header_checked(&self, header_id: u64) -> Result<()>;
}

/// What a transformer processes on each run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformerConfig {
    pub contract_address: Address,
    pub contract_abi: String,
    /// Hex topics, matched as OR-alternatives at position 0
    pub topics: Vec<String>,
    pub starting_block_number: u64,
    pub ending_block_number: u64,
}

impl TransformerConfig {
    /// Topic filter sent to the fetcher: a single row with the hash of each
    /// configured topic, in configured order.
    pub fn topic_filter(&self) -> Result<Vec<Vec<B256>>, String> {
        if self.topics.is_empty() {
            return Err("at least one topic is required".to_string());
        }
        let row = self
            .topics
            .iter()
            .map(|topic| {
                parse_b256_padded(topic).map_err(|e| format!("invalid topic {}: {}", topic, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(vec![row])
    }
}

/// A configured run: the config plus its precomputed topic filter.
struct Configured {
    config: TransformerConfig,
    topics: Vec<Vec<B256>>,
}

/// Drives the fetch / convert / persist pipeline for event `E`.
pub struct Transformer<E: Event> {
    headers: Arc<dyn HeaderSource<E>>,
    fetcher: Arc<dyn LogFetcher>,
    converter: Arc<dyn LogConverter<E>>,
    repository: Arc<dyn RecordRepository<E>>,
    configured: Option<Configured>,
}

impl<E: Event> Transformer<E> {
    pub fn new(
        headers: Arc<dyn HeaderSource<E>>,
        fetcher: Arc<dyn LogFetcher>,
        converter: Arc<dyn LogConverter<E>>,
        repository: Arc<dyn RecordRepository<E>>,
    ) -> Self {
        Self {
            headers,
            fetcher,
            converter,
            repository,
            configured: None,
        }
    }

    /// Set the configuration used by [`Transformer::execute`].
    pub fn set_config(&mut self, config: TransformerConfig) -> Result<(), TransformError> {
        let invalid = |reason: String| TransformError::InvalidConfig {
            event: E::NAME,
            reason,
        };

        if config.starting_block_number > config.ending_block_number {
            return Err(invalid(format!(
                "starting block {} is after ending block {}",
                config.starting_block_number, config.ending_block_number
            )));
        }
        let topics = config.topic_filter().map_err(invalid)?;

        self.configured = Some(Configured { config, topics });
        Ok(())
    }

    pub fn config(&self) -> Option<&TransformerConfig> {
        self.configured.as_ref().map(|c| &c.config)
    }

    /// Run one pass over the configured block range.
    ///
    /// Records are persisted for every header that succeeds end to end, even
    /// when other headers fail. A header is marked checked only once all of
    /// its logs are stored, so a partly stored header is offered again.
    /// Conversion is batched over the whole run, so a failed conversion means
    /// no records are written from this run.
    pub async fn execute(&self) -> Result<(), TransformError> {
        let Configured { config, topics } = self
            .configured
            .as_ref()
            .ok_or(TransformError::NotConfigured { event: E::NAME })?;

        let headers = self
            .headers
            .missing_headers(config.starting_block_number, config.ending_block_number)
            .map_err(|source| TransformError::MissingHeaders {
                event: E::NAME,
                source,
            })?;

        info!(
            "{}: {} missing headers in blocks {} to {}",
            E::NAME,
            headers.len(),
            config.starting_block_number,
            config.ending_block_number
        );

        let mut failures = StageFailures::default();

        // Fetch per header, remembering which logs came from which header
        let mut fetched: Vec<(&Header, usize)> = Vec::new();
        let mut logs: Vec<RawLog> = Vec::new();
        for header in &headers {
            match self
                .fetcher
                .fetch_logs(config.contract_address, topics, header.block_number)
                .await
            {
                Ok(mut header_logs) => {
                    let fetched_count = header_logs.len();
                    header_logs.retain(|log| !log.removed);
                    if header_logs.len() < fetched_count {
                        debug!(
                            "{}: skipped {} removed logs in block {}",
                            E::NAME,
                            fetched_count - header_logs.len(),
                            header.block_number
                        );
                    }
                    if header_logs.is_empty() {
                        debug!("{}: no logs in block {}", E::NAME, header.block_number);
                        if let Err(e) = self.repository.mark_header_checked(header.id) {
                            failures.push(StageFailure::for_header(Stage::Persist, header, e));
                        }
                        continue;
                    }
                    debug!(
                        "{}: {} logs in block {}",
                        E::NAME,
                        header_logs.len(),
                        header.block_number
                    );
                    fetched.push((header, header_logs.len()));
                    logs.extend(header_logs);
                }
                Err(e) => failures.push(StageFailure::for_header(Stage::Fetch, header, e)),
            }
        }

        let mut created = 0usize;
        if !logs.is_empty() {
            match self.convert(config, &logs) {
                Ok(entities) => {
                    let mut entities = entities.into_iter();
                    for (header, count) in fetched {
                        let mut complete = true;
                        for entity in entities.by_ref().take(count) {
                            let model = match E::to_model(entity) {
                                Ok(model) => model,
                                Err(e) => {
                                    failures.push(StageFailure::for_header(
                                        Stage::Convert,
                                        header,
                                        e,
                                    ));
                                    complete = false;
                                    continue;
                                }
                            };
                            match self.repository.create_record(header.id, &model) {
                                Ok(()) => created += 1,
                                Err(e) => {
                                    failures.push(StageFailure::for_header(
                                        Stage::Persist,
                                        header,
                                        e,
                                    ));
                                    complete = false;
                                }
                            }
                        }
                        if complete {
                            if let Err(e) = self.repository.mark_header_checked(header.id) {
                                failures.push(StageFailure::for_header(Stage::Persist, header, e));
                            }
                        }
                    }
                }
                Err(e) => failures.push(StageFailure::for_batch(Stage::Convert, e)),
            }
        }

        for failure in failures.iter() {
            warn!("{}: {}", E::NAME, failure);
        }
        info!(
            "{}: created {} records from {} logs, {} failures",
            E::NAME,
            created,
            logs.len(),
            failures.len()
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TransformError::Stages {
                event: E::NAME,
                failures,
            })
        }
    }

    /// Batched conversion; the converter must hand back one entity per log.
    fn convert(&self, config: &TransformerConfig, logs: &[RawLog]) -> Result<Vec<E::Entity>> {
        let entities =
            self.converter
                .to_entities(config.contract_address, &config.contract_abi, logs)?;
        if entities.len() != logs.len() {
            anyhow::bail!(
                "converter returned {} entities for {} logs",
                entities.len(),
                logs.len()
            );
        }
        Ok(entities)
    }
}
