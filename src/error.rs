//! Transformer error types.

use std::fmt;
use thiserror::Error;

use crate::records::Header;

/// Pipeline stage a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Convert,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch => write!(f, "fetch"),
            Stage::Convert => write!(f, "convert"),
            Stage::Persist => write!(f, "persist"),
        }
    }
}

/// One failed step for one header (or for the whole batch when no single
/// header can be blamed).
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub header_id: Option<u64>,
    pub block_number: Option<u64>,
    pub error: anyhow::Error,
}

impl StageFailure {
    pub fn for_header(stage: Stage, header: &Header, error: anyhow::Error) -> Self {
        Self {
            stage,
            header_id: Some(header.id),
            block_number: Some(header.block_number),
            error,
        }
    }

    pub fn for_batch(stage: Stage, error: anyhow::Error) -> Self {
        Self {
            stage,
            header_id: None,
            block_number: None,
            error,
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(id), Some(block)) = (self.header_id, self.block_number) {
            write!(f, "header {} (block {}): ", id, block)?;
        }
        write!(f, "{} failed: {:#}", self.stage, self.error)
    }
}

/// Every failure collected during one run, in the order they happened.
#[derive(Debug, Default)]
pub struct StageFailures(pub Vec<StageFailure>);

impl StageFailures {
    pub fn push(&mut self, failure: StageFailure) {
        self.0.push(failure);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StageFailure> {
        self.0.iter()
    }
}

impl fmt::Display for StageFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("transformer for {event} has no configuration")]
    NotConfigured { event: &'static str },

    #[error("invalid {event} transformer configuration: {reason}")]
    InvalidConfig { event: &'static str, reason: String },

    /// The header lookup failed; nothing was processed.
    #[error("failed to get missing headers for {event}: {source:#}")]
    MissingHeaders {
        event: &'static str,
        source: anyhow::Error,
    },

    /// At least one header failed at the fetch, convert or persist stage.
    #[error("error(s) transforming {event} event logs: {failures}")]
    Stages {
        event: &'static str,
        failures: StageFailures,
    },
}

impl TransformError {
    /// Collected stage failures, empty for the other variants.
    pub fn failures(&self) -> &[StageFailure] {
        match self {
            TransformError::Stages { failures, .. } => &failures.0,
            _ => &[],
        }
    }
}
