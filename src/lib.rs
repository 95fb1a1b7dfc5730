//! Maker event transformers
//!
//! Turns the logs of one contract event into persisted records, one per
//! log, each linked to the stored block header it was emitted in.

pub mod abi;
pub mod cli;
pub mod config;
pub mod converter;
pub mod error;
pub mod event;
pub mod flip_kick;
pub mod keys;
pub mod records;
pub mod rpc;
pub mod store;
pub mod transformer;
pub mod types;

#[cfg(test)]
mod test_data;

// Re-export the main types for convenience
pub use error::{Stage, StageFailure, TransformError};
pub use event::Event;
pub use flip_kick::{FlipKick, FlipKickEntity, FlipKickModel};
pub use records::Header;
pub use store::RocksEventStore;
pub use transformer::{
    HeaderSource, LogConverter, LogFetcher, RecordRepository, Transformer, TransformerConfig,
};
pub use types::RawLog;
