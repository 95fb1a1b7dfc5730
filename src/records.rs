//! Record types for stored header data
//!
//! Headers are written by upstream header tracking and read by transformers.
//! They use postcard for binary serialization, which is compact and deterministic.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Header record for one ingested block.
///
/// `id` is assigned by the header store when the header is inserted and
/// never changes afterwards. Event records link to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Store-assigned identifier
    pub id: u64,
    /// Block number
    pub block_number: u64,
    /// Block hash
    pub hash: B256,
    /// Raw header payload as received from the node (opaque)
    pub raw: Vec<u8>,
}
