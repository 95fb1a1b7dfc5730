//! JSON-RPC client for Ethereum nodes
//!
//! Provides the chain-backed log fetcher used by transformers.

use crate::transformer::LogFetcher;
use crate::types::RawLog;
use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

/// JSON-RPC client for Ethereum nodes.
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
}

impl RpcClient {
    /// Create a new RPC client.
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// Make a JSON-RPC call.
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .context("Failed to send RPC request")?;

        let json: Value = response
            .json()
            .await
            .context("Failed to parse RPC response")?;

        // Check for RPC error
        if let Some(error) = json.get("error") {
            anyhow::bail!("RPC error: {}", error);
        }

        // Extract result
        json.get("result")
            .cloned()
            .context("RPC response missing 'result' field")
    }

    /// Get the logs emitted by `address` in exactly one block.
    pub async fn get_logs(
        &self,
        address: Address,
        topics: &[Vec<B256>],
        block_number: u64,
    ) -> Result<Vec<RawLog>> {
        let params = log_filter_params(address, topics, block_number);
        let result = self.call("eth_getLogs", params).await?;
        let logs: Vec<RawLog> =
            serde_json::from_value(result).context("Failed to deserialize logs")?;
        debug!(
            "eth_getLogs({:?}, block {}) returned {} logs",
            address,
            block_number,
            logs.len()
        );
        Ok(logs)
    }
}

#[async_trait]
impl LogFetcher for RpcClient {
    async fn fetch_logs(
        &self,
        contract_address: Address,
        topics: &[Vec<B256>],
        block_number: u64,
    ) -> Result<Vec<RawLog>> {
        self.get_logs(contract_address, topics, block_number)
            .await
            .with_context(|| format!("Failed to fetch logs for block {}", block_number))
    }
}

/// Build the `eth_getLogs` filter for a single block.
///
/// Each topic position is an OR-group; a single-element group is sent as a
/// plain string, which every node accepts.
fn log_filter_params(address: Address, topics: &[Vec<B256>], block_number: u64) -> Value {
    let block = format!("0x{:x}", block_number);
    let topics: Vec<Value> = topics
        .iter()
        .map(|group| match group.as_slice() {
            [] => Value::Null,
            [single] => json!(format!("0x{:x}", single)),
            many => json!(many
                .iter()
                .map(|t| format!("0x{:x}", t))
                .collect::<Vec<_>>()),
        })
        .collect();

    json!([{
        "address": format!("0x{:x}", address),
        "topics": topics,
        "fromBlock": block,
        "toBlock": block,
    }])
}
