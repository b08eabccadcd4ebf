//! Execution node client. Fetches canonical block data over JSON-RPC and
//! condenses it into the summary the enricher needs.
use super::BlockNumber;
use crate::fetch::FetchClient;
use crate::json_codecs::{
    dig, timestamp_from_hex_string, u64_from_hex_string, wei_opt_from_hex_string,
};
use crate::units::WeiNewtype;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct BlockEnvelope {
    hash: String,
    #[serde(deserialize_with = "timestamp_from_hex_string")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "gasUsed", deserialize_with = "u64_from_hex_string")]
    gas_used: u64,
    #[serde(rename = "gasLimit", deserialize_with = "u64_from_hex_string")]
    gas_limit: u64,
    #[serde(
        rename = "baseFeePerGas",
        default,
        deserialize_with = "wei_opt_from_hex_string"
    )]
    base_fee_per_gas: Option<WeiNewtype>,
    transactions: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockSummary {
    pub number: BlockNumber,
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub transaction_count: u32,
    pub base_fee_per_gas: Option<WeiNewtype>,
}

impl BlockSummary {
    /// The block number is the caller's key, not the node's echo of it.
    fn from_envelope(
        number: BlockNumber,
        envelope: BlockEnvelope,
    ) -> Result<Self, String> {
        // a zero gas limit would poison the gas-used percentage downstream
        if envelope.gas_limit == 0 {
            return Err(format!("block {number} reports a zero gas limit"));
        }
        Ok(Self {
            number,
            hash: envelope.hash,
            timestamp: envelope.timestamp,
            gas_used: envelope.gas_used,
            gas_limit: envelope.gas_limit,
            transaction_count: envelope.transactions.len() as u32,
            base_fee_per_gas: envelope.base_fee_per_gas,
        })
    }
}

#[automock]
#[async_trait]
pub trait ExecutionNode {
    async fn get_block_by_number(
        &self,
        block_number: BlockNumber,
    ) -> Result<Option<BlockSummary>>;
}

pub struct ExecutionNodeHttp {
    fetch_client: Arc<FetchClient>,
    url: String,
}

impl ExecutionNodeHttp {
    pub fn new(
        fetch_client: Arc<FetchClient>,
        url: String,
        api_key: Option<String>,
    ) -> Self {
        let url = match api_key {
            Some(api_key) => format!("{url}?apiKey={api_key}"),
            None => url,
        };
        Self { fetch_client, url }
    }
}

#[async_trait]
impl ExecutionNode for ExecutionNodeHttp {
    async fn get_block_by_number(
        &self,
        block_number: BlockNumber,
    ) -> Result<Option<BlockSummary>> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_getBlockByNumber",
            "params": [format!("{block_number:#x}"), true],
        });

        let body = match self.fetch_client.post_json(&self.url, &payload).await?
        {
            None => return Ok(None),
            Some(body) => body,
        };

        let result = match dig(&body, &["result"]) {
            None => {
                debug!(
                    block_number,
                    "node response carried no result, treating as no data"
                );
                return Ok(None);
            }
            Some(result) if result.is_null() => return Ok(None),
            Some(result) => result.clone(),
        };

        let envelope: BlockEnvelope = serde_json::from_value(result)?;
        let summary = BlockSummary::from_envelope(block_number, envelope)
            .map_err(|err| anyhow!(err))?;
        Ok(Some(summary))
    }
}
