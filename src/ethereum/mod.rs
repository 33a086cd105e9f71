pub mod address;
pub mod artifact;
pub mod contract;
pub mod error;
pub mod formatter;
pub mod provider;
pub mod utils;

use alloy::rpc::types::Log;
use serde::Serialize;

/// One contract invocation as given on the command line
#[derive(Debug, Clone, Default)]
pub struct CallRequest {
    pub contract_name: String,
    pub contract_address: String,
    pub function_name: String,
    pub args: Option<String>,
    pub value: Option<String>,
    pub gas_limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionInfo {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub contract_address: Option<String>,
    pub value: String,
    pub gas_used: u64,
    pub block_number: u64,
    pub status: bool,
    pub events: Vec<EventInfo>,
    #[serde(skip)]
    pub logs: Vec<Log>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventInfo {
    pub event: Option<String>,
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: u64,
    pub transaction_hash: String,
    pub log_index: u64,
    pub decoded: Option<serde_json::Value>,
}

impl EventInfo {
    pub fn from_log(log: &Log) -> Self {
        Self {
            event: None,
            address: format!("0x{:x}", log.address()),
            topics: log.topics().iter().map(|t| format!("0x{:x}", t)).collect(),
            data: format!("0x{}", hex::encode(&log.data().data)),
            block_number: log.block_number.unwrap_or_default(),
            transaction_hash: format!("0x{:x}", log.transaction_hash.unwrap_or_default()),
            log_index: log.log_index.unwrap_or_default(),
            decoded: None,
        }
    }
}
