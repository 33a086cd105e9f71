use std::path::PathBuf;
use thiserror::Error;

use super::utils;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("No compiled contract specified. Put it in \"build/contracts\" and provide its name, e.g. \"SimpleStorage.json\"")]
    MissingContractName,

    #[error("Unable to find contract file: {name} (checked: {})", display_paths(.searched))]
    ArtifactNotFound { name: String, searched: Vec<PathBuf> },

    #[error("Invalid contract artifact {path:?}: {reason}")]
    InvalidArtifact { path: PathBuf, reason: String },

    #[error("Contract artifact '{0}' has no deployment bytecode")]
    MissingBytecode(String),

    #[error("No signing key configured. Set DEPLOYER_PRIVATE_KEY, account.private_key or --private-key")]
    MissingPrivateKey,

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid RPC URL '{url}': {reason}")]
    InvalidRpcUrl { url: String, reason: String },

    #[error("Invalid network setting {field} '{value}': {reason}")]
    InvalidNetworkSetting {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Function '{function}' not found in {contract}. Available functions: {}", display_names(.available))]
    FunctionNotFound {
        contract: String,
        function: String,
        available: Vec<String>,
    },

    #[error("Event '{event}' not found in {contract}. Available events: {}", display_names(.available))]
    EventNotFound {
        contract: String,
        event: String,
        available: Vec<String>,
    },

    #[error("Invalid function name '{name}': {reason}")]
    InvalidFunctionName { name: String, reason: String },

    #[error("Invalid arguments literal '{literal}': {reason}")]
    InvalidArgsLiteral { literal: String, reason: String },

    #[error("Invalid argument #{} of type '{ty}' ('{token}'): {reason}", .index + 1)]
    InvalidArgument {
        index: usize,
        ty: String,
        token: String,
        reason: String,
    },

    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Insufficient balance. Please deposit funds to your Ethereum address: {address}")]
    InsufficientFunds { address: String },

    #[error("Failed to encode call: {0}")]
    Encode(String),

    #[error("Failed to decode result: {0}")]
    Decode(String),

    #[error("{}", utils::interpret_rpc_error(.0))]
    Remote(String),
}

impl ClientError {
    pub fn remote(err: impl std::fmt::Display) -> Self {
        Self::Remote(err.to_string())
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_names(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_lists_every_checked_path() {
        let err = ClientError::ArtifactNotFound {
            name: "Pool.json".to_string(),
            searched: vec![
                PathBuf::from("build/contracts/Pool.json"),
                PathBuf::from("./Pool.json"),
            ],
        };
        let message = err.to_string();
        assert!(message.contains("Unable to find contract file: Pool.json"));
        assert!(message.contains("build/contracts/Pool.json, ./Pool.json"));
    }

    #[test]
    fn test_argument_index_is_one_based() {
        let err = ClientError::InvalidArgument {
            index: 0,
            ty: "uint256".to_string(),
            token: "abc".to_string(),
            reason: "not a base-10 integer".to_string(),
        };
        assert!(err.to_string().starts_with("Invalid argument #1 of type 'uint256'"));
    }

    #[test]
    fn test_remote_error_is_interpreted() {
        let err = ClientError::remote("execution reverted: Ownable: caller is not the owner");
        let message = err.to_string();
        assert!(message.contains("reverted"));
        assert!(message.contains("caller is not the owner"));
    }
}
