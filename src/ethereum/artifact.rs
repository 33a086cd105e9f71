use alloy::json_abi::{Event, Function, JsonAbi};
use alloy::primitives::Bytes;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::error::{ClientError, ClientResult};

/// Compiled contract interface plus optional deployment bytecode
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub name: String,
    pub abi: JsonAbi,
    pub bytecode: Option<Bytes>,
    pub source: PathBuf,
}

impl ContractArtifact {
    /// Parses Truffle/Hardhat (`bytecode: "0x.."`), Foundry (`bytecode.object`)
    /// and Remix (`data.bytecode.object`) artifact layouts.
    pub fn from_json(name: &str, source: &Path, json: &str) -> ClientResult<Self> {
        let invalid = |reason: String| ClientError::InvalidArtifact {
            path: source.to_path_buf(),
            reason,
        };

        let value: Value =
            serde_json::from_str(json).map_err(|e| invalid(format!("invalid JSON: {}", e)))?;

        let abi_value = value
            .get("abi")
            .cloned()
            .ok_or_else(|| invalid("missing 'abi' field".to_string()))?;
        let abi: JsonAbi = serde_json::from_value(abi_value)
            .map_err(|e| invalid(format!("invalid ABI: {}", e)))?;

        let bytecode_hex = value
            .get("bytecode")
            .and_then(|b| b.as_str().or_else(|| b.get("object").and_then(Value::as_str)))
            .or_else(|| value.pointer("/data/bytecode/object").and_then(Value::as_str));

        let bytecode = match bytecode_hex {
            Some(code) if !code.trim_start_matches("0x").is_empty() => Some(
                hex::decode(code.trim_start_matches("0x"))
                    .map(Bytes::from)
                    .map_err(|e| invalid(format!("invalid bytecode: {}", e)))?,
            ),
            _ => None,
        };

        Ok(Self {
            name: name.to_string(),
            abi,
            bytecode,
            source: source.to_path_buf(),
        })
    }

    /// First function declared with `name`
    pub fn function(&self, name: &str) -> ClientResult<&Function> {
        self.abi.functions().find(|f| f.name == name).ok_or_else(|| {
            ClientError::FunctionNotFound {
                contract: self.name.clone(),
                function: name.to_string(),
                available: self.abi.functions().map(|f| f.name.clone()).collect(),
            }
        })
    }

    pub fn event(&self, name: &str) -> ClientResult<&Event> {
        self.abi.events().find(|e| e.name == name).ok_or_else(|| {
            ClientError::EventNotFound {
                contract: self.name.clone(),
                event: name.to_string(),
                available: self.abi.events().map(|e| e.name.clone()).collect(),
            }
        })
    }
}

#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    async fn resolve(&self, name: &str) -> ClientResult<ContractArtifact>;
}

/// Looks up artifacts in an ordered list of directories
#[derive(Debug, Clone)]
pub struct FileArtifactResolver {
    search_dirs: Vec<PathBuf>,
}

impl FileArtifactResolver {
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let with_extension = Path::new(name).extension().is_none();
        let mut paths = Vec::new();
        for dir in &self.search_dirs {
            paths.push(dir.join(name));
            if with_extension {
                paths.push(dir.join(format!("{}.json", name)));
            }
        }
        paths
    }
}

#[async_trait]
impl ArtifactResolver for FileArtifactResolver {
    async fn resolve(&self, name: &str) -> ClientResult<ContractArtifact> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::MissingContractName);
        }

        let candidates = self.candidates(name);
        for path in &candidates {
            if !fs::try_exists(path).await.unwrap_or(false) {
                debug!("Checking for file: {}", path.display());
                continue;
            }

            debug!("Found artifact: {}", path.display());
            let content = fs::read_to_string(path)
                .await
                .map_err(|e| ClientError::InvalidArtifact {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            return ContractArtifact::from_json(name, path, &content);
        }

        Err(ClientError::ArtifactNotFound {
            name: name.to_string(),
            searched: candidates,
        })
    }
}
