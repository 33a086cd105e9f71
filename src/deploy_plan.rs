//! Sequential multi-contract deployments described in a TOML manifest.
//!
//! ```toml
//! [addresses]
//! ibfr = "0x344d7bBdc7a3E1195d2d28ac61BCa7f8A70CadCA"
//!
//! [[deploy]]
//! alias = "staking"
//! contract = "BufferStakingBNB.json"
//! args = '("{ibfr}")'
//!
//! [[deploy]]
//! contract = "BufferBNBPool.json"
//! ```
//!
//! `{name}` in `args` expands to a known address or to the address of an
//! earlier step.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::ethereum::contract::ContractManager;

#[derive(Debug, Clone, Deserialize)]
pub struct DeployPlan {
    #[serde(default)]
    pub addresses: BTreeMap<String, String>,
    pub deploy: Vec<DeployStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeployStep {
    pub alias: Option<String>,
    pub contract: String,
    pub args: Option<String>,
    pub gas_limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployedContract {
    pub alias: String,
    pub contract: String,
    pub address: String,
    pub transaction_hash: String,
}

impl DeployStep {
    pub fn alias(&self) -> String {
        self.alias.clone().unwrap_or_else(|| {
            self.contract
                .strip_suffix(".json")
                .unwrap_or(&self.contract)
                .to_string()
        })
    }
}

impl DeployPlan {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read deploy plan {:?}", path))?;
        Self::from_toml(&content).with_context(|| format!("Invalid deploy plan {:?}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let plan: DeployPlan = toml::from_str(content)?;
        if plan.deploy.is_empty() {
            return Err(anyhow!("deploy plan has no [[deploy]] steps"));
        }
        Ok(plan)
    }

    /// Deploys every step in order, stopping at the first failure.
    pub async fn run(&self, manager: &ContractManager) -> Result<Vec<DeployedContract>> {
        let mut known = self.addresses.clone();
        let mut deployed = Vec::with_capacity(self.deploy.len());

        for (index, step) in self.deploy.iter().enumerate() {
            let alias = step.alias();
            let args = step
                .args
                .as_deref()
                .map(|args| expand_references(args, &known))
                .transpose()
                .with_context(|| format!("step {} ({})", index + 1, alias))?;

            info!("[{}/{}] {}", index + 1, self.deploy.len(), alias);
            let receipt = manager
                .deploy_contract(&step.contract, args.as_deref(), step.gas_limit)
                .await
                .with_context(|| format!("step {} ({}) failed", index + 1, alias))?;

            let address = receipt
                .contract_address
                .ok_or_else(|| anyhow!("step {} ({}) returned no address", index + 1, alias))?;
            known.insert(alias.clone(), address.clone());
            deployed.push(DeployedContract {
                alias,
                contract: step.contract.clone(),
                address,
                transaction_hash: receipt.hash,
            });
        }

        Ok(deployed)
    }
}

fn expand_references(args: &str, known: &BTreeMap<String, String>) -> Result<String> {
    let mut expanded = String::with_capacity(args.len());
    let mut rest = args;

    while let Some(start) = rest.find('{') {
        expanded.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| anyhow!("unclosed '{{' in arguments '{}'", args))?;
        let name = after[..end].trim();
        let address = known
            .get(name)
            .ok_or_else(|| anyhow!("unknown address reference '{{{}}}'", name))?;
        expanded.push_str(address);
        rest = &after[end + 1..];
    }
    expanded.push_str(rest);

    Ok(expanded)
}
