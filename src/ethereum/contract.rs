use alloy::{
    dyn_abi::{DynSolValue, EventExt, JsonAbiExt},
    json_abi::{Event, Param},
    network::TransactionBuilder,
    primitives::{Bytes, U256},
    rpc::types::{Filter, Log, TransactionRequest},
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    address::AddressTranslator,
    artifact::{ArtifactResolver, ContractArtifact},
    error::{ClientError, ClientResult},
    formatter,
    provider::ChainClient,
    utils, CallRequest, EventInfo, TransactionInfo,
};

#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Gas allowance for writes, deploys and transfers
    pub gas_limit: u64,
    /// Deploys always check; writes only when this is set
    pub check_balance_before_write: bool,
}

pub struct ContractManager {
    client: Arc<dyn ChainClient>,
    resolver: Arc<dyn ArtifactResolver>,
    translator: AddressTranslator,
    options: CallOptions,
}

impl ContractManager {
    pub fn new(
        client: Arc<dyn ChainClient>,
        resolver: Arc<dyn ArtifactResolver>,
        translator: AddressTranslator,
        options: CallOptions,
    ) -> Self {
        Self {
            client,
            resolver,
            translator,
            options,
        }
    }

    /// Read-only call. Multiple outputs come back keyed by output name.
    pub async fn read_contract(&self, request: &CallRequest) -> ClientResult<Value> {
        let artifact = self.resolver.resolve(&request.contract_name).await?;
        let function = artifact.function(&request.function_name)?;
        let address = utils::validate_address(&request.contract_address)?;

        let values = self.prepare_args(&function.inputs, request.args.as_deref())?;
        let calldata = function
            .abi_encode_input(&values)
            .map_err(|e| ClientError::Encode(e.to_string()))?;

        debug!(
            "Calling {}.{} at 0x{:x}",
            artifact.name, function.name, address
        );
        let tx = TransactionRequest::default()
            .to(address)
            .input(Bytes::from(calldata).into());
        let result = self.client.call(tx).await?;

        formatter::decode_output(function, &result)
    }

    /// State-changing call; blocks until the transaction is mined.
    pub async fn write_contract(&self, request: &CallRequest) -> ClientResult<TransactionInfo> {
        let artifact = self.resolver.resolve(&request.contract_name).await?;
        let function = artifact.function(&request.function_name)?;
        let address = utils::validate_address(&request.contract_address)?;

        let values = self.prepare_args(&function.inputs, request.args.as_deref())?;
        let calldata = function
            .abi_encode_input(&values)
            .map_err(|e| ClientError::Encode(e.to_string()))?;
        let value = match &request.value {
            Some(value) => utils::parse_value(value)?,
            None => U256::ZERO,
        };

        if self.options.check_balance_before_write {
            self.ensure_funded().await?;
        }

        info!(
            "Sending {}.{} to contract: 0x{:x}",
            artifact.name, function.name, address
        );
        let tx = TransactionRequest::default()
            .to(address)
            .input(Bytes::from(calldata).into())
            .value(value)
            .with_gas_limit(request.gas_limit.unwrap_or(self.options.gas_limit));

        let mut receipt = self.send(tx).await?;
        receipt.events = decode_logs(&artifact, &receipt.logs);
        Ok(receipt)
    }

    /// Deploys `contract_name` with constructor arguments from `args`.
    pub async fn deploy_contract(
        &self,
        contract_name: &str,
        args: Option<&str>,
        gas_limit: Option<u64>,
    ) -> ClientResult<TransactionInfo> {
        let artifact = self.resolver.resolve(contract_name).await?;
        self.ensure_funded().await?;

        let bytecode = artifact
            .bytecode
            .clone()
            .ok_or_else(|| ClientError::MissingBytecode(artifact.name.clone()))?;

        let params: &[Param] = artifact
            .abi
            .constructor()
            .map(|c| c.inputs.as_slice())
            .unwrap_or(&[]);
        let values = self.prepare_args(params, args)?;
        let encoded_args = match artifact.abi.constructor() {
            Some(constructor) => constructor
                .abi_encode_input(&values)
                .map_err(|e| ClientError::Encode(e.to_string()))?,
            None => Vec::new(),
        };

        let mut code = bytecode.to_vec();
        code.extend_from_slice(&encoded_args);

        info!("Deploying {}...", artifact.name);
        let tx = TransactionRequest::default()
            .with_deploy_code(code)
            .with_gas_limit(gas_limit.unwrap_or(self.options.gas_limit));

        let mut receipt = self.send(tx).await?;
        receipt.events = decode_logs(&artifact, &receipt.logs);

        match &receipt.contract_address {
            Some(address) => info!("Deployed contract address: {}", address),
            None => {
                return Err(ClientError::Remote(format!(
                    "deployment receipt {} has no contract address",
                    receipt.hash
                )))
            }
        }
        Ok(receipt)
    }

    pub async fn transfer(
        &self,
        to: &str,
        value: &str,
        gas_limit: Option<u64>,
    ) -> ClientResult<TransactionInfo> {
        let to = utils::validate_address(to)?;
        let value = utils::parse_value(value)?;

        info!("Transferring {} to 0x{:x}", value, to);
        let tx = TransactionRequest::default()
            .to(to)
            .value(value)
            .with_gas_limit(gas_limit.unwrap_or(self.options.gas_limit));
        self.send(tx).await
    }

    /// Balance of `address`, or of the signer when omitted
    pub async fn balance(&self, address: Option<&str>) -> ClientResult<U256> {
        let address = match address {
            Some(address) => utils::validate_address(address)?,
            None => self.client.signer_address(),
        };
        self.client.balance(address).await
    }

    /// Past events of a contract, decoded against its artifact.
    pub async fn fetch_events(
        &self,
        contract_name: &str,
        contract_address: &str,
        event: Option<&str>,
        from_block: Option<u64>,
        to_block: Option<u64>,
    ) -> ClientResult<Vec<EventInfo>> {
        let artifact = self.resolver.resolve(contract_name).await?;
        let address = utils::validate_address(contract_address)?;

        let mut filter = Filter::new()
            .address(address)
            .from_block(from_block.unwrap_or(0));
        if let Some(to_block) = to_block {
            filter = filter.to_block(to_block);
        }
        if let Some(name) = event {
            filter = filter.event_signature(artifact.event(name)?.selector());
        }

        let logs = self.client.logs(filter).await?;
        debug!("Fetched {} logs for 0x{:x}", logs.len(), address);
        Ok(decode_logs(&artifact, &logs))
    }

    fn prepare_args(&self, params: &[Param], literal: Option<&str>) -> ClientResult<Vec<DynSolValue>> {
        let tokens = match literal {
            Some(literal) => formatter::parse_args_literal(literal)?,
            None => Vec::new(),
        };
        let args = formatter::format_args(&tokens, params, &self.translator)?;
        formatter::encode_args(&args, params)
    }

    async fn ensure_funded(&self) -> ClientResult<()> {
        let signer = self.client.signer_address();
        let balance = self.client.balance(signer).await?;
        info!("0x{:x} wallet balance : {}", signer, balance);

        if balance.is_zero() {
            warn!("Insufficient balance for 0x{:x}", signer);
            return Err(ClientError::InsufficientFunds {
                address: format!("0x{:x}", signer),
            });
        }
        Ok(())
    }

    async fn send(&self, tx: TransactionRequest) -> ClientResult<TransactionInfo> {
        let receipt = self.client.send(tx).await?;
        if !receipt.status {
            return Err(ClientError::Remote(format!(
                "execution reverted: transaction {} failed in block {}",
                receipt.hash, receipt.block_number
            )));
        }
        Ok(receipt)
    }
}

/// Decodes logs against the artifact's events; unknown logs stay raw.
pub fn decode_logs(artifact: &ContractArtifact, logs: &[Log]) -> Vec<EventInfo> {
    logs.iter()
        .map(|log| {
            let mut info = EventInfo::from_log(log);
            let Some(topic0) = log.topics().first() else {
                return info;
            };

            let event = artifact
                .abi
                .events()
                .find(|e| !e.anonymous && e.selector() == *topic0);
            if let Some(event) = event {
                match decode_event(event, log) {
                    Ok(decoded) => {
                        info.event = Some(event.name.clone());
                        info.decoded = Some(decoded);
                    }
                    Err(e) => debug!("Failed to decode {} log: {}", event.name, e),
                }
            }
            info
        })
        .collect()
}

fn decode_event(event: &Event, log: &Log) -> ClientResult<Value> {
    let decoded = event
        .decode_log(log.data(), true)
        .map_err(|e| ClientError::Decode(e.to_string()))?;

    let mut indexed = decoded.indexed.iter();
    let mut body = decoded.body.iter();
    let mut keyed = Map::new();

    for (index, input) in event.inputs.iter().enumerate() {
        let value = if input.indexed {
            indexed.next()
        } else {
            body.next()
        };
        let key = if input.name.is_empty() {
            index.to_string()
        } else {
            input.name.clone()
        };
        keyed.insert(
            key,
            value.map(formatter::sol_value_to_json).unwrap_or(Value::Null),
        );
    }
    Ok(Value::Object(keyed))
}
