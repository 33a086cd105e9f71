use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, U256},
    providers::{Provider, ProviderBuilder},
    rpc::types::{Filter, Log, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::http::{reqwest::Url, Client, Http},
};
use async_trait::async_trait;
use std::str::FromStr;
use tracing::{debug, info};

use super::error::{ClientError, ClientResult};
use super::{EventInfo, TransactionInfo};
use crate::config::NetworkConfig;

/// Connection to the RPC bridge bound to one signing identity
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn signer_address(&self) -> Address;

    async fn balance(&self, address: Address) -> ClientResult<U256>;

    /// `eth_call` from the signer
    async fn call(&self, tx: TransactionRequest) -> ClientResult<Bytes>;

    /// Signs and sends, then waits for the receipt
    async fn send(&self, tx: TransactionRequest) -> ClientResult<TransactionInfo>;

    async fn logs(&self, filter: Filter) -> ClientResult<Vec<Log>>;
}

pub struct RpcClient<P> {
    provider: P,
    signer: Address,
    gas_price: Option<u64>,
}

/// Builds a signing client for `network`.
pub fn connect(
    network: &NetworkConfig,
    private_key: &str,
) -> ClientResult<RpcClient<impl Provider<Http<Client>>>> {
    let private_key = private_key.trim();
    let private_key = private_key.strip_prefix("0x").unwrap_or(private_key);
    let signer = PrivateKeySigner::from_str(private_key)
        .map_err(|e| ClientError::InvalidPrivateKey(e.to_string()))?;
    let signer_address = signer.address();

    let url = Url::parse(&network.rpc_url).map_err(|e| ClientError::InvalidRpcUrl {
        url: network.rpc_url.clone(),
        reason: e.to_string(),
    })?;

    let provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(EthereumWallet::from(signer))
        .on_http(url);

    debug!(
        "Connected to {} as 0x{:x}",
        network.rpc_url, signer_address
    );

    Ok(RpcClient {
        provider,
        signer: signer_address,
        gas_price: network.gas.gas_price,
    })
}

#[async_trait]
impl<P> ChainClient for RpcClient<P>
where
    P: Provider<Http<Client>>,
{
    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn balance(&self, address: Address) -> ClientResult<U256> {
        self.provider
            .get_balance(address)
            .await
            .map_err(ClientError::remote)
    }

    async fn call(&self, tx: TransactionRequest) -> ClientResult<Bytes> {
        let tx = tx.from(self.signer);
        self.provider.call(&tx).await.map_err(ClientError::remote)
    }

    async fn send(&self, tx: TransactionRequest) -> ClientResult<TransactionInfo> {
        // Godwoken's bridge only prices legacy transactions
        let gas_price = match self.gas_price {
            Some(price) => price as u128,
            None => self
                .provider
                .get_gas_price()
                .await
                .map_err(ClientError::remote)?,
        };
        let value = tx.value.unwrap_or_default();
        let tx = tx.from(self.signer).with_gas_price(gas_price);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(ClientError::remote)?;
        let tx_hash = *pending.tx_hash();
        info!("Transaction sent with hash: {:?}", tx_hash);

        let receipt = pending.get_receipt().await.map_err(|e| {
            ClientError::Remote(format!(
                "transaction was sent but confirmation failed: {}. Transaction hash: 0x{:x}",
                e, tx_hash
            ))
        })?;

        let logs = receipt.inner.logs().to_vec();
        Ok(TransactionInfo {
            hash: format!("0x{:x}", tx_hash),
            from: format!("0x{:x}", receipt.from),
            to: receipt.to.map(|to| format!("0x{:x}", to)),
            contract_address: receipt.contract_address.map(|a| format!("0x{:x}", a)),
            value: value.to_string(),
            gas_used: receipt.gas_used as u64,
            block_number: receipt.block_number.unwrap_or_default(),
            status: receipt.status(),
            events: logs.iter().map(EventInfo::from_log).collect(),
            logs,
        })
    }

    async fn logs(&self, filter: Filter) -> ClientResult<Vec<Log>> {
        self.provider
            .get_logs(&filter)
            .await
            .map_err(ClientError::remote)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    const TEST_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn test_connect_binds_signer() {
        let config = Config::default();
        let network = config.network(None).unwrap();

        let client = connect(network, TEST_KEY).unwrap();
        let expected = PrivateKeySigner::from_str(TEST_KEY.trim_start_matches("0x"))
            .unwrap()
            .address();
        assert_eq!(client.signer_address(), expected);
    }

    #[test]
    fn test_connect_rejects_bad_inputs() {
        let config = Config::default();
        let mut network = config.network(None).unwrap().clone();

        assert!(matches!(
            connect(&network, "0x1234"),
            Err(ClientError::InvalidPrivateKey(_))
        ));

        network.rpc_url = "not a url".to_string();
        assert!(matches!(
            connect(&network, TEST_KEY),
            Err(ClientError::InvalidRpcUrl { .. })
        ));
    }
}
