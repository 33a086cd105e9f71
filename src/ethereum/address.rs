//! Ethereum to Godwoken address translation.
//!
//! A Godwoken account controlled by an Ethereum key is identified by the hash
//! of its layer-2 lock script. The short address is the first 20 bytes of that
//! hash, and is what the Polyjuice web3 bridge expects wherever a contract
//! argument is an `address`.

use alloy::primitives::{Address, B256};
use ckb_types::{core::ScriptHashType, packed::Script, prelude::*};
use std::str::FromStr;

use super::error::{ClientError, ClientResult};
use super::utils;
use crate::config::GodwokenConfig;

#[derive(Debug, Clone)]
pub struct AddressTranslator {
    rollup_type_hash: B256,
    eth_account_lock_type_hash: B256,
}

impl AddressTranslator {
    pub fn new(rollup_type_hash: B256, eth_account_lock_type_hash: B256) -> Self {
        Self {
            rollup_type_hash,
            eth_account_lock_type_hash,
        }
    }

    pub fn from_config(config: &GodwokenConfig) -> ClientResult<Self> {
        let parse = |field: &str, value: &str| {
            B256::from_str(value).map_err(|e| ClientError::InvalidNetworkSetting {
                field: format!("godwoken.{}", field),
                value: value.to_string(),
                reason: e.to_string(),
            })
        };

        Ok(Self::new(
            parse("rollup_type_hash", &config.rollup_type_hash)?,
            parse(
                "eth_account_lock_type_hash",
                &config.eth_account_lock_type_hash,
            )?,
        ))
    }

    pub fn eth_to_godwoken_short_address(&self, eth_address: &str) -> ClientResult<Address> {
        let eth_address = utils::validate_address(eth_address)?;
        let script_hash = self.layer2_lock_script(eth_address).calc_script_hash();
        let short_address = Address::from_slice(&script_hash.as_slice()[..20]);

        tracing::debug!(
            "Translated 0x{:x} to Godwoken short address 0x{:x}",
            eth_address,
            short_address
        );
        Ok(short_address)
    }

    /// Lock script of the layer-2 account owned by `eth_address`
    fn layer2_lock_script(&self, eth_address: Address) -> Script {
        let mut args = Vec::with_capacity(52);
        args.extend_from_slice(self.rollup_type_hash.as_slice());
        args.extend_from_slice(eth_address.as_slice());

        Script::new_builder()
            .code_hash(self.eth_account_lock_type_hash.0.pack())
            .hash_type(ScriptHashType::Type.into())
            .args(args.pack())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn translator() -> AddressTranslator {
        let config = Config::default();
        let network = config.networks.get(&config.default_network).unwrap();
        AddressTranslator::from_config(&network.godwoken).unwrap()
    }

    #[test]
    fn test_lock_script_fields() {
        let rollup = B256::repeat_byte(0x01);
        let lock = B256::repeat_byte(0x02);
        let eth = Address::repeat_byte(0x03);
        let script = AddressTranslator::new(rollup, lock).layer2_lock_script(eth);

        assert_eq!(script.code_hash().as_slice(), lock.as_slice());
        assert_eq!(script.hash_type().as_slice(), &[ScriptHashType::Type as u8]);

        let args: Vec<u8> = script.args().unpack();
        assert_eq!(args.len(), 52);
        assert_eq!(&args[..32], rollup.as_slice());
        assert_eq!(&args[32..], eth.as_slice());
    }

    #[test]
    fn test_translation_is_deterministic() {
        let translator = translator();
        let a = translator
            .eth_to_godwoken_short_address("0x344d7bBdc7a3E1195d2d28ac61BCa7f8A70CadCA")
            .unwrap();
        let b = translator
            .eth_to_godwoken_short_address("0x344d7bbdc7a3e1195d2d28ac61bca7f8a70cadca")
            .unwrap();
        assert_eq!(a, b);

        let other = translator
            .eth_to_godwoken_short_address("0x842B620618bbdC0Ab5C1aA2928219428eBee5799")
            .unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn test_translation_matches_lock_script_hash() {
        let translator = AddressTranslator::new(B256::repeat_byte(0x01), B256::repeat_byte(0x02));
        let eth = Address::repeat_byte(0x03);
        let script = translator.layer2_lock_script(eth);
        let expected = ckb_hash::blake2b_256(script.as_slice());

        let short = translator
            .eth_to_godwoken_short_address(&format!("0x{:x}", eth))
            .unwrap();
        assert_eq!(short.as_slice(), &expected[..20]);
    }

    #[test]
    fn test_translation_depends_on_rollup() {
        let eth = "0x08f8036A199f59163B0d02E8a53a05a215FfD716";
        let a = AddressTranslator::new(B256::repeat_byte(1), B256::repeat_byte(2))
            .eth_to_godwoken_short_address(eth)
            .unwrap();
        let b = AddressTranslator::new(B256::repeat_byte(9), B256::repeat_byte(2))
            .eth_to_godwoken_short_address(eth)
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_address_is_rejected() {
        let translator = translator();
        assert!(matches!(
            translator.eth_to_godwoken_short_address("0xabc"),
            Err(ClientError::InvalidAddress { .. })
        ));
        assert!(translator.eth_to_godwoken_short_address("").is_err());
    }

    #[test]
    fn test_invalid_config_hash_is_rejected() {
        let config = GodwokenConfig {
            rollup_type_hash: "0x1234".to_string(),
            eth_account_lock_type_hash: format!("0x{}", "00".repeat(32)),
        };
        assert!(matches!(
            AddressTranslator::from_config(&config),
            Err(ClientError::InvalidNetworkSetting { .. })
        ));
    }
}
