use alloy::primitives::{Address, U256};
use std::str::FromStr;

use super::error::{ClientError, ClientResult};

/// Validates and normalizes an Ethereum address
pub fn validate_address(address: &str) -> ClientResult<Address> {
    let address = address.trim();
    let invalid = |reason: &str| ClientError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    if address.is_empty() {
        return Err(invalid("address cannot be empty"));
    }

    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(invalid("addresses must start with '0x'"));
    }

    if address.len() != 42 {
        return Err(invalid(
            "addresses must be exactly 42 characters (0x + 40 hex characters)",
        ));
    }

    if !address[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid("contains non-hexadecimal characters"));
    }

    Address::from_str(address).map_err(|e| invalid(&e.to_string()))
}

/// Validates function name
pub fn validate_function_name(function_name: &str) -> ClientResult<()> {
    let invalid = |reason: &str| ClientError::InvalidFunctionName {
        name: function_name.to_string(),
        reason: reason.to_string(),
    };

    let Some(first) = function_name.chars().next() else {
        return Err(invalid("function name cannot be empty"));
    };

    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(invalid(
            "function names must start with a letter or underscore",
        ));
    }

    if !function_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(invalid(
            "function names can only contain letters, numbers, and underscores",
        ));
    }

    Ok(())
}

/// Parses a value amount, decimal or `0x` prefixed hex
pub fn parse_value(value_str: &str) -> ClientResult<U256> {
    let value_str = value_str.trim();
    let invalid = |reason: &str| ClientError::InvalidArgument {
        index: 0,
        ty: "uint256".to_string(),
        token: value_str.to_string(),
        reason: reason.to_string(),
    };

    if value_str.is_empty() {
        return Err(invalid("value cannot be empty"));
    }

    if let Some(hex_part) = value_str
        .strip_prefix("0x")
        .or_else(|| value_str.strip_prefix("0X"))
    {
        U256::from_str_radix(hex_part, 16).map_err(|_| invalid("invalid hexadecimal value"))
    } else {
        U256::from_str_radix(value_str, 10)
            .map_err(|_| invalid("use decimal format or '0x' prefixed hex"))
    }
}

/// Creates user-friendly error messages for common RPC errors
pub fn interpret_rpc_error(error: &str) -> String {
    let hint = if error.contains("execution reverted") || error.contains("revert") {
        "Transaction failed: the contract function reverted execution"
    } else if error.contains("insufficient funds") || error.contains("insufficient balance") {
        "Transaction failed: insufficient funds to cover value and gas"
    } else if error.contains("gas required exceeds allowance") || error.contains("out of gas") {
        "Transaction failed: gas limit too low, raise gas.default_gas_limit or pass --gas-limit"
    } else if error.contains("nonce too low") {
        "Transaction failed: nonce too low, another transaction was already mined with this nonce"
    } else if error.contains("connection refused")
        || error.contains("network unreachable")
        || error.contains("error sending request")
    {
        "Network error: cannot connect to RPC endpoint, check the rpc_url configuration"
    } else if error.contains("timeout") || error.contains("timed out") {
        "Network error: request timed out"
    } else if error.contains("rate limit") {
        "Rate limit error: too many requests to the RPC endpoint"
    } else if error.contains("method not found") {
        "RPC error: the requested method is not supported by this RPC endpoint"
    } else {
        "RPC error"
    };

    format!("{}: {}", hint, error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_address() {
        assert!(validate_address("0x742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").is_ok());
        assert!(validate_address("0x0000000000000000000000000000000000000000").is_ok());

        assert!(validate_address("").is_err());
        assert!(validate_address("not_an_address").is_err());
        assert!(validate_address("0x123").is_err());
        assert!(validate_address("742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").is_err());
        assert!(validate_address("0xgg2d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").is_err());
    }

    #[test]
    fn test_validate_function_name() {
        assert!(validate_function_name("latestRoundData").is_ok());
        assert!(validate_function_name("_internal").is_ok());
        assert!(validate_function_name("OPTION_ISSUER_ROLE").is_ok());

        assert!(validate_function_name("").is_err());
        assert!(validate_function_name("123invalid").is_err());
        assert!(matches!(
            validate_function_name("invalid-name"),
            Err(ClientError::InvalidFunctionName { .. })
        ));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("2002100").unwrap(), U256::from(2002100u64));
        assert_eq!(parse_value("0x10").unwrap(), U256::from(16u64));
        assert!(parse_value("").is_err());
        assert!(parse_value("-1").is_err());
        assert!(parse_value("1e18").is_err());
    }

    #[test]
    fn test_interpret_rpc_error_keeps_raw_message() {
        let message = interpret_rpc_error("server returned an error response: nonce too low");
        assert!(message.starts_with("Transaction failed: nonce too low"));
        assert!(message.ends_with("server returned an error response: nonce too low"));

        assert_eq!(interpret_rpc_error("boom"), "RPC error: boom");
    }
}
