//! Conversion between command-line literals, ABI values and printable JSON.

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, FunctionExt, Specifier},
    json_abi::{Function, Param},
    primitives::{Address, I256, U256},
};
use serde_json::{Map, Value};

use super::address::AddressTranslator;
use super::error::{ClientError, ClientResult};

/// How a declared parameter type is coerced from its literal token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer { signed: bool },
    Address,
    Text,
}

impl ParamKind {
    pub fn from_type_name(ty: &str) -> Self {
        let ty = ty.trim();
        if ty == "address" {
            Self::Address
        } else if ty.contains("int") && !ty.contains('[') && !ty.starts_with('(') {
            Self::Integer {
                signed: ty.starts_with("int"),
            }
        } else {
            Self::Text
        }
    }
}

/// A single typed call argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArgument {
    Uint(U256),
    Int(I256),
    Address(Address),
    Text(String),
}

impl CallArgument {
    pub fn to_sol_value(&self, ty: &DynSolType) -> ClientResult<DynSolValue> {
        let mismatch = || {
            ClientError::Encode(format!("argument {:?} does not fit type '{}'", self, ty))
        };

        match (self, ty) {
            (Self::Uint(value), DynSolType::Uint(bits)) if uint_fits(value, *bits) => {
                Ok(DynSolValue::Uint(*value, *bits))
            }
            (Self::Uint(value), DynSolType::Int(bits)) => {
                let value = I256::try_from(*value).map_err(|_| mismatch())?;
                if !int_fits(&value, *bits) {
                    return Err(mismatch());
                }
                Ok(DynSolValue::Int(value, *bits))
            }
            (Self::Int(value), DynSolType::Int(bits)) if int_fits(value, *bits) => {
                Ok(DynSolValue::Int(*value, *bits))
            }
            (Self::Address(address), DynSolType::Address) => Ok(DynSolValue::Address(*address)),
            (Self::Text(text), DynSolType::String) => {
                Ok(DynSolValue::String(strip_quotes(text).to_string()))
            }
            (Self::Text(text), ty) => ty
                .coerce_str(strip_quotes(text))
                .map_err(|e| ClientError::Encode(format!("'{}' as {}: {}", text, ty, e))),
            _ => Err(mismatch()),
        }
    }
}

fn uint_fits(value: &U256, bits: usize) -> bool {
    value.bit_len() <= bits
}

/// Two's complement range of `intN`
fn int_fits(value: &I256, bits: usize) -> bool {
    if bits == 0 || bits >= 256 {
        return bits == 256;
    }
    let magnitude = value.unsigned_abs();
    if value.is_negative() {
        (magnitude - U256::from(1u8)).bit_len() < bits
    } else {
        magnitude.bit_len() < bits
    }
}

fn strip_quotes(token: &str) -> &str {
    token.trim().trim_matches(|c| c == '"' || c == '\'')
}

/// Splits a literal such as `(100,"0xabc")` or `['0xabc', 1]` into trimmed tokens.
///
/// Commas nested in quotes or brackets do not split.
pub fn parse_args_literal(literal: &str) -> ClientResult<Vec<String>> {
    let trimmed = literal.trim();
    let inner = match (trimmed.chars().next(), trimmed.chars().last()) {
        (Some('('), Some(')')) | (Some('['), Some(']')) if trimmed.len() >= 2 => {
            &trimmed[1..trimmed.len() - 1]
        }
        _ => trimmed,
    };

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    let invalid = |reason: &str| ClientError::InvalidArgsLiteral {
        literal: literal.to_string(),
        reason: reason.to_string(),
    };

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;

    for c in inner.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                current.push(c);
            }
            (None, '[' | '(') => {
                depth += 1;
                current.push(c);
            }
            (None, ']' | ')') => {
                depth = depth.checked_sub(1).ok_or_else(|| invalid("unbalanced brackets"))?;
                current.push(c);
            }
            (None, ',') if depth == 0 => {
                tokens.push(current.trim().to_string());
                current.clear();
            }
            (None, c) => current.push(c),
        }
    }

    if quote.is_some() {
        return Err(invalid("unterminated quote"));
    }
    if depth != 0 {
        return Err(invalid("unbalanced brackets"));
    }
    tokens.push(current.trim().to_string());

    Ok(tokens)
}

/// Coerces each token by the declared parameter at the same position.
///
/// Tokens without a declared parameter are kept as text; the count is
/// checked when the call is encoded.
pub fn format_args(
    tokens: &[String],
    params: &[Param],
    translator: &AddressTranslator,
) -> ClientResult<Vec<CallArgument>> {
    tokens
        .iter()
        .enumerate()
        .map(|(index, token)| {
            let ty = params.get(index).map(|p| p.ty.as_str()).unwrap_or("string");
            format_arg(index, token, ty, translator)
        })
        .collect()
}

fn format_arg(
    index: usize,
    token: &str,
    ty: &str,
    translator: &AddressTranslator,
) -> ClientResult<CallArgument> {
    let invalid = |reason: String| ClientError::InvalidArgument {
        index,
        ty: ty.to_string(),
        token: token.to_string(),
        reason,
    };

    let kind = ParamKind::from_type_name(ty);
    if strip_quotes(token).is_empty() && kind != ParamKind::Text {
        return Err(invalid("empty value".to_string()));
    }

    match kind {
        ParamKind::Address => translator
            .eth_to_godwoken_short_address(strip_quotes(token))
            .map(CallArgument::Address)
            .map_err(|e| invalid(e.to_string())),
        ParamKind::Integer { signed: true } => I256::from_dec_str(strip_quotes(token))
            .map(CallArgument::Int)
            .map_err(|_| invalid("not a base-10 integer".to_string())),
        ParamKind::Integer { signed: false } => U256::from_str_radix(strip_quotes(token), 10)
            .map(CallArgument::Uint)
            .map_err(|_| invalid("not a base-10 unsigned integer".to_string())),
        ParamKind::Text => Ok(CallArgument::Text(token.trim().to_string())),
    }
}

/// Converts formatted arguments to ABI values for the declared parameters.
pub fn encode_args(args: &[CallArgument], params: &[Param]) -> ClientResult<Vec<DynSolValue>> {
    if args.len() != params.len() {
        let expected: Vec<String> = params
            .iter()
            .map(|p| format!("{} {}", p.ty, p.name))
            .collect();
        return Err(ClientError::Encode(format!(
            "expected {} arguments, got {}. Expected parameters: ({})",
            params.len(),
            args.len(),
            expected.join(", ")
        )));
    }

    args.iter()
        .zip(params)
        .map(|(arg, param)| {
            let ty = param
                .resolve()
                .map_err(|e| ClientError::Encode(format!("type '{}': {}", param.ty, e)))?;
            arg.to_sol_value(&ty)
        })
        .collect()
}

/// Decodes return data: one output yields the value itself, several yield an
/// object keyed by output name (or position when unnamed).
pub fn decode_output(function: &Function, result: &[u8]) -> ClientResult<Value> {
    if result.is_empty() || function.outputs.is_empty() {
        return Ok(Value::Null);
    }

    let decoded = function
        .abi_decode_output(result, false)
        .map_err(|e| ClientError::Decode(e.to_string()))?;

    if decoded.len() == 1 {
        return Ok(sol_value_to_json(&decoded[0]));
    }

    let mut keyed = Map::new();
    for (index, (param, value)) in function.outputs.iter().zip(&decoded).enumerate() {
        let key = if param.name.is_empty() {
            index.to_string()
        } else {
            param.name.clone()
        };
        keyed.insert(key, sol_value_to_json(value));
    }
    Ok(Value::Object(keyed))
}

/// Flattens keyed structures to their values in order; anything else is unchanged.
pub fn format_output(output: Value) -> Value {
    match output {
        Value::Object(map) => Value::Array(map.into_iter().map(|(_, v)| v).collect()),
        other => other,
    }
}

pub fn sol_value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Address(addr) => Value::String(format!("0x{:x}", addr)),
        DynSolValue::Uint(num, _) => Value::String(num.to_string()),
        DynSolValue::Int(num, _) => Value::String(num.to_string()),
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Bytes(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(format!("0x{}", hex::encode(&word[..*size])))
        }
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(sol_value_to_json).collect())
        }
        other => Value::String(format!("{:?}", other)),
    }
}
