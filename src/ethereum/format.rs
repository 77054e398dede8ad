//! Conversion between decoded ABI values and the strings users edit.
//!
//! Scalars are plain strings. Arrays and tuples are JSON literals in which
//! numbers, addresses and bytes are JSON strings, so values wider than 53
//! bits survive a trip through any JSON tooling.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Function, Sign, B256, I256, U256};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::params::{ArrayLength, ParamKind, ParamType, ScalarType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("invalid boolean value, expected true or false")]
    InvalidBoolean,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid bytes: {0}")]
    InvalidBytes(String),

    #[error("invalid structured value: {0}")]
    InvalidStructuredValue(String),
}

/// Intermediate form of a parsed literal, before it meets its ABI type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditableValue {
    Scalar(String),
    Bool(bool),
    List(Vec<EditableValue>),
    /// Tuple written as a JSON object keyed by component name
    Record(Vec<(String, EditableValue)>),
}

impl EditableValue {
    pub fn from_json(value: Value) -> Result<Self, FormatError> {
        match value {
            Value::String(s) => Ok(EditableValue::Scalar(s)),
            Value::Number(n) => Ok(EditableValue::Scalar(n.to_string())),
            Value::Bool(b) => Ok(EditableValue::Bool(b)),
            Value::Array(items) => Ok(EditableValue::List(
                items
                    .into_iter()
                    .map(EditableValue::from_json)
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Value::Object(fields) => Ok(EditableValue::Record(
                fields
                    .into_iter()
                    .map(|(k, v)| Ok((k, EditableValue::from_json(v)?)))
                    .collect::<Result<Vec<_>, FormatError>>()?,
            )),
            Value::Null => Err(FormatError::InvalidStructuredValue(
                "null is not a value".to_string(),
            )),
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            EditableValue::Scalar(s) => Value::String(s),
            EditableValue::Bool(b) => Value::Bool(b),
            EditableValue::List(items) => {
                Value::Array(items.into_iter().map(EditableValue::into_json).collect())
            }
            EditableValue::Record(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect(),
            ),
        }
    }
}

/// Render a decoded value as the string shown in its parameter field
pub fn to_editable_string(value: &DynSolValue, param: &ParamType) -> String {
    if param.is_structured() {
        to_pretty_json(&render_json(value))
    } else {
        render_scalar(value)
    }
}

/// Parse a field's text into a value of the given ABI type
pub fn from_editable_string(text: &str, param: &ParamType) -> Result<DynSolValue, FormatError> {
    match &param.kind {
        ParamKind::Scalar(scalar) => parse_scalar(text, *scalar),
        ParamKind::Array { .. } | ParamKind::Tuple(_) => {
            let json: Value = serde_json::from_str(text.trim())
                .map_err(|e| FormatError::InvalidStructuredValue(e.to_string()))?;
            from_editable_value(&EditableValue::from_json(json)?, param)
        }
    }
}

pub fn from_editable_value(
    value: &EditableValue,
    param: &ParamType,
) -> Result<DynSolValue, FormatError> {
    match (&param.kind, value) {
        (ParamKind::Scalar(ScalarType::Bool), EditableValue::Bool(b)) => Ok(DynSolValue::Bool(*b)),
        (ParamKind::Scalar(scalar), EditableValue::Scalar(text)) => parse_scalar(text, *scalar),
        (ParamKind::Scalar(scalar), _) => Err(scalar_mismatch(*scalar, param)),

        (ParamKind::Array { element, length }, EditableValue::List(items)) => {
            if let ArrayLength::Fixed(expected) = length {
                if items.len() != *expected {
                    return Err(FormatError::InvalidStructuredValue(format!(
                        "expected {} elements for `{}`, got {}",
                        expected,
                        param.canonical_type(),
                        items.len()
                    )));
                }
            }
            let values = items
                .iter()
                .map(|item| from_editable_value(item, element))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match length {
                ArrayLength::Dynamic => DynSolValue::Array(values),
                ArrayLength::Fixed(_) => DynSolValue::FixedArray(values),
            })
        }

        (ParamKind::Tuple(components), EditableValue::List(items)) => {
            if items.len() != components.len() {
                return Err(FormatError::InvalidStructuredValue(format!(
                    "expected {} components for `{}`, got {}",
                    components.len(),
                    param.canonical_type(),
                    items.len()
                )));
            }
            let values = components
                .iter()
                .zip(items)
                .map(|(component, item)| from_editable_value(item, component))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DynSolValue::Tuple(values))
        }

        (ParamKind::Tuple(components), EditableValue::Record(fields)) => {
            let values = components
                .iter()
                .map(|component| {
                    let name = component.name.as_deref().ok_or_else(|| {
                        FormatError::InvalidStructuredValue(format!(
                            "`{}` has unnamed components, use an array",
                            param.canonical_type()
                        ))
                    })?;
                    let (_, item) = fields.iter().find(|(k, _)| k == name).ok_or_else(|| {
                        FormatError::InvalidStructuredValue(format!("missing field '{}'", name))
                    })?;
                    from_editable_value(item, component)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DynSolValue::Tuple(values))
        }

        _ => Err(FormatError::InvalidStructuredValue(format!(
            "expected an array for `{}`",
            param.canonical_type()
        ))),
    }
}

fn scalar_mismatch(scalar: ScalarType, param: &ParamType) -> FormatError {
    let detail = format!("expected a single `{}` value", param.canonical_type());
    match scalar {
        ScalarType::Bool => FormatError::InvalidBoolean,
        ScalarType::Uint(_) | ScalarType::Int(_) => FormatError::InvalidNumber(detail),
        ScalarType::Address => FormatError::InvalidAddress(detail),
        ScalarType::Bytes | ScalarType::FixedBytes(_) | ScalarType::Function => {
            FormatError::InvalidBytes(detail)
        }
        ScalarType::String => FormatError::InvalidStructuredValue(detail),
    }
}

fn parse_scalar(text: &str, scalar: ScalarType) -> Result<DynSolValue, FormatError> {
    // Strings are taken verbatim, everything else ignores surrounding whitespace
    if scalar == ScalarType::String {
        return Ok(DynSolValue::String(text.to_string()));
    }
    let text = text.trim();

    match scalar {
        ScalarType::Address => Ok(DynSolValue::Address(parse_address(text)?)),
        ScalarType::Bool => match text {
            "true" => Ok(DynSolValue::Bool(true)),
            "false" => Ok(DynSolValue::Bool(false)),
            _ => Err(FormatError::InvalidBoolean),
        },
        ScalarType::Bytes => Ok(DynSolValue::Bytes(parse_hex_bytes(text)?)),
        ScalarType::FixedBytes(size) => {
            let bytes = parse_fixed_bytes(text, size)?;
            Ok(DynSolValue::FixedBytes(B256::right_padding_from(&bytes), size))
        }
        ScalarType::Function => {
            let bytes = parse_fixed_bytes(text, 24)?;
            Ok(DynSolValue::Function(Function::from_slice(&bytes)))
        }
        ScalarType::Uint(bits) => Ok(DynSolValue::Uint(parse_uint(text, bits)?, bits)),
        ScalarType::Int(bits) => Ok(DynSolValue::Int(parse_int(text, bits)?, bits)),
        ScalarType::String => Ok(DynSolValue::String(text.to_string())),
    }
}

fn strip_hex_prefix(text: &str) -> Option<&str> {
    text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
}

/// Parse a `0x`-prefixed address; mixed case must carry a valid checksum
pub fn parse_address(text: &str) -> Result<Address, FormatError> {
    let hex_part = strip_hex_prefix(text)
        .ok_or_else(|| FormatError::InvalidAddress(format!("'{}' must start with 0x", text)))?;

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(FormatError::InvalidAddress(format!(
            "'{}' is not 40 hexadecimal characters",
            text
        )));
    }

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(format!("0x{}", hex_part), None)
            .map_err(|_| FormatError::InvalidAddress(format!("bad checksum in '{}'", text)));
    }

    let bytes =
        hex::decode(hex_part).map_err(|e| FormatError::InvalidAddress(e.to_string()))?;
    Ok(Address::from_slice(&bytes))
}

pub fn parse_hex_bytes(text: &str) -> Result<Vec<u8>, FormatError> {
    let hex_part = strip_hex_prefix(text)
        .ok_or_else(|| FormatError::InvalidBytes(format!("'{}' must start with 0x", text)))?;
    if hex_part.len() % 2 != 0 {
        return Err(FormatError::InvalidBytes(format!(
            "'{}' has an odd number of hex digits",
            text
        )));
    }
    hex::decode(hex_part).map_err(|e| FormatError::InvalidBytes(e.to_string()))
}

fn parse_fixed_bytes(text: &str, size: usize) -> Result<Vec<u8>, FormatError> {
    let bytes = parse_hex_bytes(text)?;
    if bytes.len() != size {
        return Err(FormatError::InvalidBytes(format!(
            "expected {} bytes, got {}",
            size,
            bytes.len()
        )));
    }
    Ok(bytes)
}

fn parse_magnitude(text: &str) -> Result<U256, FormatError> {
    let invalid = || FormatError::InvalidNumber(format!("'{}' is not an integer", text));
    let (digits, radix) = match strip_hex_prefix(text) {
        Some(hex_part) => (hex_part, 16),
        None => (text, 10),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix as u32)) {
        return Err(invalid());
    }
    U256::from_str_radix(digits, radix).map_err(|_| invalid())
}

pub fn parse_uint(text: &str, bits: usize) -> Result<U256, FormatError> {
    let value = parse_magnitude(text)?;
    if value.bit_len() > bits {
        return Err(FormatError::InvalidNumber(format!(
            "{} does not fit in uint{}",
            text, bits
        )));
    }
    Ok(value)
}

pub fn parse_int(text: &str, bits: usize) -> Result<I256, FormatError> {
    let (sign, magnitude) = match text.strip_prefix('-') {
        Some(rest) => (Sign::Negative, rest),
        None => (Sign::Positive, text),
    };
    let abs = parse_magnitude(magnitude)?;

    let limit = U256::from(1u8) << (bits - 1);
    let in_range = match sign {
        Sign::Negative => abs <= limit,
        Sign::Positive => abs < limit,
    };
    if !in_range {
        return Err(FormatError::InvalidNumber(format!(
            "{} does not fit in int{}",
            text, bits
        )));
    }

    I256::checked_from_sign_and_abs(sign, abs)
        .ok_or_else(|| FormatError::InvalidNumber(format!("{} does not fit in int{}", text, bits)))
}

fn render_scalar(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Address(addr) => addr.to_checksum(None),
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::FixedBytes(word, size) => {
            format!("0x{}", hex::encode(&word[..(*size).min(32)]))
        }
        DynSolValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        DynSolValue::Function(func) => format!("0x{}", hex::encode(func.as_slice())),
        DynSolValue::String(s) => s.clone(),
        _ => to_pretty_json(&render_json(value)),
    }
}

fn render_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(render_json).collect())
        }
        _ => Value::String(render_scalar(value)),
    }
}

/// JSON with one-space indentation
pub(crate) fn to_pretty_json(value: &Value) -> String {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    if value.serialize(&mut serializer).is_err() {
        return value.to_string();
    }
    String::from_utf8(buf).unwrap_or_else(|_| value.to_string())
}
