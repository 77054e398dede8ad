//! Canonical function fragments and parameter types.
//!
//! The codec's `Param` tree describes types as strings (`"tuple[2][]"`) with
//! loose component lists. Everything downstream works on the owned graph
//! built here instead, so two parses of the same ABI compare equal.

use alloy::dyn_abi::DynSolType;
use alloy::json_abi::{Function, Param, StateMutability};
use alloy::primitives::keccak256;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::abi::AbiError;

/// Leaf ABI types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "size", rename_all = "snake_case")]
pub enum ScalarType {
    Address,
    Bool,
    String,
    Bytes,
    FixedBytes(usize),
    Uint(usize),
    Int(usize),
    /// External function pointer: address followed by a selector
    Function,
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::Address => f.write_str("address"),
            ScalarType::Bool => f.write_str("bool"),
            ScalarType::String => f.write_str("string"),
            ScalarType::Bytes => f.write_str("bytes"),
            ScalarType::FixedBytes(size) => write!(f, "bytes{}", size),
            ScalarType::Uint(bits) => write!(f, "uint{}", bits),
            ScalarType::Int(bits) => write!(f, "int{}", bits),
            ScalarType::Function => f.write_str("function"),
        }
    }
}

impl FromStr for ScalarType {
    type Err = AbiError;

    fn from_str(ty: &str) -> Result<Self, Self::Err> {
        let unsupported = || AbiError::UnsupportedType(ty.to_string());

        let scalar = match ty {
            "address" => ScalarType::Address,
            "bool" => ScalarType::Bool,
            "string" => ScalarType::String,
            "bytes" => ScalarType::Bytes,
            "function" => ScalarType::Function,
            "uint" => ScalarType::Uint(256),
            "int" => ScalarType::Int(256),
            _ => {
                if let Some(bits) = ty.strip_prefix("uint") {
                    ScalarType::Uint(parse_bits(bits).ok_or_else(unsupported)?)
                } else if let Some(bits) = ty.strip_prefix("int") {
                    ScalarType::Int(parse_bits(bits).ok_or_else(unsupported)?)
                } else if let Some(size) = ty.strip_prefix("bytes") {
                    let size: usize = size.parse().map_err(|_| unsupported())?;
                    if !(1..=32).contains(&size) {
                        return Err(unsupported());
                    }
                    ScalarType::FixedBytes(size)
                } else {
                    return Err(unsupported());
                }
            }
        };

        Ok(scalar)
    }
}

fn parse_bits(bits: &str) -> Option<usize> {
    let bits: usize = bits.parse().ok()?;
    (bits > 0 && bits <= 256 && bits % 8 == 0).then_some(bits)
}

/// Length of an array parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayLength {
    Dynamic,
    Fixed(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Scalar(ScalarType),
    Array {
        element: Box<ParamType>,
        length: ArrayLength,
    },
    Tuple(Vec<ParamType>),
}

/// One ABI parameter: array, tuple or scalar, never more than one
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParamType {
    pub name: Option<String>,
    pub kind: ParamKind,
}

impl ParamType {
    pub fn scalar(scalar: ScalarType) -> Self {
        Self {
            name: None,
            kind: ParamKind::Scalar(scalar),
        }
    }

    pub fn array(element: ParamType, length: ArrayLength) -> Self {
        Self {
            name: None,
            kind: ParamKind::Array {
                element: Box::new(element),
                length,
            },
        }
    }

    pub fn tuple(components: Vec<ParamType>) -> Self {
        Self {
            name: None,
            kind: ParamKind::Tuple(components),
        }
    }

    #[cfg(test)]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Parse a bare type string such as `uint256[2]` or `(address,bool)[]`
    pub fn parse(ty: &str) -> Result<Self, AbiError> {
        let ty = ty.trim();
        if let Some((element, length)) = split_array_suffix(ty)? {
            return Ok(Self::array(Self::parse(element)?, length));
        }
        if let Some(inner) = ty.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
            let components = split_top_level(inner)
                .into_iter()
                .map(Self::parse)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Self::tuple(components));
        }
        Ok(Self::scalar(ty.parse()?))
    }

    /// Base type name: `tuple` for tuples, the element's name for arrays
    #[cfg(test)]
    pub fn type_name(&self) -> String {
        match &self.kind {
            ParamKind::Scalar(scalar) => scalar.to_string(),
            ParamKind::Array { element, .. } => element.type_name(),
            ParamKind::Tuple(_) => "tuple".to_string(),
        }
    }

    #[cfg(test)]
    pub fn array_length(&self) -> Option<ArrayLength> {
        match &self.kind {
            ParamKind::Array { length, .. } => Some(*length),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn array_element(&self) -> Option<&ParamType> {
        match &self.kind {
            ParamKind::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn components(&self) -> Option<&[ParamType]> {
        match &self.kind {
            ParamKind::Tuple(components) => Some(components),
            _ => None,
        }
    }

    pub fn is_structured(&self) -> bool {
        !matches!(self.kind, ParamKind::Scalar(_))
    }

    /// Type as it appears in a canonical signature
    pub fn canonical_type(&self) -> String {
        match &self.kind {
            ParamKind::Scalar(scalar) => scalar.to_string(),
            ParamKind::Array { element, length } => match length {
                ArrayLength::Dynamic => format!("{}[]", element.canonical_type()),
                ArrayLength::Fixed(n) => format!("{}[{}]", element.canonical_type(), n),
            },
            ParamKind::Tuple(components) => {
                let types: Vec<String> = components.iter().map(|c| c.canonical_type()).collect();
                format!("({})", types.join(","))
            }
        }
    }

    /// Canonical type followed by the field name, if any
    pub fn full_format(&self) -> String {
        match &self.name {
            Some(name) => format!("{} {}", self.canonical_type(), name),
            None => self.canonical_type(),
        }
    }

    pub fn to_dyn_type(&self) -> DynSolType {
        match &self.kind {
            ParamKind::Scalar(scalar) => match scalar {
                ScalarType::Address => DynSolType::Address,
                ScalarType::Bool => DynSolType::Bool,
                ScalarType::String => DynSolType::String,
                ScalarType::Bytes => DynSolType::Bytes,
                ScalarType::FixedBytes(size) => DynSolType::FixedBytes(*size),
                ScalarType::Uint(bits) => DynSolType::Uint(*bits),
                ScalarType::Int(bits) => DynSolType::Int(*bits),
                ScalarType::Function => DynSolType::Function,
            },
            ParamKind::Array { element, length } => match length {
                ArrayLength::Dynamic => DynSolType::Array(Box::new(element.to_dyn_type())),
                ArrayLength::Fixed(n) => {
                    DynSolType::FixedArray(Box::new(element.to_dyn_type()), *n)
                }
            },
            ParamKind::Tuple(components) => {
                DynSolType::Tuple(components.iter().map(|c| c.to_dyn_type()).collect())
            }
        }
    }
}

/// Split `T[N]` into `T` and its outermost length
fn split_array_suffix(ty: &str) -> Result<Option<(&str, ArrayLength)>, AbiError> {
    let Some(stripped) = ty.strip_suffix(']') else {
        return Ok(None);
    };
    let open = stripped
        .rfind('[')
        .ok_or_else(|| AbiError::UnsupportedType(ty.to_string()))?;
    let size = &stripped[open + 1..];
    let length = if size.is_empty() {
        ArrayLength::Dynamic
    } else {
        ArrayLength::Fixed(
            size.parse()
                .map_err(|_| AbiError::UnsupportedType(ty.to_string()))?,
        )
    };
    Ok(Some((&stripped[..open], length)))
}

fn split_top_level(inner: &str) -> Vec<&str> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(inner[start..].trim());
    parts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
    Pure,
    View,
    NonPayable,
    Payable,
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mutability::Pure => "pure",
            Mutability::View => "view",
            Mutability::NonPayable => "nonpayable",
            Mutability::Payable => "payable",
        })
    }
}

impl From<StateMutability> for Mutability {
    fn from(mutability: StateMutability) -> Self {
        match mutability {
            StateMutability::Pure => Mutability::Pure,
            StateMutability::View => Mutability::View,
            StateMutability::NonPayable => Mutability::NonPayable,
            StateMutability::Payable => Mutability::Payable,
        }
    }
}

/// A parsed ABI function, immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FunctionFragment {
    pub name: String,
    pub inputs: Vec<ParamType>,
    pub outputs: Vec<ParamType>,
    pub mutability: Mutability,
}

impl FunctionFragment {
    pub fn is_read_only(&self) -> bool {
        matches!(self.mutability, Mutability::Pure | Mutability::View)
    }

    pub fn is_payable(&self) -> bool {
        self.mutability == Mutability::Payable
    }

    /// `name(type1,type2,...)`
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(|p| p.canonical_type()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature().as_bytes());
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&hash[..4]);
        selector
    }

    pub fn selector_hex(&self) -> String {
        format!("0x{}", hex::encode(self.selector()))
    }

    /// Label used to list and pick functions, always ending in the selector
    pub fn display(&self) -> String {
        let returns = if self.is_read_only() {
            let outputs: Vec<String> = self.outputs.iter().map(|p| p.canonical_type()).collect();
            format!(" returns ({})", outputs.join(","))
        } else {
            String::new()
        };
        format!(
            "{} {}{} @ {}",
            self.signature(),
            self.mutability,
            returns,
            self.selector_hex()
        )
    }
}

/// Build the canonical fragment for a codec function
pub fn canonicalize(function: &Function) -> Result<FunctionFragment, AbiError> {
    let inputs = function
        .inputs
        .iter()
        .map(canonicalize_param)
        .collect::<Result<Vec<_>, _>>()?;
    let outputs = function
        .outputs
        .iter()
        .map(canonicalize_param)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FunctionFragment {
        name: function.name.clone(),
        inputs,
        outputs,
        mutability: function.state_mutability.into(),
    })
}

fn canonicalize_param(param: &Param) -> Result<ParamType, AbiError> {
    let mut built = build_param(param.ty.trim(), &param.components)?;
    if !param.name.is_empty() {
        built.name = Some(param.name.clone());
    }
    Ok(built)
}

fn build_param(ty: &str, components: &[Param]) -> Result<ParamType, AbiError> {
    if let Some((element, length)) = split_array_suffix(ty)? {
        return Ok(ParamType::array(build_param(element, components)?, length));
    }
    if ty == "tuple" {
        let components = components
            .iter()
            .map(canonicalize_param)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(ParamType::tuple(components));
    }
    if ty.starts_with('(') {
        return ParamType::parse(ty);
    }
    Ok(ParamType::scalar(ty.parse()?))
}
