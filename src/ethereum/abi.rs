use alloy::json_abi::JsonAbi;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::params::{canonicalize, FunctionFragment};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("invalid ABI: {0}")]
    InvalidAbi(String),

    #[error("unsupported parameter type '{0}'")]
    UnsupportedType(String),

    #[error("no function matching '{0}' in the ABI")]
    FunctionNotFound(String),

    #[error("function name '{name}' is ambiguous, use one of: {}", candidates.join(", "))]
    AmbiguousFunction {
        name: String,
        candidates: Vec<String>,
    },
}

/// Keywords that start a human-readable ABI entry
const ENTRY_KEYWORDS: [&str; 7] = [
    "function",
    "event",
    "error",
    "constructor",
    "fallback",
    "receive",
    "struct",
];

/// A parsed contract ABI, rebuilt from scratch whenever its text changes
#[derive(Debug, Clone, Default)]
pub struct Interface {
    abi: JsonAbi,
    functions: Vec<FunctionFragment>,
}

impl Interface {
    /// Parse ABI text: a JSON ABI, a JSON array of signatures, a build
    /// artifact with an `abi` field, or one signature per line
    pub fn parse(text: &str) -> Result<Self, AbiError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::default());
        }

        let abi = match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(entries))
                if !entries.is_empty() && entries.iter().all(Value::is_string) =>
            {
                let lines: Vec<&str> = entries.iter().filter_map(Value::as_str).collect();
                parse_human_readable(&lines)?
            }
            Ok(Value::Object(mut artifact)) if artifact.contains_key("abi") => {
                let abi = artifact.remove("abi").unwrap_or(Value::Null);
                serde_json::from_value::<JsonAbi>(abi)
                    .map_err(|e| AbiError::InvalidAbi(e.to_string()))?
            }
            Ok(value) => serde_json::from_value::<JsonAbi>(value)
                .map_err(|e| AbiError::InvalidAbi(e.to_string()))?,
            Err(_) => {
                let lines: Vec<&str> = text
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect();
                parse_human_readable(&lines)?
            }
        };

        Ok(Self::from_json_abi(abi))
    }

    /// Functions with parameter types this crate cannot edit are left out
    pub fn from_json_abi(abi: JsonAbi) -> Self {
        let mut functions: Vec<FunctionFragment> = Vec::new();

        for function in abi.functions() {
            let fragment = match canonicalize(function) {
                Ok(fragment) => fragment,
                Err(e) => {
                    warn!("Skipping function {}: {}", function.name, e);
                    continue;
                }
            };
            // First fragment for a selector wins
            if functions.iter().any(|f| f.selector() == fragment.selector()) {
                debug!("Skipping {}: selector already taken", fragment.signature());
                continue;
            }
            functions.push(fragment);
        }

        Self { abi, functions }
    }

    pub fn functions(&self) -> &[FunctionFragment] {
        &self.functions
    }

    pub fn has_functions(&self) -> bool {
        !self.functions.is_empty()
    }

    /// State-changing functions first, then read-only ones, each by signature
    pub fn sorted_functions(&self) -> Vec<&FunctionFragment> {
        let mut sorted: Vec<&FunctionFragment> = self.functions.iter().collect();
        sorted.sort_by(|a, b| {
            a.is_read_only()
                .cmp(&b.is_read_only())
                .then_with(|| a.signature().cmp(&b.signature()))
        });
        sorted
    }

    pub fn function_by_selector(&self, selector: &[u8; 4]) -> Option<&FunctionFragment> {
        self.functions.iter().find(|f| &f.selector() == selector)
    }

    /// Resolve a function from its display label, selector, signature or name
    pub fn find_function(&self, query: &str) -> Result<&FunctionFragment, AbiError> {
        let query = query.trim();
        let not_found = || AbiError::FunctionNotFound(query.to_string());

        // Display labels end in "@ 0x<selector>"
        let selector_part = query.rsplit("@ ").next().unwrap_or(query).trim();
        if let Some(selector) = parse_selector(selector_part) {
            return self.function_by_selector(&selector).ok_or_else(not_found);
        }

        let compact: String = query.chars().filter(|c| !c.is_whitespace()).collect();
        if let Some(fragment) = self.functions.iter().find(|f| f.signature() == compact) {
            return Ok(fragment);
        }

        let by_name: Vec<&FunctionFragment> =
            self.functions.iter().filter(|f| f.name == query).collect();
        match by_name.as_slice() {
            [] => Err(not_found()),
            [single] => Ok(single),
            many => Err(AbiError::AmbiguousFunction {
                name: query.to_string(),
                candidates: many.iter().map(|f| f.signature()).collect(),
            }),
        }
    }

    /// Canonical JSON rendering of the ABI
    pub fn to_json(&self) -> Result<String, AbiError> {
        serde_json::to_string_pretty(&self.abi).map_err(|e| AbiError::InvalidAbi(e.to_string()))
    }
}

fn parse_selector(text: &str) -> Option<[u8; 4]> {
    let hex_part = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))?;
    if hex_part.len() != 8 {
        return None;
    }
    let bytes = hex::decode(hex_part).ok()?;
    bytes.try_into().ok()
}

fn parse_human_readable(lines: &[&str]) -> Result<JsonAbi, AbiError> {
    let normalized: Vec<String> = lines
        .iter()
        .map(|line| {
            let line = line.trim().trim_end_matches(';');
            let keyword = line.split(|c: char| c.is_whitespace() || c == '(').next();
            if keyword.is_some_and(|k| ENTRY_KEYWORDS.contains(&k)) {
                line.to_string()
            } else {
                format!("function {}", line)
            }
        })
        .collect();

    JsonAbi::parse(normalized.iter().map(String::as_str))
        .map_err(|e| AbiError::InvalidAbi(e.to_string()))
}
