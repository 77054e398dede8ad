use super::format::{to_pretty_json, EditableValue};
use super::params::{ArrayLength, ParamKind, ParamType, ScalarType};

/// Placeholder text for a freshly selected function's parameter
pub fn example_for(param: &ParamType) -> String {
    match &param.kind {
        ParamKind::Scalar(scalar) => scalar_example(*scalar),
        _ => to_pretty_json(&example_value(param).into_json()),
    }
}

fn example_value(param: &ParamType) -> EditableValue {
    match &param.kind {
        ParamKind::Scalar(ScalarType::Bool) => EditableValue::Bool(false),
        ParamKind::Scalar(scalar) => EditableValue::Scalar(scalar_example(*scalar)),
        ParamKind::Array { element, length } => {
            let count = match length {
                ArrayLength::Dynamic => 1,
                ArrayLength::Fixed(n) => *n,
            };
            EditableValue::List((0..count).map(|_| example_value(element)).collect())
        }
        ParamKind::Tuple(components) => {
            EditableValue::List(components.iter().map(example_value).collect())
        }
    }
}

fn scalar_example(scalar: ScalarType) -> String {
    match scalar {
        ScalarType::Address => format!("0x{}", "0".repeat(40)),
        ScalarType::Bool => "false".to_string(),
        ScalarType::Bytes => "0x".to_string(),
        ScalarType::FixedBytes(size) => format!("0x{}", "00".repeat(size)),
        ScalarType::Uint(_) | ScalarType::Int(_) => "0".to_string(),
        ScalarType::Function => format!("0x{}", "00".repeat(24)),
        ScalarType::String => "Ethereum".to_string(),
    }
}
