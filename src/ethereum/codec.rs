//! Call data encoding and decoding on top of the dynamic ABI codec.

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::Bytes;
use thiserror::Error;
use tracing::debug;

use super::abi::Interface;
use super::format::{from_editable_string, to_editable_string, FormatError};
use super::params::{FunctionFragment, ParamType};

/// A parameter string that could not be converted, with its 0-based index
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid parameter #{}: {}", .index + 1, .source)]
pub struct EncodeError {
    pub index: usize,
    #[source]
    pub source: FormatError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid hex data: {0}")]
    InvalidHex(String),

    #[error("malformed call data: {0}")]
    MalformedCallData(String),

    #[error("Transaction returned no data, are you sure this is a contract?")]
    NoResultData,
}

/// A call data payload resolved against an interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCall {
    pub fragment: FunctionFragment,
    pub parameters: Vec<String>,
}

/// Selector plus encoded arguments; empty when no function is given.
/// Missing parameter strings are treated as empty, extra ones are ignored.
pub fn encode_transaction_data(
    fragment: Option<&FunctionFragment>,
    params: &[String],
) -> Result<Bytes, EncodeError> {
    let Some(fragment) = fragment else {
        return Ok(Bytes::new());
    };

    let values = fragment
        .inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            let text = params.get(index).map(String::as_str).unwrap_or("");
            from_editable_string(text, input).map_err(|source| EncodeError { index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut data = fragment.selector().to_vec();
    data.extend(DynSolValue::Tuple(values).abi_encode_params());
    Ok(Bytes::from(data))
}

/// Decode user-typed call data. `Ok(None)` when no function of the
/// interface owns the selector.
pub fn decode_transaction_data(
    interface: &Interface,
    text: &str,
) -> Result<Option<DecodedCall>, DecodeError> {
    let data = parse_hex_data(text)?;
    if data.len() < 4 {
        return Ok(None);
    }

    let selector = [data[0], data[1], data[2], data[3]];
    let Some(fragment) = interface.function_by_selector(&selector) else {
        debug!("No function for selector 0x{}", hex::encode(selector));
        return Ok(None);
    };

    let parameters = decode_rendered(&fragment.inputs, &data[4..])?;

    // Words the decoder accepts but the parameter type cannot hold, such as
    // 0x1ff for a uint8 or 2 for a bool, must not reach the form
    let encoded = encode_transaction_data(Some(fragment), &parameters)
        .map_err(|e| DecodeError::MalformedCallData(e.to_string()))?;
    if encoded[..] != data[..] {
        return Err(DecodeError::MalformedCallData(
            "call data is not in canonical form".to_string(),
        ));
    }

    Ok(Some(DecodedCall {
        fragment: fragment.clone(),
        parameters,
    }))
}

/// Render the output of a call to `fragment`
pub fn decode_transaction_result(
    fragment: &FunctionFragment,
    data: &[u8],
) -> Result<Vec<String>, DecodeError> {
    if data.is_empty() {
        return if fragment.outputs.is_empty() {
            Ok(Vec::new())
        } else {
            Err(DecodeError::NoResultData)
        };
    }
    decode_rendered(&fragment.outputs, data)
}

/// Parse hex text with an optional `0x` prefix; blank text is empty data
pub fn parse_hex_data(text: &str) -> Result<Vec<u8>, DecodeError> {
    let text = text.trim();
    let hex_part = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);

    if hex_part.len() % 2 != 0 {
        return Err(DecodeError::InvalidHex(
            "odd number of hex digits".to_string(),
        ));
    }
    hex::decode(hex_part).map_err(|e| DecodeError::InvalidHex(e.to_string()))
}

/// Lowercase `0x`-prefixed hex
pub fn to_hex_data(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

fn decode_rendered(params: &[ParamType], data: &[u8]) -> Result<Vec<String>, DecodeError> {
    let ty = DynSolType::Tuple(params.iter().map(ParamType::to_dyn_type).collect());
    let decoded = ty
        .abi_decode_params(data)
        .map_err(|e| DecodeError::MalformedCallData(e.to_string()))?;

    let values = match decoded {
        DynSolValue::Tuple(values) => values,
        other => vec![other],
    };
    if values.len() != params.len() {
        return Err(DecodeError::MalformedCallData(format!(
            "expected {} values, decoded {}",
            params.len(),
            values.len()
        )));
    }

    Ok(params
        .iter()
        .zip(&values)
        .map(|(param, value)| to_editable_string(value, param))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethereum::example::example_for;

    const TOKEN_ABI: &str = r#"[
        "function transfer(address to, uint256 amount) returns (bool)",
        "function configure(uint256 limit, bool enabled, address admin)",
        "function pair() view returns (uint256[2])",
        "function poke()"
    ]"#;

    fn interface() -> Interface {
        Interface::parse(TOKEN_ABI).unwrap()
    }

    #[test]
    fn test_transfer_round_trip() {
        let iface = interface();
        let transfer = iface.find_function("transfer").unwrap();
        let recipient = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

        let data = encode_transaction_data(
            Some(transfer),
            &[recipient.to_string(), "1000".to_string()],
        )
        .unwrap();
        let hex = to_hex_data(&data);
        assert!(hex.starts_with("0xa9059cbb"));
        assert_eq!(data.len(), 4 + 64);

        let decoded = decode_transaction_data(&iface, &hex).unwrap().unwrap();
        assert_eq!(&decoded.fragment, transfer);
        assert_eq!(decoded.parameters[0].to_lowercase(), recipient);
        assert_eq!(decoded.parameters[1], "1000");
    }

    #[test]
    fn test_no_function_encodes_empty() {
        assert!(encode_transaction_data(None, &[]).unwrap().is_empty());

        let iface = interface();
        let poke = iface.find_function("poke").unwrap();
        let data = encode_transaction_data(Some(poke), &[]).unwrap();
        assert_eq!(data.len(), 4);
        let decoded = decode_transaction_data(&iface, &to_hex_data(&data))
            .unwrap()
            .unwrap();
        assert!(decoded.parameters.is_empty());
    }

    #[test]
    fn test_selector_miss_is_not_an_error() {
        let iface = interface();
        assert_eq!(decode_transaction_data(&iface, "0xdeadbeef").unwrap(), None);
        assert_eq!(decode_transaction_data(&iface, "0x1234").unwrap(), None);
        assert_eq!(decode_transaction_data(&iface, "").unwrap(), None);
        assert_eq!(decode_transaction_data(&iface, "0x").unwrap(), None);
    }

    #[test]
    fn test_invalid_hex() {
        let iface = interface();
        assert!(matches!(
            decode_transaction_data(&iface, "0xzz"),
            Err(DecodeError::InvalidHex(_))
        ));
        assert!(matches!(
            decode_transaction_data(&iface, "0xabc"),
            Err(DecodeError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_truncated_body_is_malformed() {
        let iface = interface();
        let text = format!("0xa9059cbb{}", "00".repeat(32));
        assert!(matches!(
            decode_transaction_data(&iface, &text),
            Err(DecodeError::MalformedCallData(_))
        ));
    }

    #[test]
    fn test_error_points_at_failing_parameter() {
        let iface = interface();
        let configure = iface.find_function("configure").unwrap();

        let err = encode_transaction_data(
            Some(configure),
            &[
                "1".to_string(),
                "TRUE".to_string(),
                "0x0000000000000000000000000000000000000000".to_string(),
            ],
        )
        .unwrap_err();

        assert_eq!(err.index, 1);
        assert_eq!(err.source, FormatError::InvalidBoolean);
        assert!(err.to_string().starts_with("Invalid parameter #2"));
    }

    fn word(value: u64) -> String {
        format!("{:064x}", value)
    }

    #[test]
    fn test_out_of_range_words_are_malformed() {
        let iface = Interface::parse(
            r#"["function f(uint8 small, bool flag)", "function g(int8 delta)"]"#,
        )
        .unwrap();
        let f = iface.find_function("f").unwrap().selector_hex();
        let g = iface.find_function("g").unwrap().selector_hex();

        let wide_uint = format!("{}{}{}", f, word(0x1ff), word(1));
        let err = decode_transaction_data(&iface, &wide_uint).unwrap_err();
        assert!(matches!(&err, DecodeError::MalformedCallData(m) if m.contains("Invalid parameter #1")));

        let wide_bool = format!("{}{}{}", f, word(0xff), word(2));
        assert!(matches!(
            decode_transaction_data(&iface, &wide_bool),
            Err(DecodeError::MalformedCallData(_))
        ));

        let unsigned_int8 = format!("{}{}", g, word(0x80));
        assert!(matches!(
            decode_transaction_data(&iface, &unsigned_int8),
            Err(DecodeError::MalformedCallData(_))
        ));

        let negative = format!("{}{}", g, "f".repeat(62) + "80");
        let decoded = decode_transaction_data(&iface, &negative).unwrap().unwrap();
        assert_eq!(decoded.parameters, vec!["-128"]);

        let in_range = format!("{}{}{}", f, word(0xff), word(1));
        let decoded = decode_transaction_data(&iface, &in_range).unwrap().unwrap();
        assert_eq!(decoded.parameters, vec!["255", "true"]);
    }

    #[test]
    fn test_structured_encode_decode_inverse() {
        let iface = Interface::parse(
            r#"["function f((address,uint256)[2] pairs, bytes4 tag, string[] notes, int24 delta)"]"#,
        )
        .unwrap();
        let f = iface.find_function("f").unwrap();

        let examples: Vec<String> = f.inputs.iter().map(example_for).collect();
        let data = encode_transaction_data(Some(f), &examples).unwrap();
        let decoded = decode_transaction_data(&iface, &to_hex_data(&data))
            .unwrap()
            .unwrap();
        assert_eq!(&decoded.fragment, f);
        assert_eq!(decoded.parameters, examples);

        let values = vec![
            r#"[["0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed", "1"], ["0x0000000000000000000000000000000000000000", "115792089237316195423570985008687907853269984665640564039457584007913129639935"]]"#.to_string(),
            "0xdeadbeef".to_string(),
            r#"["hello", "", "with "quotes""]"#.to_string(),
            "-8388608".to_string(),
        ];
        let data = encode_transaction_data(Some(f), &values).unwrap();
        let decoded = decode_transaction_data(&iface, &to_hex_data(&data))
            .unwrap()
            .unwrap();
        assert_eq!(&decoded.fragment, f);
        for ((param, typed), rendered) in f.inputs.iter().zip(&values).zip(&decoded.parameters) {
            assert_eq!(
                from_editable_string(rendered, param).unwrap(),
                from_editable_string(typed, param).unwrap()
            );
        }
        assert_eq!(decoded.parameters[3], "-8388608");
        assert_eq!(
            encode_transaction_data(Some(f), &decoded.parameters).unwrap(),
            data
        );
    }

    #[test]
    fn test_view_result_decoding() {
        let iface = interface();
        let pair = iface.find_function("pair").unwrap();
        assert!(pair.inputs.is_empty());

        let mut result = vec![0u8; 64];
        result[31] = 7;
        result[63] = 9;
        assert_eq!(
            decode_transaction_result(pair, &result).unwrap(),
            vec!["[\n \"7\",\n \"9\"\n]".to_string()]
        );

        assert_eq!(
            decode_transaction_result(pair, &[]),
            Err(DecodeError::NoResultData)
        );
        let poke = iface.find_function("poke").unwrap();
        assert!(decode_transaction_result(poke, &[]).unwrap().is_empty());
    }
}
