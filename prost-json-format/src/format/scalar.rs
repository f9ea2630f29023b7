use base64::Engine as _;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::prelude::BASE64_STANDARD;
use prost::bytes::Bytes;
use prost_reflect::{Kind, Value};
use serde_json::Value as Json;

use super::FormatError;
use super::number::{
    bool_from_str, double_from_str, float_from_str, int32_from_str, int64_from_str, lexical,
    print_double, print_float, uint32_from_str, uint64_from_str,
};

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Prints a scalar field value.
///
/// Message and enum values are handled by the printer and must not reach here.
pub(crate) fn print_scalar(value: &Value) -> Result<Json, FormatError> {
    let json = match value {
        Value::I32(value) => Json::from(*value),
        Value::U32(value) => Json::from(*value),
        // 64-bit integers exceed what JSON readers hold exactly as doubles.
        Value::I64(value) => Json::String(value.to_string()),
        Value::U64(value) => Json::String(value.to_string()),
        Value::Bool(value) => Json::Bool(*value),
        Value::F32(value) => print_float(*value),
        Value::F64(value) => print_double(*value),
        Value::String(value) => Json::String(value.clone()),
        Value::Bytes(value) => Json::String(BASE64_STANDARD.encode(value)),
        Value::EnumNumber(_) | Value::Message(_) | Value::List(_) | Value::Map(_) => {
            return Err(FormatError::new(format!(
                "Unexpected non-scalar value: {value:?}"
            )));
        }
    };
    Ok(json)
}

/// Parses a JSON node into a scalar value of the given kind.
pub(crate) fn parse_scalar(kind: &Kind, json: &Json) -> Result<Value, FormatError> {
    let value = match kind {
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
            Value::I32(int32_from_str(&text(json, "an int32")?)?)
        }
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => {
            Value::I64(int64_from_str(&text(json, "an int64")?)?)
        }
        Kind::Uint32 | Kind::Fixed32 => Value::U32(uint32_from_str(&text(json, "an uint32")?)?),
        Kind::Uint64 | Kind::Fixed64 => Value::U64(uint64_from_str(&text(json, "an uint64")?)?),
        Kind::Float => Value::F32(float_from_str(&text(json, "a float")?)?),
        Kind::Double => Value::F64(double_from_str(&text(json, "a double")?)?),
        Kind::Bool => Value::Bool(bool_from_str(&text(json, "a bool")?)?),
        Kind::String => Value::String(text(json, "a string")?.into_owned()),
        Kind::Bytes => Value::Bytes(bytes_from_str(&text(json, "a bytes")?)?),
        Kind::Message(_) | Kind::Enum(_) => {
            return Err(FormatError::new(format!(
                "Unexpected non-scalar field kind: {kind:?}"
            )));
        }
    };
    Ok(value)
}

fn text<'a>(json: &'a Json, expected: &str) -> Result<std::borrow::Cow<'a, str>, FormatError> {
    lexical(json).ok_or_else(|| FormatError::new(format!("Not {expected} value: {json}")))
}

fn bytes_from_str(text: &str) -> Result<Bytes, FormatError> {
    STANDARD_LENIENT
        .decode(text)
        .or_else(|_| URL_SAFE_LENIENT.decode(text))
        .map(Bytes::from)
        .map_err(|err| FormatError::new(format!("Invalid bytes value: {text}: {err}")))
}
