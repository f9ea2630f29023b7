use std::collections::HashMap;

use prost_reflect::{Kind, MapKey, Value};
use serde_json::Value as Json;

use super::FormatError;
use super::scalar::parse_scalar;

/// The JSON object key for a map entry. Map keys are always strings in JSON.
pub(crate) fn key_text(key: &MapKey) -> String {
    match key {
        MapKey::Bool(value) => value.to_string(),
        MapKey::I32(value) => value.to_string(),
        MapKey::I64(value) => value.to_string(),
        MapKey::U32(value) => value.to_string(),
        MapKey::U64(value) => value.to_string(),
        MapKey::String(value) => value.clone(),
    }
}

/// Re-parses a JSON object key as the declared key type.
pub(crate) fn parse_key(kind: &Kind, text: &str) -> Result<MapKey, FormatError> {
    match parse_scalar(kind, &Json::String(text.to_string()))? {
        Value::Bool(value) => Ok(MapKey::Bool(value)),
        Value::I32(value) => Ok(MapKey::I32(value)),
        Value::I64(value) => Ok(MapKey::I64(value)),
        Value::U32(value) => Ok(MapKey::U32(value)),
        Value::U64(value) => Ok(MapKey::U64(value)),
        Value::String(value) => Ok(MapKey::String(value)),
        other => Err(FormatError::new(format!("Invalid map key type: {other:?}"))),
    }
}

/// Entries paired with their key text, optionally ordered by the key's UTF-8 bytes.
pub(crate) fn entries(map: &HashMap<MapKey, Value>, sorted: bool) -> Vec<(String, &Value)> {
    let mut entries: Vec<(String, &Value)> =
        map.iter().map(|(key, value)| (key_text(key), value)).collect();
    if sorted {
        entries.sort_by(|(left, _), (right, _)| left.as_bytes().cmp(right.as_bytes()));
    }
    entries
}
