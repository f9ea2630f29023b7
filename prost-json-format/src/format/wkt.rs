use prost::Message as _;
use prost_reflect::{DynamicMessage, ReflectMessage as _};
use prost_types::{Duration, FieldMask, Timestamp};
use serde_json::Value as Json;

use super::FormatError;
use super::number::lexical;
use super::time::{format_duration, format_timestamp, parse_duration, parse_timestamp};

/// Types with a dedicated JSON representation, keyed by full name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WellKnownType {
    Any,
    /// One of the nine single-`value` wrapper messages.
    Wrapper,
    Timestamp,
    Duration,
    FieldMask,
    Struct,
    Value,
    ListValue,
}

impl WellKnownType {
    pub(crate) fn from_full_name(full_name: &str) -> Option<Self> {
        let kind = match full_name {
            "google.protobuf.Any" => Self::Any,
            "google.protobuf.BoolValue"
            | "google.protobuf.Int32Value"
            | "google.protobuf.UInt32Value"
            | "google.protobuf.Int64Value"
            | "google.protobuf.UInt64Value"
            | "google.protobuf.FloatValue"
            | "google.protobuf.DoubleValue"
            | "google.protobuf.StringValue"
            | "google.protobuf.BytesValue" => Self::Wrapper,
            "google.protobuf.Timestamp" => Self::Timestamp,
            "google.protobuf.Duration" => Self::Duration,
            "google.protobuf.FieldMask" => Self::FieldMask,
            "google.protobuf.Struct" => Self::Struct,
            "google.protobuf.Value" => Self::Value,
            "google.protobuf.ListValue" => Self::ListValue,
            _ => return None,
        };
        Some(kind)
    }
}

/// Reads a dynamic message as a concrete prost type through its binary form.
fn transcode<T: prost::Message + Default>(message: &DynamicMessage) -> Result<T, FormatError> {
    T::decode(message.encode_to_vec().as_slice()).map_err(|err| {
        FormatError::new(format!(
            "Invalid {}: {err}",
            message.descriptor().full_name()
        ))
    })
}

fn merge_encoded<T: prost::Message>(
    value: &T,
    message: &mut DynamicMessage,
) -> Result<(), FormatError> {
    prost::Message::merge(message, value.encode_to_vec().as_slice())
        .map_err(|err| FormatError::new(format!("Failed to merge well-known value: {err}")))
}

fn string_node<'a>(json: &'a Json, what: &str) -> Result<std::borrow::Cow<'a, str>, FormatError> {
    lexical(json).ok_or_else(|| FormatError::new(format!("Failed to parse {what}: {json}")))
}

pub(crate) fn print_timestamp(message: &DynamicMessage) -> Result<Json, FormatError> {
    format_timestamp(&transcode::<Timestamp>(message)?).map(Json::String)
}

pub(crate) fn merge_timestamp(
    json: &Json,
    message: &mut DynamicMessage,
) -> Result<(), FormatError> {
    let value = parse_timestamp(&string_node(json, "timestamp")?)?;
    merge_encoded(&value, message)
}

pub(crate) fn print_duration(message: &DynamicMessage) -> Result<Json, FormatError> {
    format_duration(&transcode::<Duration>(message)?).map(Json::String)
}

pub(crate) fn merge_duration(json: &Json, message: &mut DynamicMessage) -> Result<(), FormatError> {
    let value = parse_duration(&string_node(json, "duration")?)?;
    merge_encoded(&value, message)
}

pub(crate) fn print_field_mask(message: &DynamicMessage) -> Result<Json, FormatError> {
    field_mask_to_string(&transcode::<FieldMask>(message)?).map(Json::String)
}

pub(crate) fn merge_field_mask(
    json: &Json,
    message: &mut DynamicMessage,
) -> Result<(), FormatError> {
    let value = field_mask_from_str(&string_node(json, "field mask")?)?;
    merge_encoded(&value, message)
}

fn field_mask_to_string(mask: &FieldMask) -> Result<String, FormatError> {
    let mut paths = Vec::with_capacity(mask.paths.len());
    for path in &mask.paths {
        let mut segments = Vec::new();
        for segment in path.split('.') {
            let camel = snake_to_lower_camel(segment);
            if segment.is_empty() || lower_camel_to_snake(&camel) != segment {
                return Err(FormatError::new(format!(
                    "Field mask path cannot be expressed in JSON: {path}"
                )));
            }
            segments.push(camel);
        }
        paths.push(segments.join("."));
    }
    Ok(paths.join(","))
}

fn field_mask_from_str(text: &str) -> Result<FieldMask, FormatError> {
    if text.is_empty() {
        return Ok(FieldMask::default());
    }
    let mut paths = Vec::new();
    for path in text.split(',') {
        if path.is_empty() || path.split('.').any(str::is_empty) {
            return Err(FormatError::new(format!("Invalid field mask: {text}")));
        }
        if path.contains('_') {
            return Err(FormatError::new(format!(
                "Field mask path must be lowerCamelCase: {path}"
            )));
        }
        paths.push(lower_camel_to_snake(path));
    }
    Ok(FieldMask { paths })
}

fn snake_to_lower_camel(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut upper_next = false;
    for ch in value.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            result.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}

fn lower_camel_to_snake(value: &str) -> String {
    let mut result = String::with_capacity(value.len() + 4);
    for ch in value.chars() {
        if ch.is_ascii_uppercase() {
            result.push('_');
            result.push(ch.to_ascii_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(paths: &[&str]) -> FieldMask {
        FieldMask {
            paths: paths.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn table_covers_wrappers() {
        assert_eq!(
            WellKnownType::from_full_name("google.protobuf.BytesValue"),
            Some(WellKnownType::Wrapper)
        );
        assert_eq!(
            WellKnownType::from_full_name("google.protobuf.Any"),
            Some(WellKnownType::Any)
        );
        assert_eq!(WellKnownType::from_full_name("google.protobuf.Empty"), None);
        assert_eq!(WellKnownType::from_full_name("example.Nested"), None);
    }

    #[test]
    fn field_mask_prints_camel_case_paths() {
        assert_eq!(
            field_mask_to_string(&mask(&["foo_bar", "baz.qux_quux", "a"])).unwrap(),
            "fooBar,baz.quxQuux,a"
        );
        assert_eq!(field_mask_to_string(&mask(&[])).unwrap(), "");
    }

    #[test]
    fn field_mask_rejects_paths_that_do_not_round_trip() {
        assert!(field_mask_to_string(&mask(&["fooBar"])).is_err());
        assert!(field_mask_to_string(&mask(&["foo__bar"])).is_err());
        assert!(field_mask_to_string(&mask(&["foo_"])).is_err());
        assert!(field_mask_to_string(&mask(&["a..b"])).is_err());
    }

    #[test]
    fn field_mask_parses_camel_case_paths() {
        assert_eq!(
            field_mask_from_str("fooBar,baz.quxQuux").unwrap(),
            mask(&["foo_bar", "baz.qux_quux"])
        );
        assert_eq!(field_mask_from_str("").unwrap(), mask(&[]));
        assert!(field_mask_from_str("foo_bar").is_err());
        assert!(field_mask_from_str("a,,b").is_err());
    }
}
