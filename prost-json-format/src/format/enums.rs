use prost_reflect::EnumDescriptor;
use serde_json::Value as Json;
use tracing::debug;

use super::FormatError;
use super::number::{int32_from_str, lexical};

/// Marker enum whose only value prints as JSON `null`.
pub(crate) const NULL_VALUE_ENUM: &str = "google.protobuf.NullValue";

pub(crate) fn is_null_value(descriptor: &EnumDescriptor) -> bool {
    descriptor.full_name() == NULL_VALUE_ENUM
}

pub(crate) fn print_enum(descriptor: &EnumDescriptor, number: i32, as_ints: bool) -> Json {
    if is_null_value(descriptor) {
        return Json::Null;
    }
    match descriptor.get_value(number) {
        Some(value) if !as_ints => Json::String(value.name().to_string()),
        // Unknown numbers have no name to print.
        _ => Json::from(number),
    }
}

/// Resolves an enum token by name, then by number.
///
/// Proto3 enums are open, so any int32 is accepted. Proto2 enums only accept
/// declared numbers. `Ok(None)` means the token was unresolvable and
/// `ignoring_unknown` allowed it to be dropped.
pub(crate) fn parse_enum(
    descriptor: &EnumDescriptor,
    json: &Json,
    ignoring_unknown: bool,
) -> Result<Option<i32>, FormatError> {
    let Some(text) = lexical(json) else {
        if ignoring_unknown {
            debug!(
                type_name = %descriptor.full_name(),
                value = %json,
                "dropping non-scalar enum value"
            );
            return Ok(None);
        }
        return Err(FormatError::new(format!(
            "Invalid enum value: {json} for enum type: {}",
            descriptor.full_name()
        )));
    };

    if let Some(value) = descriptor.get_value_by_name(&text) {
        return Ok(Some(value.number()));
    }

    let resolved = int32_from_str(&text).ok().filter(|number| {
        is_open(descriptor) || descriptor.get_value(*number).is_some()
    });
    match resolved {
        Some(number) => Ok(Some(number)),
        None if ignoring_unknown => {
            debug!(
                type_name = %descriptor.full_name(),
                value = %text,
                "dropping unresolvable enum value"
            );
            Ok(None)
        }
        None => Err(FormatError::new(format!(
            "Invalid enum value: {text} for enum type: {}",
            descriptor.full_name()
        ))),
    }
}

fn is_open(descriptor: &EnumDescriptor) -> bool {
    descriptor.parent_file().file_descriptor_proto().syntax() == "proto3"
}
