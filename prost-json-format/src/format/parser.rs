use std::collections::HashMap;

use prost::Message as _;
use prost::bytes::Bytes;
use prost_reflect::{
    DynamicMessage, FieldDescriptor, Kind, MessageDescriptor, ReflectMessage as _, Value,
};
use serde_json::Value as Json;
use tracing::{debug, trace};

use super::enums::{is_null_value, parse_enum};
use super::map::parse_key;
use super::number::lexical;
use super::registry::{LegacyTypeRegistry, Registry, TypeRegistry, TypeUrlResolver};
use super::scalar::parse_scalar;
use super::wkt::{WellKnownType, merge_duration, merge_field_mask, merge_timestamp};
use super::wrappers::MessageSeed;
use super::{ConfigError, FormatError};

/// How deep nested messages may go before parsing is abandoned.
pub const DEFAULT_RECURSION_LIMIT: usize = 100;

const VALUE_TYPE: &str = "google.protobuf.Value";

/// Converts proto3 JSON to dynamic messages.
///
/// A parser is immutable once built and can be shared between threads.
#[derive(Debug, Clone)]
pub struct Parser {
    registry: Registry,
    ignoring_unknown_fields: bool,
    recursion_limit: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self {
            registry: Registry::Empty,
            ignoring_unknown_fields: false,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ParserBuilder {
        ParserBuilder::default()
    }

    /// Merges `json` into `message`.
    ///
    /// # Errors
    /// Returns an error on the first JSON member that does not fit the
    /// message's schema. `message` is then partially merged and should be
    /// discarded.
    pub fn merge(&self, json: &Json, message: &mut DynamicMessage) -> Result<(), FormatError> {
        ParserImpl::new(self).merge(json, message)
    }

    /// Parses `json` into a new message of type `descriptor`.
    ///
    /// # Errors
    /// Fails under the same conditions as [`Parser::merge`].
    pub fn parse(
        &self,
        json: &Json,
        descriptor: MessageDescriptor,
    ) -> Result<DynamicMessage, FormatError> {
        let mut message = DynamicMessage::new(descriptor);
        self.merge(json, &mut message)?;
        Ok(message)
    }

    /// Parses JSON text into a new message of type `descriptor`.
    ///
    /// # Errors
    /// Returns an error when `text` is not valid JSON, or under the same
    /// conditions as [`Parser::merge`].
    pub fn parse_str(
        &self,
        text: &str,
        descriptor: MessageDescriptor,
    ) -> Result<DynamicMessage, FormatError> {
        let json: Json = serde_json::from_str(text)
            .map_err(|err| FormatError::new(format!("Invalid JSON: {err}")))?;
        self.parse(&json, descriptor)
    }

    /// A [`serde::de::DeserializeSeed`] producing messages of type `descriptor`.
    pub fn seed(&self, descriptor: MessageDescriptor) -> MessageSeed<'_> {
        MessageSeed::new(self, descriptor)
    }
}

/// State for a single merge call.
struct ParserImpl<'a> {
    parser: &'a Parser,
    current_depth: usize,
    /// Declared and JSON names per message full name.
    field_names: HashMap<String, HashMap<String, FieldDescriptor>>,
}

impl<'a> ParserImpl<'a> {
    fn new(parser: &'a Parser) -> Self {
        Self {
            parser,
            current_depth: 0,
            field_names: HashMap::new(),
        }
    }

    fn merge(&mut self, json: &Json, message: &mut DynamicMessage) -> Result<(), FormatError> {
        let descriptor = message.descriptor();
        match WellKnownType::from_full_name(descriptor.full_name()) {
            Some(kind) => {
                trace!(type_name = %descriptor.full_name(), ?kind, "parsing well-known type");
                self.merge_well_known(kind, json, message)
            }
            None => self.merge_message(json, message, false),
        }
    }

    fn field_by_name(
        &mut self,
        descriptor: &MessageDescriptor,
        name: &str,
    ) -> Option<FieldDescriptor> {
        self.field_names
            .entry(descriptor.full_name().to_string())
            .or_insert_with(|| {
                let mut names = HashMap::new();
                for field in descriptor.fields() {
                    names.insert(field.name().to_string(), field.clone());
                    names.insert(field.json_name().to_string(), field);
                }
                names
            })
            .get(name)
            .cloned()
    }

    fn merge_message(
        &mut self,
        json: &Json,
        message: &mut DynamicMessage,
        skip_type_url: bool,
    ) -> Result<(), FormatError> {
        let Json::Object(object) = json else {
            return Err(FormatError::new(format!(
                "Expect message object but got: {json}"
            )));
        };
        let descriptor = message.descriptor();
        for (key, value) in object {
            if skip_type_url && key == "@type" {
                continue;
            }
            let Some(field) = self.field_by_name(&descriptor, key) else {
                if self.parser.ignoring_unknown_fields {
                    debug!(
                        type_name = %descriptor.full_name(),
                        field = %key,
                        "skipping unknown field"
                    );
                    continue;
                }
                return Err(FormatError::new(format!(
                    "Cannot find field: {key} in message {}",
                    descriptor.full_name()
                )));
            };
            self.merge_field(&field, value, message)?;
        }
        Ok(())
    }

    fn merge_well_known(
        &mut self,
        kind: WellKnownType,
        json: &Json,
        message: &mut DynamicMessage,
    ) -> Result<(), FormatError> {
        match kind {
            WellKnownType::Any => self.merge_any(json, message),
            WellKnownType::Wrapper => {
                let field = named_field(message, "value")?;
                match self.parse_field_value(&field, json)? {
                    Some(value) => set_field(message, &field, value),
                    None => Ok(()),
                }
            }
            WellKnownType::Timestamp => merge_timestamp(json, message),
            WellKnownType::Duration => merge_duration(json, message),
            WellKnownType::FieldMask => merge_field_mask(json, message),
            WellKnownType::Struct => {
                let field = named_field(message, "fields")?;
                self.merge_map_field(&field, json, message)
            }
            WellKnownType::Value => self.merge_value(json, message),
            WellKnownType::ListValue => {
                let field = named_field(message, "values")?;
                self.merge_repeated_field(&field, json, message)
            }
        }
    }

    fn merge_any(&mut self, json: &Json, message: &mut DynamicMessage) -> Result<(), FormatError> {
        let type_url_field = named_field(message, "type_url")?;
        let value_field = named_field(message, "value")?;
        if !matches!(type_url_field.kind(), Kind::String)
            || !matches!(value_field.kind(), Kind::Bytes)
        {
            return Err(FormatError::new("Invalid Any type."));
        }

        let Json::Object(object) = json else {
            return Err(FormatError::new(format!(
                "Expect message object but got: {json}"
            )));
        };
        if object.is_empty() {
            return Ok(());
        }
        let Some(type_url) = object.get("@type") else {
            return Err(FormatError::new(format!(
                "Missing type url when parsing: {json}"
            )));
        };
        let type_url = lexical(type_url).unwrap_or_default().into_owned();
        let content_type = self
            .parser
            .registry
            .resolve_type_url(&type_url)?
            .ok_or_else(|| FormatError::new(format!("Cannot resolve type: {type_url}")))?;

        // Content counts as one level so that nested envelopes stay bounded.
        let mut content = DynamicMessage::new(content_type.clone());
        self.descend(&content_type, |state| {
            match WellKnownType::from_full_name(content_type.full_name()) {
                Some(kind) => match object.get("value") {
                    Some(value) => state.merge_well_known(kind, value, &mut content),
                    None => Ok(()),
                },
                None => state.merge_message(json, &mut content, true),
            }
        })?;

        set_field(message, &type_url_field, Value::String(type_url))?;
        set_field(
            message,
            &value_field,
            Value::Bytes(Bytes::from(content.encode_to_vec())),
        )
    }

    fn merge_value(
        &mut self,
        json: &Json,
        message: &mut DynamicMessage,
    ) -> Result<(), FormatError> {
        let (name, value) = match json {
            Json::Bool(flag) => ("bool_value", Value::Bool(*flag)),
            Json::Number(number) => {
                let number = number
                    .as_f64()
                    .ok_or_else(|| FormatError::new(format!("Not a double value: {number}")))?;
                ("number_value", Value::F64(number))
            }
            Json::Null => ("null_value", Value::EnumNumber(0)),
            Json::String(text) => ("string_value", Value::String(text.clone())),
            Json::Object(_) => ("struct_value", self.merge_nested(message, "struct_value", json)?),
            Json::Array(_) => ("list_value", self.merge_nested(message, "list_value", json)?),
        };
        let field = named_field(message, name)?;
        set_field(message, &field, value)
    }

    /// Merges `json` into a fresh message for the named message-typed field.
    fn merge_nested(
        &mut self,
        message: &DynamicMessage,
        name: &str,
        json: &Json,
    ) -> Result<Value, FormatError> {
        let field = named_field(message, name)?;
        let Kind::Message(descriptor) = field.kind() else {
            return Err(FormatError::new("Invalid Value type."));
        };
        let mut nested = DynamicMessage::new(descriptor);
        self.merge(json, &mut nested)?;
        Ok(Value::Message(nested))
    }

    fn merge_field(
        &mut self,
        field: &FieldDescriptor,
        json: &Json,
        message: &mut DynamicMessage,
    ) -> Result<(), FormatError> {
        if message.has_field(field) {
            return Err(FormatError::new(format!(
                "Field {} has already been set.",
                field.full_name()
            )));
        }
        let repeated = field.is_list() || field.is_map();
        if repeated && json.is_null() {
            return Ok(());
        }

        if field.is_map() {
            self.merge_map_field(field, json, message)
        } else if field.is_list() {
            self.merge_repeated_field(field, json, message)
        } else if field.containing_oneof().is_some() {
            self.merge_oneof_field(field, json, message)
        } else {
            // Null means absent.
            match self.parse_field_value(field, json)? {
                Some(value) => set_field(message, field, value),
                None => Ok(()),
            }
        }
    }

    fn merge_oneof_field(
        &mut self,
        field: &FieldDescriptor,
        json: &Json,
        message: &mut DynamicMessage,
    ) -> Result<(), FormatError> {
        let Some(value) = self.parse_field_value(field, json)? else {
            return Ok(());
        };
        if let Some(oneof) = field.containing_oneof()
            && let Some(other) = oneof.fields().find(|other| message.has_field(other))
        {
            return Err(FormatError::new(format!(
                "Cannot set field {} because another field {} belonging to the same oneof has \
                 already been set.",
                field.full_name(),
                other.full_name()
            )));
        }
        set_field(message, field, value)
    }

    fn merge_map_field(
        &mut self,
        field: &FieldDescriptor,
        json: &Json,
        message: &mut DynamicMessage,
    ) -> Result<(), FormatError> {
        let Json::Object(object) = json else {
            return Err(FormatError::new(format!(
                "Expect a map object but found: {json}"
            )));
        };
        let Kind::Message(entry) = field.kind() else {
            return Err(FormatError::new(format!(
                "Invalid map field: {}",
                field.full_name()
            )));
        };
        let key_field = entry.map_entry_key_field();
        let value_field = entry.map_entry_value_field();

        let mut map = HashMap::with_capacity(object.len());
        for (key, value) in object {
            let key = parse_key(&key_field.kind(), key)?;
            let Some(value) = self.parse_field_value(&value_field, value)? else {
                let droppable = matches!(value_field.kind(), Kind::Enum(_));
                if self.parser.ignoring_unknown_fields && droppable {
                    continue;
                }
                return Err(FormatError::new("Map value cannot be null."));
            };
            map.insert(key, value);
        }
        set_field(message, field, Value::Map(map))
    }

    fn merge_repeated_field(
        &mut self,
        field: &FieldDescriptor,
        json: &Json,
        message: &mut DynamicMessage,
    ) -> Result<(), FormatError> {
        let Json::Array(items) = json else {
            return Err(FormatError::new(format!(
                "Expected an array for {} but found {json}",
                field.name()
            )));
        };

        let mut values = Vec::with_capacity(items.len());
        for item in items {
            match self.parse_field_value(field, item)? {
                Some(value) => values.push(value),
                None if self.parser.ignoring_unknown_fields
                    && matches!(field.kind(), Kind::Enum(_)) => {}
                None => {
                    return Err(FormatError::new(format!(
                        "Repeated field elements cannot be null in field: {}",
                        field.full_name()
                    )));
                }
            }
        }
        set_field(message, field, Value::List(values))
    }

    /// Parses one value of `field`'s kind. `None` means the value is absent:
    /// a JSON null, or an enum token dropped under unknown-field tolerance.
    fn parse_field_value(
        &mut self,
        field: &FieldDescriptor,
        json: &Json,
    ) -> Result<Option<Value>, FormatError> {
        let kind = field.kind();
        if json.is_null() {
            return match kind {
                // Only Value and NullValue give null a meaning of its own.
                Kind::Message(descriptor) if descriptor.full_name() == VALUE_TYPE => {
                    let mut value = DynamicMessage::new(descriptor);
                    let null_value = named_field(&value, "null_value")?;
                    set_field(&mut value, &null_value, Value::EnumNumber(0))?;
                    Ok(Some(Value::Message(value)))
                }
                Kind::Enum(descriptor) if is_null_value(&descriptor) => {
                    Ok(Some(Value::EnumNumber(0)))
                }
                _ => Ok(None),
            };
        }
        if json.is_object() && !matches!(kind, Kind::Message(_)) {
            return Err(FormatError::new(format!(
                "Invalid value: {json} for expected type: {kind:?}"
            )));
        }

        match kind {
            Kind::Enum(descriptor) => Ok(parse_enum(
                &descriptor,
                json,
                self.parser.ignoring_unknown_fields,
            )?
            .map(Value::EnumNumber)),
            Kind::Message(descriptor) => {
                let mut nested = DynamicMessage::new(descriptor.clone());
                self.descend(&descriptor, |state| state.merge(json, &mut nested))?;
                Ok(Some(Value::Message(nested)))
            }
            _ => parse_scalar(&kind, json).map(Some),
        }
    }

    /// Runs `merge` one message level deeper, failing once the limit is reached.
    fn descend(
        &mut self,
        descriptor: &MessageDescriptor,
        merge: impl FnOnce(&mut Self) -> Result<(), FormatError>,
    ) -> Result<(), FormatError> {
        if self.current_depth >= self.parser.recursion_limit {
            debug!(
                type_name = %descriptor.full_name(),
                limit = self.parser.recursion_limit,
                "hit recursion limit"
            );
            return Err(FormatError::new("Hit recursion limit."));
        }
        self.current_depth += 1;
        let merged = merge(self);
        self.current_depth -= 1;
        merged
    }
}

fn named_field(message: &DynamicMessage, name: &str) -> Result<FieldDescriptor, FormatError> {
    let descriptor = message.descriptor();
    descriptor.get_field_by_name(name).ok_or_else(|| {
        FormatError::new(format!(
            "Invalid {} type: missing field {name}",
            descriptor.full_name()
        ))
    })
}

fn set_field(
    message: &mut DynamicMessage,
    field: &FieldDescriptor,
    value: Value,
) -> Result<(), FormatError> {
    message.try_set_field(field, value).map_err(|err| {
        FormatError::new(format!(
            "Invalid value for field {}: {err}",
            field.full_name()
        ))
    })
}

/// Collects [`Parser`] options. The first misconfiguration is reported by
/// [`ParserBuilder::build`].
#[derive(Debug, Default)]
pub struct ParserBuilder {
    parser: Parser,
    error: Option<ConfigError>,
}

impl ParserBuilder {
    pub(crate) fn install(mut self, registry: Registry) -> Self {
        if let Err(error) = self.parser.registry.install(registry) {
            self.error.get_or_insert(error);
        }
        self
    }

    /// Resolves `Any` type URLs through `registry`.
    #[must_use]
    pub fn using_type_registry(self, registry: TypeRegistry) -> Self {
        self.install(Registry::Current(registry))
    }

    #[must_use]
    pub fn using_legacy_type_registry(self, registry: LegacyTypeRegistry) -> Self {
        self.install(Registry::Legacy(registry))
    }

    /// Skips JSON members that name no field, and drops enum tokens that
    /// name no value where the field allows it.
    #[must_use]
    pub fn ignoring_unknown_fields(mut self) -> Self {
        self.parser.ignoring_unknown_fields = true;
        self
    }

    #[must_use]
    pub fn recursion_limit(mut self, limit: usize) -> Self {
        self.parser.recursion_limit = limit;
        self
    }

    /// # Errors
    /// Returns an error when two registries were supplied.
    pub fn build(self) -> Result<Parser, ConfigError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.parser),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;

    fn object(entries: &[(&str, Json)]) -> Json {
        Json::Object(
            entries
                .iter()
                .map(|(key, value)| ((*key).to_string(), value.clone()))
                .collect::<Map<String, Json>>(),
        )
    }

    #[test]
    fn field_names_resolve_both_spellings() {
        let descriptor = prost_json_format_example::name();
        let parser = Parser::new();
        let mut state = ParserImpl::new(&parser);

        let declared = state.field_by_name(&descriptor, "first_name").unwrap();
        let json = state.field_by_name(&descriptor, "firstName").unwrap();
        assert_eq!(declared, json);
        assert!(state.field_by_name(&descriptor, "FirstName").is_none());
        assert_eq!(state.field_names.len(), 1);
    }

    #[test]
    fn same_field_under_both_spellings_is_rejected() {
        let json = object(&[
            ("first_name", Json::from("a")),
            ("firstName", Json::from("b")),
        ]);
        let err = Parser::new()
            .parse(&json, prost_json_format_example::name())
            .unwrap_err();
        assert_eq!(err.message(), "Field example.Name.first_name has already been set.");
    }

    #[test]
    fn depth_is_restored_after_nested_errors() {
        let parser = Parser::new();
        let mut state = ParserImpl::new(&parser);
        let mut message = DynamicMessage::new(prost_json_format_example::recursive());
        let json = object(&[("child", object(&[("depth", Json::from("x"))]))]);

        assert!(state.merge(&json, &mut message).is_err());
        assert_eq!(state.current_depth, 0);
    }

    #[test]
    fn builder_rejects_second_registry() {
        let err = Parser::builder()
            .using_legacy_type_registry(LegacyTypeRegistry::new(
                prost_json_format_example::pool(),
            ))
            .using_type_registry(TypeRegistry::empty())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::RegistryAlreadySet);
    }
}
