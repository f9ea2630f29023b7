use std::collections::HashSet;

use prost_reflect::{
    Cardinality, DynamicMessage, FieldDescriptor, Kind, ReflectMessage as _, Value,
};
use serde_json::{Map, Value as Json};
use tracing::trace;

use super::enums::print_enum;
use super::map::entries;
use super::registry::{LegacyTypeRegistry, Registry, TypeRegistry, TypeUrlResolver};
use super::scalar::print_scalar;
use super::wkt::{WellKnownType, print_duration, print_field_mask, print_timestamp};
use super::wrappers::Printed;
use super::{ConfigError, FormatError};

/// Which fields are printed when they hold their default value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum DefaultValueFields {
    #[default]
    Omit,
    Always,
    /// Full names of the fields to print anyway.
    Selected(HashSet<String>),
}

/// Converts dynamic messages to proto3 JSON.
///
/// A printer is immutable once built and can be shared between threads.
#[derive(Debug, Clone, Default)]
pub struct Printer {
    registry: Registry,
    default_value_fields: DefaultValueFields,
    preserving_proto_field_names: bool,
    printing_enums_as_ints: bool,
    sorting_map_keys: bool,
    treat_default_fields_as_null: bool,
    omit_null_fields: bool,
}

impl Printer {
    /// A printer with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> PrinterBuilder {
        PrinterBuilder::default()
    }

    /// Prints `message` as a JSON tree.
    ///
    /// # Errors
    /// Returns an error when a well-known type holds an unrepresentable value or
    /// an `Any` names a type the registry cannot resolve.
    pub fn print(&self, message: &DynamicMessage) -> Result<Json, FormatError> {
        self.print_message(message)
    }

    /// Prints `message` as compact JSON text.
    ///
    /// # Errors
    /// Fails under the same conditions as [`Printer::print`].
    pub fn print_to_string(&self, message: &DynamicMessage) -> Result<String, FormatError> {
        let json = self.print(message)?;
        serde_json::to_string(&json).map_err(|err| FormatError::new(err.to_string()))
    }

    /// Wraps `message` so it serializes through this printer.
    pub fn printed<'a>(&'a self, message: &'a DynamicMessage) -> Printed<'a> {
        Printed::new(self, message)
    }

    fn print_message(&self, message: &DynamicMessage) -> Result<Json, FormatError> {
        let descriptor = message.descriptor();
        match WellKnownType::from_full_name(descriptor.full_name()) {
            Some(kind) => {
                trace!(type_name = %descriptor.full_name(), ?kind, "printing well-known type");
                self.print_well_known(kind, message)
            }
            None => self.print_fields(message, None),
        }
    }

    fn print_well_known(
        &self,
        kind: WellKnownType,
        message: &DynamicMessage,
    ) -> Result<Json, FormatError> {
        match kind {
            WellKnownType::Any => self.print_any(message),
            WellKnownType::Wrapper => {
                let field = named_field(message, "value", "Invalid Wrapper type.")?;
                self.print_single(&field, &message.get_field(&field))
            }
            WellKnownType::Timestamp => print_timestamp(message),
            WellKnownType::Duration => print_duration(message),
            WellKnownType::FieldMask => print_field_mask(message),
            WellKnownType::Struct => {
                let field = named_field(message, "fields", "Invalid Struct type.")?;
                self.print_map(&field, &message.get_field(&field))
            }
            WellKnownType::Value => self.print_value(message),
            WellKnownType::ListValue => {
                let field = named_field(message, "values", "Invalid ListValue type.")?;
                self.print_list(&field, &message.get_field(&field))
            }
        }
    }

    fn print_any(&self, message: &DynamicMessage) -> Result<Json, FormatError> {
        let invalid = || FormatError::new("Invalid Any type.");
        let type_url_field = named_field(message, "type_url", "Invalid Any type.")?;
        let value_field = named_field(message, "value", "Invalid Any type.")?;
        let Value::String(type_url) = message.get_field(&type_url_field).into_owned() else {
            return Err(invalid());
        };
        let Value::Bytes(content) = message.get_field(&value_field).into_owned() else {
            return Err(invalid());
        };
        if type_url.is_empty() && content.is_empty() {
            return Ok(Json::Object(Map::new()));
        }

        let content_type = self
            .registry
            .resolve_type_url(&type_url)?
            .ok_or_else(|| FormatError::new(format!("Cannot find type for url: {type_url}")))?;
        let content_message = DynamicMessage::decode(content_type.clone(), content)
            .map_err(|err| FormatError::new(format!("Invalid Any content for {type_url}: {err}")))?;

        match WellKnownType::from_full_name(content_type.full_name()) {
            Some(kind) => {
                let mut object = Map::new();
                object.insert("@type".to_string(), Json::String(type_url));
                object.insert(
                    "value".to_string(),
                    self.print_well_known(kind, &content_message)?,
                );
                Ok(Json::Object(object))
            }
            None => self.print_fields(&content_message, Some(type_url)),
        }
    }

    fn print_value(&self, message: &DynamicMessage) -> Result<Json, FormatError> {
        let descriptor = message.descriptor();
        let mut set = descriptor.fields().filter(|field| message.has_field(field));
        let Some(field) = set.next() else {
            return Ok(Json::Null);
        };
        if set.next().is_some() {
            return Err(FormatError::new("Invalid Value type."));
        }

        let value = message.get_field(&field);
        if let Value::F64(number) = value.as_ref()
            && !number.is_finite()
        {
            return Err(FormatError::new(format!(
                "Value.number_value cannot be NaN or Infinity: {number}"
            )));
        }
        self.print_single(&field, &value)
    }

    fn print_fields(
        &self,
        message: &DynamicMessage,
        type_url: Option<String>,
    ) -> Result<Json, FormatError> {
        let mut object = Map::new();
        if let Some(type_url) = type_url {
            object.insert("@type".to_string(), Json::String(type_url));
        }

        let mut fields: Vec<FieldDescriptor> = message.descriptor().fields().collect();
        fields.sort_by_key(FieldDescriptor::number);
        for field in fields {
            if !self.should_print(message, &field) {
                continue;
            }
            if let Some(json) = self.print_field(message, &field)? {
                let name = if self.preserving_proto_field_names {
                    field.name()
                } else {
                    field.json_name()
                };
                object.insert(name.to_string(), json);
            }
        }
        Ok(Json::Object(object))
    }

    fn should_print(&self, message: &DynamicMessage, field: &FieldDescriptor) -> bool {
        if message.has_field(field) {
            return true;
        }
        if self.default_value_fields == DefaultValueFields::Omit {
            return false;
        }
        // An unset message field may hold its own type, so it is never expanded.
        if field.cardinality() == Cardinality::Optional
            && (matches!(field.kind(), Kind::Message(_)) || field.containing_oneof().is_some())
        {
            return false;
        }
        match &self.default_value_fields {
            DefaultValueFields::Omit => false,
            DefaultValueFields::Always => true,
            DefaultValueFields::Selected(names) => names.contains(field.full_name()),
        }
    }

    /// `None` when the field is suppressed as an omitted null.
    fn print_field(
        &self,
        message: &DynamicMessage,
        field: &FieldDescriptor,
    ) -> Result<Option<Json>, FormatError> {
        let value = message.get_field(field);
        if field.is_map() {
            return self.print_map(field, &value).map(Some);
        }
        if field.is_list() {
            return self.print_list(field, &value).map(Some);
        }
        if self.treat_default_fields_as_null && !message.has_field(field) {
            return Ok((!self.omit_null_fields).then_some(Json::Null));
        }
        self.print_single(field, &value).map(Some)
    }

    fn print_map(&self, field: &FieldDescriptor, value: &Value) -> Result<Json, FormatError> {
        let (Value::Map(map), Kind::Message(entry)) = (value, field.kind()) else {
            return Err(FormatError::new("Invalid map field."));
        };
        let value_field = entry.map_entry_value_field();

        let mut object = Map::new();
        for (key, value) in entries(map, self.sorting_map_keys) {
            object.insert(key, self.print_single(&value_field, value)?);
        }
        Ok(Json::Object(object))
    }

    fn print_list(&self, field: &FieldDescriptor, value: &Value) -> Result<Json, FormatError> {
        let Value::List(items) = value else {
            return Err(FormatError::new(format!(
                "Invalid repeated field: {}",
                field.full_name()
            )));
        };
        items
            .iter()
            .map(|item| self.print_single(field, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Json::Array)
    }

    fn print_single(&self, field: &FieldDescriptor, value: &Value) -> Result<Json, FormatError> {
        match (field.kind(), value) {
            (Kind::Message(_), Value::Message(message)) => self.print_message(message),
            (Kind::Enum(descriptor), Value::EnumNumber(number)) => {
                Ok(print_enum(&descriptor, *number, self.printing_enums_as_ints))
            }
            (Kind::Message(_) | Kind::Enum(_), _) => Err(FormatError::new(format!(
                "Invalid value for field {}: {value:?}",
                field.full_name()
            ))),
            _ => print_scalar(value),
        }
    }
}

fn named_field(
    message: &DynamicMessage,
    name: &str,
    error: &str,
) -> Result<FieldDescriptor, FormatError> {
    message
        .descriptor()
        .get_field_by_name(name)
        .ok_or_else(|| FormatError::new(error))
}

/// Collects [`Printer`] options. The first misconfiguration is reported by
/// [`PrinterBuilder::build`].
#[derive(Debug, Default)]
pub struct PrinterBuilder {
    printer: Printer,
    default_value_fields_set: bool,
    error: Option<ConfigError>,
}

impl PrinterBuilder {
    fn fail(&mut self, error: ConfigError) {
        self.error.get_or_insert(error);
    }

    pub(crate) fn install(mut self, registry: Registry) -> Self {
        if let Err(error) = self.printer.registry.install(registry) {
            self.fail(error);
        }
        self
    }

    fn default_value_fields(mut self, mode: DefaultValueFields) -> Self {
        if self.default_value_fields_set {
            self.fail(ConfigError::AlreadySet("including_default_value_fields"));
        } else {
            self.default_value_fields_set = true;
            self.printer.default_value_fields = mode;
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

    /// Prints every field, including those at their default value. Unset
    /// message fields and unset oneof members are still omitted.
    #[must_use]
    pub fn including_default_value_fields(self) -> Self {
        self.default_value_fields(DefaultValueFields::Always)
    }

    /// Prints the given fields even when they hold their default value.
    #[must_use]
    pub fn including_default_value_fields_for<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = FieldDescriptor>,
    {
        let names: HashSet<String> = fields
            .into_iter()
            .map(|field| field.full_name().to_string())
            .collect();
        if names.is_empty() {
            self.fail(ConfigError::EmptyFieldSet);
            return self;
        }
        self.default_value_fields(DefaultValueFields::Selected(names))
    }

    /// Uses the names from the `.proto` file instead of their lowerCamelCase JSON names.
    #[must_use]
    pub fn preserving_proto_field_names(mut self) -> Self {
        self.printer.preserving_proto_field_names = true;
        self
    }

    #[must_use]
    pub fn printing_enums_as_ints(mut self) -> Self {
        if self.printer.printing_enums_as_ints {
            self.fail(ConfigError::AlreadySet("printing_enums_as_ints"));
        }
        self.printer.printing_enums_as_ints = true;
        self
    }

    /// Orders map entries by the UTF-8 bytes of their JSON keys.
    #[must_use]
    pub fn sorting_map_keys(mut self) -> Self {
        self.printer.sorting_map_keys = true;
        self
    }

    /// Emits `null` for singular fields that are printed but not set.
    #[must_use]
    pub fn treat_default_fields_as_null(mut self) -> Self {
        self.printer.treat_default_fields_as_null = true;
        self
    }

    /// Drops the `null` members [`PrinterBuilder::treat_default_fields_as_null`] would emit.
    #[must_use]
    pub fn omit_null_fields(mut self) -> Self {
        self.printer.omit_null_fields = true;
        self
    }

    /// # Errors
    /// Returns the first conflicting option that was selected.
    pub fn build(self) -> Result<Printer, ConfigError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.printer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_second_default_mode() {
        let err = Printer::builder()
            .including_default_value_fields()
            .including_default_value_fields_for(prost_json_format_example::nested().fields())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::AlreadySet("including_default_value_fields"));
    }

    #[test]
    fn builder_reports_first_error() {
        let err = Printer::builder()
            .including_default_value_fields_for(Vec::new())
            .printing_enums_as_ints()
            .printing_enums_as_ints()
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyFieldSet);
    }

    #[test]
    fn builder_rejects_second_registry() {
        let err = Printer::builder()
            .using_type_registry(TypeRegistry::empty())
            .using_legacy_type_registry(LegacyTypeRegistry::new(
                prost_json_format_example::pool(),
            ))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::RegistryAlreadySet);
    }

    #[test]
    fn selected_mode_tracks_full_names() {
        let descriptor = prost_json_format_example::nested();
        let printer = Printer::builder()
            .including_default_value_fields_for(descriptor.get_field_by_name("id"))
            .build()
            .unwrap();
        let message = DynamicMessage::new(descriptor);
        assert_eq!(
            printer.print(&message).unwrap(),
            serde_json::json!({ "id": 0 })
        );
    }
}
