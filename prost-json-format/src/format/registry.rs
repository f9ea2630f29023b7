use std::collections::{HashMap, HashSet};

use prost_reflect::{DescriptorPool, FileDescriptor, MessageDescriptor};

use super::{ConfigError, FormatError};

/// Resolves `Any.type_url` values to message descriptors.
pub trait TypeUrlResolver {
    /// Returns `Ok(None)` when the URL is well formed but names an unknown type.
    ///
    /// # Errors
    /// Returns an error when the URL has no `/` or an empty final segment.
    fn resolve_type_url(&self, type_url: &str) -> Result<Option<MessageDescriptor>, FormatError>;
}

/// The type name of a type URL: everything after the last `/`.
pub(crate) fn type_name(type_url: &str) -> Result<&str, FormatError> {
    match type_url.rsplit_once('/') {
        Some((_, name)) if !name.is_empty() => Ok(name),
        _ => Err(FormatError::new(format!(
            "Invalid type url found: {type_url}"
        ))),
    }
}

/// A fixed set of message types, keyed by full name.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, MessageDescriptor>,
}

impl TypeRegistry {
    /// A registry that resolves nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    pub fn find(&self, full_name: &str) -> Option<MessageDescriptor> {
        self.types.get(full_name).cloned()
    }
}

impl TypeUrlResolver for TypeRegistry {
    fn resolve_type_url(&self, type_url: &str) -> Result<Option<MessageDescriptor>, FormatError> {
        Ok(self.find(type_name(type_url)?))
    }
}

#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    types: HashMap<String, MessageDescriptor>,
    files: HashSet<String>,
}

impl TypeRegistryBuilder {
    /// Registers every message of `descriptor`'s file and of the files it
    /// depends on, transitively.
    #[must_use]
    pub fn add(mut self, descriptor: &MessageDescriptor) -> Self {
        self.add_file(&descriptor.parent_file());
        self
    }

    /// Registers every message in `pool`.
    #[must_use]
    pub fn add_pool(mut self, pool: &DescriptorPool) -> Self {
        for message in pool.all_messages() {
            self.types.insert(message.full_name().to_string(), message);
        }
        self
    }

    pub fn build(self) -> TypeRegistry {
        TypeRegistry { types: self.types }
    }

    fn add_file(&mut self, file: &FileDescriptor) {
        if !self.files.insert(file.name().to_string()) {
            return;
        }
        for message in file.messages() {
            self.add_message(message);
        }
        for dependency in file.dependencies() {
            self.add_file(&dependency);
        }
    }

    fn add_message(&mut self, message: MessageDescriptor) {
        for child in message.child_messages() {
            self.add_message(child);
        }
        self.types.insert(message.full_name().to_string(), message);
    }
}

/// Resolves type URLs against a whole descriptor pool.
#[derive(Debug, Clone)]
pub struct LegacyTypeRegistry {
    pool: DescriptorPool,
}

impl LegacyTypeRegistry {
    pub fn new(pool: DescriptorPool) -> Self {
        Self { pool }
    }

    pub fn find(&self, full_name: &str) -> Option<MessageDescriptor> {
        self.pool.get_message_by_name(full_name)
    }
}

impl TypeUrlResolver for LegacyTypeRegistry {
    fn resolve_type_url(&self, type_url: &str) -> Result<Option<MessageDescriptor>, FormatError> {
        Ok(self.find(type_name(type_url)?))
    }
}

/// The registry a printer or parser was configured with.
#[derive(Debug, Clone, Default)]
pub(crate) enum Registry {
    #[default]
    Empty,
    Current(TypeRegistry),
    Legacy(LegacyTypeRegistry),
}

impl Registry {
    /// Installs `registry`, refusing to replace one supplied earlier.
    pub(crate) fn install(&mut self, registry: Registry) -> Result<(), ConfigError> {
        if !matches!(self, Registry::Empty) {
            return Err(ConfigError::RegistryAlreadySet);
        }
        *self = registry;
        Ok(())
    }
}

impl TypeUrlResolver for Registry {
    fn resolve_type_url(&self, type_url: &str) -> Result<Option<MessageDescriptor>, FormatError> {
        match self {
            Registry::Empty => type_name(type_url).map(|_| None),
            Registry::Current(registry) => registry.resolve_type_url(type_url),
            Registry::Legacy(registry) => registry.resolve_type_url(type_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_name_is_final_url_segment() {
        assert_eq!(
            type_name("type.googleapis.com/example.Nested").unwrap(),
            "example.Nested"
        );
        assert_eq!(type_name("a/b/c/example.Nested").unwrap(), "example.Nested");
        assert_eq!(type_name("/example.Nested").unwrap(), "example.Nested");
    }

    #[test]
    fn type_name_rejects_urls_without_a_name() {
        let err = type_name("example.Nested").unwrap_err();
        assert_eq!(err.message(), "Invalid type url found: example.Nested");
        assert!(type_name("type.googleapis.com/").is_err());
        assert!(type_name("").is_err());
    }

    #[test]
    fn builder_adds_file_nested_and_dependency_messages() {
        let registry = TypeRegistry::builder()
            .add(&prost_json_format_example::nested())
            .build();

        assert!(registry.find("example.KitchenSink").is_some());
        assert!(registry.find("example.KitchenSink.StringToIntEntry").is_some());
        assert!(registry.find("google.protobuf.Timestamp").is_some());
        assert!(registry.find("google.protobuf.Struct.FieldsEntry").is_some());
        assert!(registry.find("example.legacy.LegacyMessage").is_none());
    }

    #[test]
    fn pool_registration_covers_everything() {
        let registry = TypeRegistry::builder()
            .add_pool(&prost_json_format_example::pool())
            .build();
        assert!(registry.find("example.legacy.LegacyMessage").is_some());
    }

    #[test]
    fn resolution_distinguishes_unknown_from_invalid() {
        let registry = TypeRegistry::builder()
            .add(&prost_json_format_example::nested())
            .build();

        let found = registry
            .resolve_type_url("type.googleapis.com/example.Nested")
            .unwrap();
        assert_eq!(found.unwrap().full_name(), "example.Nested");
        assert!(
            registry
                .resolve_type_url("type.googleapis.com/example.Missing")
                .unwrap()
                .is_none()
        );
        assert!(registry.resolve_type_url("example.Nested").is_err());
        assert!(
            TypeRegistry::empty()
                .resolve_type_url("type.googleapis.com/example.Nested")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn legacy_registry_searches_the_pool() {
        let registry = LegacyTypeRegistry::new(prost_json_format_example::pool());
        let found = registry
            .resolve_type_url("x/example.legacy.LegacyMessage")
            .unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn second_registry_is_rejected() {
        let mut registry = Registry::default();
        registry
            .install(Registry::Current(TypeRegistry::empty()))
            .unwrap();
        assert_eq!(
            registry.install(Registry::Legacy(LegacyTypeRegistry::new(
                prost_json_format_example::pool()
            ))),
            Err(ConfigError::RegistryAlreadySet)
        );
    }
}
