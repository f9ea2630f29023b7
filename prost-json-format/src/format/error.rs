use thiserror::Error;

/// Error returned when a message cannot be printed to, or parsed from, proto3 JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FormatError {
    message: String,
}

impl FormatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The human-readable description of the failure.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error returned when a printer, parser or module is configured inconsistently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A second type registry was supplied.
    #[error("only one type registry is allowed")]
    RegistryAlreadySet,
    /// A modifier that may only be selected once was selected again.
    #[error("{0} has already been set")]
    AlreadySet(&'static str),
    /// `including_default_value_fields_for` was called with no fields.
    #[error("a non-empty set of fields must be supplied for including_default_value_fields_for")]
    EmptyFieldSet,
}
