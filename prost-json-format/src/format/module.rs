use super::registry::{LegacyTypeRegistry, Registry, TypeRegistry};
use super::{ConfigError, Parser, Printer};

/// The property inclusion policy of the serializing host, which decides how
/// default and unset fields are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Inclusion {
    /// Print every field, with `null` for unset singular fields.
    Always,
    NonNull,
    NonAbsent,
    NonEmpty,
    NonDefault,
    /// Defer to the module's `treat_default_fields_as_is` setting.
    #[default]
    UseDefaults,
}

/// Shared printer and parser settings for embedding proto3 JSON in a
/// serialization host.
#[derive(Debug, Clone, Default)]
pub struct ProtoModule {
    treat_default_fields_as_is: bool,
    preserving_proto_field_names: bool,
    registry: Registry,
}

impl ProtoModule {
    pub fn builder() -> ProtoModuleBuilder {
        ProtoModuleBuilder::default()
    }

    /// A printer honouring `inclusion`.
    ///
    /// Unless the module treats default fields as-is, printed fields that are
    /// not set become `null`, which `inclusion` may then drop.
    ///
    /// # Errors
    /// Propagates builder errors; none occur for a module built successfully.
    pub fn printer(&self, inclusion: Inclusion) -> Result<Printer, ConfigError> {
        let (including_defaults, omit_nulls) = match inclusion {
            Inclusion::Always => (true, false),
            Inclusion::NonNull | Inclusion::NonAbsent => (true, true),
            Inclusion::UseDefaults => (self.treat_default_fields_as_is, true),
            Inclusion::NonEmpty | Inclusion::NonDefault => (false, true),
        };

        let mut builder = Printer::builder().install(self.registry.clone());
        if self.preserving_proto_field_names {
            builder = builder.preserving_proto_field_names();
        }
        if including_defaults {
            builder = builder.including_default_value_fields();
        }
        if !self.treat_default_fields_as_is {
            builder = builder.treat_default_fields_as_null();
        }
        if omit_nulls {
            builder = builder.omit_null_fields();
        }
        builder.build()
    }

    /// A parser that rejects unknown JSON members only when
    /// `fail_on_unknown_properties` is set.
    ///
    /// # Errors
    /// Propagates builder errors; none occur for a module built successfully.
    pub fn parser(&self, fail_on_unknown_properties: bool) -> Result<Parser, ConfigError> {
        let mut builder = Parser::builder().install(self.registry.clone());
        if !fail_on_unknown_properties {
            builder = builder.ignoring_unknown_fields();
        }
        builder.build()
    }
}

#[derive(Debug, Default)]
pub struct ProtoModuleBuilder {
    module: ProtoModule,
    error: Option<ConfigError>,
}

impl ProtoModuleBuilder {
    fn install(mut self, registry: Registry) -> Self {
        if let Err(error) = self.module.registry.install(registry) {
            self.error.get_or_insert(error);
        }
        self
    }

    /// Prints default and unset fields exactly as the printer would on its own,
    /// instead of as `null`.
    #[must_use]
    pub fn treat_default_fields_as_is(mut self) -> Self {
        self.module.treat_default_fields_as_is = true;
        self
    }

    #[must_use]
    pub fn preserving_proto_field_names(mut self) -> Self {
        self.module.preserving_proto_field_names = true;
        self
    }

    #[must_use]
    pub fn using_type_registry(self, registry: TypeRegistry) -> Self {
        self.install(Registry::Current(registry))
    }

    #[must_use]
    pub fn using_legacy_type_registry(self, registry: LegacyTypeRegistry) -> Self {
        self.install(Registry::Legacy(registry))
    }

    /// # Errors
    /// Returns an error when two registries were supplied.
    pub fn build(self) -> Result<ProtoModule, ConfigError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.module),
        }
    }
}
