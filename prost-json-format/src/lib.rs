//! Proto3 JSON printing and parsing for `prost-reflect` dynamic messages.
//!
//! A [`Printer`] turns a [`DynamicMessage`](prost_reflect::DynamicMessage) into
//! a `serde_json::Value` following the proto3 JSON mapping, and a [`Parser`]
//! merges such a tree back into a message. Both understand the
//! `google.protobuf` well-known types (`Any`, the wrappers, `Timestamp`,
//! `Duration`, `FieldMask`, `Struct`, `Value` and `ListValue`).
//!
//! Configurations are built once with [`Printer::builder`] and
//! [`Parser::builder`] and can then be shared freely. [`Printed`] and
//! [`MessageSeed`] plug them into any serde serializer or deserializer.
//!
//! # Example
//! ```rust
#![doc = include_str!("../docs/usage.rs")]
//! ```

mod format;

pub use format::{
    ConfigError, DEFAULT_RECURSION_LIMIT, FormatError, Inclusion, LegacyTypeRegistry,
    MessageSeed, Parser, ParserBuilder, Printed, Printer, PrinterBuilder, ProtoModule,
    ProtoModuleBuilder, TypeRegistry, TypeRegistryBuilder, TypeUrlResolver,
};

pub use prost_reflect;
