//! The proto3 JSON mapping over `prost-reflect` dynamic messages.
//!
//! Scalars, enums and map keys have their own codecs; the printer and parser
//! walk messages field by field and hand the well-known types to `wkt`.

mod enums;
mod error;
mod map;
mod module;
mod number;
mod parser;
mod printer;
mod registry;
mod scalar;
mod time;
mod wkt;
mod wrappers;

pub use error::{ConfigError, FormatError};
pub use module::{Inclusion, ProtoModule, ProtoModuleBuilder};
pub use parser::{DEFAULT_RECURSION_LIMIT, Parser, ParserBuilder};
pub use printer::{Printer, PrinterBuilder};
pub use registry::{LegacyTypeRegistry, TypeRegistry, TypeRegistryBuilder, TypeUrlResolver};
pub use wrappers::{MessageSeed, Printed};
