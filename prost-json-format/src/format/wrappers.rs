use prost_reflect::{DynamicMessage, MessageDescriptor};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser};
use serde_json::Value as Json;

use super::{Parser, Printer};

/// Wraps a message to serialize it as proto3 JSON through a [`Printer`].
pub struct Printed<'a> {
    printer: &'a Printer,
    message: &'a DynamicMessage,
}

impl<'a> Printed<'a> {
    pub fn new(printer: &'a Printer, message: &'a DynamicMessage) -> Self {
        Self { printer, message }
    }
}

impl Serialize for Printed<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.printer
            .print(self.message)
            .map_err(ser::Error::custom)?
            .serialize(serializer)
    }
}

/// Deserializes proto3 JSON into a message of a fixed type through a [`Parser`].
pub struct MessageSeed<'a> {
    parser: &'a Parser,
    descriptor: MessageDescriptor,
}

impl<'a> MessageSeed<'a> {
    pub fn new(parser: &'a Parser, descriptor: MessageDescriptor) -> Self {
        Self { parser, descriptor }
    }
}

impl<'de> de::DeserializeSeed<'de> for MessageSeed<'_> {
    type Value = DynamicMessage;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        // The parser walks a complete tree, so buffer the input first.
        let json = Json::deserialize(deserializer)?;
        self.parser
            .parse(&json, self.descriptor)
            .map_err(de::Error::custom)
    }
}
