use prost_json_format::prost_reflect::{DynamicMessage, Value};
use prost_json_format::{Parser, Printer};

let descriptor = prost_json_format_example::kitchen_sink();
let mut message = DynamicMessage::new(descriptor.clone());
message.set_field_by_name("int64_field", Value::I64(42));
message.set_field_by_name("bytes_field", Value::Bytes(vec![0, 1, 2, 255].into()));
message.set_field_by_name("status", Value::EnumNumber(1));

let json = Printer::new().print_to_string(&message).unwrap();
// int64 values are printed as strings, bytes as base64 and enums by name.
assert_eq!(
    json,
    r#"{"int64Field":"42","bytesField":"AAEC/w==","status":"ACTIVE"}"#
);

// Either the JSON name or the declared name is accepted when parsing.
let parsed = Parser::new()
    .parse_str(r#"{"int64_field":42,"bytesField":"AAEC_w","status":1}"#, descriptor)
    .unwrap();
assert_eq!(parsed, message);
