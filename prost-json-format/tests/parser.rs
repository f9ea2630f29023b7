use prost_json_format::prost_reflect::{DynamicMessage, MapKey, ReflectMessage as _, Value};
use prost_json_format::{Parser, Printer};
use prost_json_format_example::{kitchen_sink, legacy, name, recursive};
use serde::de::DeserializeSeed;
use serde_json::{Value as Json, json};

fn parse(json: &Json) -> DynamicMessage {
    Parser::new().parse(json, kitchen_sink()).unwrap()
}

fn parse_err(parser: &Parser, json: &Json) -> String {
    parser
        .parse(json, kitchen_sink())
        .unwrap_err()
        .message()
        .to_string()
}

fn get(message: &DynamicMessage, name: &str) -> Value {
    message.get_field_by_name(name).unwrap().into_owned()
}

fn chain(levels: usize) -> Json {
    let mut json = json!({ "depth": levels });
    for _ in 0..levels {
        json = json!({ "child": json });
    }
    json
}

#[test]
fn integers_accept_numbers_and_strings() {
    let message = parse(&json!({
        "int32Field": "-7",
        "int64Field": 9_007_199_254_740_993_i64,
        "uint32Field": 1.0,
        "uint64Field": "18446744073709551615",
        "sint32Field": 1e2,
        "fixed64Field": "1.5e1",
    }));

    assert_eq!(get(&message, "int32_field"), Value::I32(-7));
    assert_eq!(get(&message, "int64_field"), Value::I64(9_007_199_254_740_993));
    assert_eq!(get(&message, "uint32_field"), Value::U32(1));
    assert_eq!(get(&message, "uint64_field"), Value::U64(u64::MAX));
    assert_eq!(get(&message, "sint32_field"), Value::I32(100));
    assert_eq!(get(&message, "fixed64_field"), Value::U64(15));
}

#[test]
fn integers_reject_fractions_and_out_of_range_values() {
    let parser = Parser::new();
    assert_eq!(
        parse_err(&parser, &json!({ "int32Field": 1.5 })),
        "Not an int32 value: 1.5"
    );
    assert_eq!(
        parse_err(&parser, &json!({ "int32Field": 2_147_483_648_i64 })),
        "Not an int32 value: 2147483648"
    );
    assert_eq!(
        parse_err(&parser, &json!({ "uint32Field": 4_294_967_296_i64 })),
        "Out of range uint32 value: 4294967296"
    );
    assert_eq!(
        parse_err(&parser, &json!({ "uint64Field": "-1" })),
        "Out of range uint64 value: -1"
    );
    assert!(parse_err(&parser, &json!({ "int64Field": "9223372036854775808" })).contains("int64"));
}

#[test]
fn floats_accept_sentinels_and_reject_overflow() {
    let message = parse(&json!({
        "floatField": "NaN",
        "doubleField": "-Infinity",
    }));
    let Value::F32(float) = get(&message, "float_field") else {
        panic!("expected a float");
    };
    assert!(float.is_nan());
    assert_eq!(get(&message, "double_field"), Value::F64(f64::NEG_INFINITY));

    let message = parse(&json!({ "floatField": "3.4028235e38", "doubleField": "1e-400" }));
    assert_eq!(get(&message, "float_field"), Value::F32(f32::MAX));
    assert_eq!(get(&message, "double_field"), Value::F64(0.0));

    assert_eq!(
        parse_err(&Parser::new(), &json!({ "floatField": "3.5e38" })),
        "Out of range float value: 3.5e38"
    );
    assert!(parse_err(&Parser::new(), &json!({ "doubleField": "1e400" })).contains("double"));
}

#[test]
fn booleans_strings_and_bytes() {
    let message = parse(&json!({
        "boolField": "true",
        "stringField": "text",
        "bytesField": "-_8",
    }));
    assert_eq!(get(&message, "bool_field"), Value::Bool(true));
    assert_eq!(get(&message, "string_field"), Value::String("text".into()));
    assert_eq!(get(&message, "bytes_field"), Value::Bytes(vec![0xfb, 0xff].into()));

    assert_eq!(
        parse_err(&Parser::new(), &json!({ "boolField": "yes" })),
        "Invalid bool value: yes"
    );
}

#[test]
fn containers_and_objects_are_not_scalars() {
    let parser = Parser::new();
    assert!(parse_err(&parser, &json!({ "int32Field": {} })).starts_with("Invalid value: {}"));
    assert_eq!(
        parse_err(&parser, &json!({ "int32Field": [1] })),
        "Not an int32 value: [1]"
    );
    assert!(
        Parser::new()
            .parse(&json!([]), kitchen_sink())
            .unwrap_err()
            .message()
            .starts_with("Expect message object but got")
    );
}

#[test]
fn null_means_absent() {
    let message = parse(&json!({
        "int32Field": null,
        "nested": null,
        "repeatedInt32": null,
        "stringToInt": null,
        "int32Wrapper": null,
    }));
    assert_eq!(message, DynamicMessage::new(kitchen_sink()));

    assert_eq!(
        parse_err(&Parser::new(), &json!({ "repeatedInt32": [1, null] })),
        "Repeated field elements cannot be null in field: example.KitchenSink.repeated_int32"
    );
    assert_eq!(
        parse_err(&Parser::new(), &json!({ "stringToInt": { "a": null } })),
        "Map value cannot be null."
    );
}

#[test]
fn null_is_a_value_for_value_fields() {
    let message = parse(&json!({ "valueField": null, "repeatedValue": [null, 1] }));

    assert!(message.has_field_by_name("value_field"));
    let Value::Message(value) = get(&message, "value_field") else {
        panic!("expected a message");
    };
    assert!(value.has_field_by_name("null_value"));

    let Value::List(values) = get(&message, "repeated_value") else {
        panic!("expected a list");
    };
    assert_eq!(values.len(), 2);
}

#[test]
fn wrappers_take_bare_values() {
    let message = parse(&json!({ "int32Wrapper": "5", "stringWrapper": "" }));
    assert_eq!(
        Printer::new().print(&message).unwrap(),
        json!({ "int32Wrapper": 5, "stringWrapper": "" })
    );
}

#[test]
fn oneof_members_are_exclusive() {
    let message = parse(&json!({ "number": 3 }));
    assert_eq!(get(&message, "number"), Value::I32(3));

    let message = parse(&json!({ "name": null, "number": 1 }));
    assert!(!message.has_field_by_name("name"));

    assert_eq!(
        parse_err(&Parser::new(), &json!({ "name": "a", "number": 1 })),
        "Cannot set field example.KitchenSink.number because another field \
         example.KitchenSink.name belonging to the same oneof has already been set."
    );
}

#[test]
fn unknown_fields_fail_unless_ignored() {
    let json = json!({ "firstName": "Ada", "blah": 1 });
    assert_eq!(
        Parser::new()
            .parse(&json, name())
            .unwrap_err()
            .message(),
        "Cannot find field: blah in message example.Name"
    );

    let parser = Parser::builder().ignoring_unknown_fields().build().unwrap();
    let message = parser.parse(&json, name()).unwrap();
    assert_eq!(get(&message, "first_name"), Value::String("Ada".into()));
}

#[test]
fn map_keys_are_parsed_by_key_kind() {
    let message = parse(&json!({
        "intToString": { "7": "seven", "-3": "minus three" },
        "boolToString": { "true": "yes" },
        "uint64ToString": { "18446744073709551615": "max" },
        "stringToStatus": { "on": "ACTIVE", "off": 2 },
    }));

    let Value::Map(ints) = get(&message, "int_to_string") else {
        panic!("expected a map");
    };
    assert_eq!(ints.get(&MapKey::I32(-3)), Some(&Value::String("minus three".into())));
    assert_eq!(ints.len(), 2);

    let Value::Map(bools) = get(&message, "bool_to_string") else {
        panic!("expected a map");
    };
    assert!(bools.contains_key(&MapKey::Bool(true)));

    let Value::Map(statuses) = get(&message, "string_to_status") else {
        panic!("expected a map");
    };
    assert_eq!(statuses.get(&MapKey::String("off".into())), Some(&Value::EnumNumber(2)));

    let parser = Parser::new();
    assert!(parse_err(&parser, &json!({ "intToString": { "seven": "x" } })).contains("seven"));
    assert!(parse_err(&parser, &json!({ "boolToString": { "TRUE": "x" } })).contains("TRUE"));
}

#[test]
fn open_enums_accept_any_number() {
    let message = parse(&json!({
        "status": "INACTIVE",
        "repeatedStatus": [1, "7", "ACTIVE"],
    }));
    assert_eq!(get(&message, "status"), Value::EnumNumber(2));
    assert_eq!(
        get(&message, "repeated_status"),
        Value::List(vec![
            Value::EnumNumber(1),
            Value::EnumNumber(7),
            Value::EnumNumber(1)
        ])
    );

    assert_eq!(
        parse_err(&Parser::new(), &json!({ "status": "UNKNOWN" })),
        "Invalid enum value: UNKNOWN for enum type: example.Status"
    );
}

#[test]
fn closed_enums_reject_undeclared_numbers() {
    let err = Parser::new()
        .parse(&json!({ "level": 5 }), legacy())
        .unwrap_err();
    assert_eq!(
        err.message(),
        "Invalid enum value: 5 for enum type: example.legacy.Level"
    );

    let message = Parser::new()
        .parse(&json!({ "level": 1, "levels": ["LOW"] }), legacy())
        .unwrap();
    assert_eq!(get(&message, "level"), Value::EnumNumber(1));
}

// A dropped singular enum leaves the field absent, while dropped repeated and
// map elements vanish from an otherwise present collection.
#[test]
fn ignored_enum_tokens_drop_the_singular_field_but_only_the_element_elsewhere() {
    let parser = Parser::builder().ignoring_unknown_fields().build().unwrap();
    let message = parser
        .parse(
            &json!({
                "level": 5,
                "levels": ["HIGH", 5, "NOPE", "LOW"],
                "levelByName": { "a": "HIGH", "b": "NOPE" },
            }),
            legacy(),
        )
        .unwrap();

    assert!(!message.has_field_by_name("level"));
    assert_eq!(
        get(&message, "levels"),
        Value::List(vec![Value::EnumNumber(1), Value::EnumNumber(0)])
    );
    let Value::Map(by_name) = get(&message, "level_by_name") else {
        panic!("expected a map");
    };
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name.get(&MapKey::String("a".into())), Some(&Value::EnumNumber(1)));
}

#[test]
fn arrays_in_enum_position_are_dropped_only_when_ignoring_unknown_fields() {
    let json = json!({ "status": [1], "repeatedStatus": [[2], "ACTIVE"] });
    assert_eq!(
        parse_err(&Parser::new(), &json),
        "Invalid enum value: [1] for enum type: example.Status"
    );

    let parser = Parser::builder().ignoring_unknown_fields().build().unwrap();
    let message = parser.parse(&json, kitchen_sink()).unwrap();
    assert!(!message.has_field_by_name("status"));
    assert_eq!(
        get(&message, "repeated_status"),
        Value::List(vec![Value::EnumNumber(1)])
    );
}

#[test]
fn nesting_stops_at_the_recursion_limit() {
    let parser = Parser::new();
    assert!(parser.parse(&chain(100), recursive()).is_ok());
    assert_eq!(
        parser.parse(&chain(101), recursive()).unwrap_err().message(),
        "Hit recursion limit."
    );

    let shallow = Parser::builder().recursion_limit(2).build().unwrap();
    assert!(shallow.parse(&chain(2), recursive()).is_ok());
    assert!(shallow.parse(&chain(3), recursive()).is_err());
}

#[test]
fn merge_keeps_existing_fields() {
    let mut message = DynamicMessage::new(name());
    message.set_field_by_name("last_name", Value::String("Lovelace".into()));

    Parser::new()
        .merge(&json!({ "firstName": "Ada" }), &mut message)
        .unwrap();
    assert_eq!(
        Printer::new().print(&message).unwrap(),
        json!({ "firstName": "Ada", "lastName": "Lovelace" })
    );
}

#[test]
fn invalid_json_text_is_reported() {
    let err = Parser::new().parse_str("{\"firstName\":", name()).unwrap_err();
    assert!(err.message().starts_with("Invalid JSON"));
}

#[test]
fn seed_deserializes_from_any_serde_source() {
    let parser = Parser::new();
    let mut deserializer = serde_json::Deserializer::from_str(r#"{"first_name":"Ada"}"#);
    let message = parser.seed(name()).deserialize(&mut deserializer).unwrap();
    assert_eq!(message.descriptor(), name());
    assert_eq!(get(&message, "first_name"), Value::String("Ada".into()));

    let mut deserializer = serde_json::Deserializer::from_str(r#"{"blah":1}"#);
    let err = parser.seed(name()).deserialize(&mut deserializer).unwrap_err();
    assert!(err.to_string().contains("Cannot find field: blah"));
}

#[test]
fn printed_messages_parse_back_unchanged() {
    let json = json!({
        "int32Field": 1,
        "int64Field": "-2",
        "uint64Field": "3",
        "floatField": 0.5,
        "doubleField": "NaN",
        "status": "ACTIVE",
        "nested": { "id": 4, "note": "n" },
        "repeatedNested": [{ "id": 5 }],
        "stringToInt": { "k": 6 },
        "intToString": { "-7": "v" },
        "number": 8,
        "timestamp": "1970-01-01T00:00:01Z",
        "duration": "-0.500s",
        "fieldMask": "fooBar,baz",
        "structField": { "a": [true, null, "x", 1.5] },
        "optionalInt32": 0,
    });
    let message = parse(&json);
    assert_eq!(Printer::new().print(&message).unwrap(), json);
}
