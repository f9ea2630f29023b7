//! Pre-built descriptors for documentation and tests.
//!
//! The descriptors are assembled by hand from `prost_types` descriptor protos so
//! that neither `protoc` nor a build script is needed. The pool contains the
//! `google.protobuf` well-known type files, a proto3 `example` package and a
//! proto2 `example.legacy` package.

use std::sync::LazyLock;

use prost_reflect::{DescriptorPool, MessageDescriptor};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MessageOptions, OneofDescriptorProto,
};

static POOL: LazyLock<DescriptorPool> = LazyLock::new(|| {
    DescriptorPool::from_file_descriptor_set(file_descriptor_set())
        .expect("example descriptors are valid")
});

/// Returns the pool holding every example descriptor.
pub fn pool() -> DescriptorPool {
    POOL.clone()
}

/// Looks up a message by its fully-qualified name.
///
/// # Panics
/// Panics if the message is not part of the example pool.
pub fn message(full_name: &str) -> MessageDescriptor {
    POOL.get_message_by_name(full_name)
        .unwrap_or_else(|| panic!("unknown example message {full_name}"))
}

pub fn kitchen_sink() -> MessageDescriptor {
    message("example.KitchenSink")
}

pub fn nested() -> MessageDescriptor {
    message("example.Nested")
}

pub fn recursive() -> MessageDescriptor {
    message("example.Recursive")
}

pub fn name() -> MessageDescriptor {
    message("example.Name")
}

pub fn legacy() -> MessageDescriptor {
    message("example.legacy.LegacyMessage")
}

/// Every file of the example pool, dependencies first.
pub fn file_descriptor_set() -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![
            any_file(),
            duration_file(),
            field_mask_file(),
            struct_file(),
            timestamp_file(),
            wrappers_file(),
            example_file(),
            legacy_file(),
        ],
    }
}

fn any_file() -> FileDescriptorProto {
    file(
        "google/protobuf/any.proto",
        "google.protobuf",
        &[],
        vec![message_type(
            "Any",
            vec![
                field("type_url", 1, Type::String),
                field("value", 2, Type::Bytes),
            ],
        )],
        vec![],
    )
}

fn duration_file() -> FileDescriptorProto {
    file(
        "google/protobuf/duration.proto",
        "google.protobuf",
        &[],
        vec![seconds_and_nanos("Duration")],
        vec![],
    )
}

fn timestamp_file() -> FileDescriptorProto {
    file(
        "google/protobuf/timestamp.proto",
        "google.protobuf",
        &[],
        vec![seconds_and_nanos("Timestamp")],
        vec![],
    )
}

fn seconds_and_nanos(name: &str) -> DescriptorProto {
    message_type(
        name,
        vec![
            field("seconds", 1, Type::Int64),
            field("nanos", 2, Type::Int32),
        ],
    )
}

fn field_mask_file() -> FileDescriptorProto {
    file(
        "google/protobuf/field_mask.proto",
        "google.protobuf",
        &[],
        vec![message_type(
            "FieldMask",
            vec![repeated(field("paths", 1, Type::String))],
        )],
        vec![],
    )
}

fn struct_file() -> FileDescriptorProto {
    let mut structure = message_type(
        "Struct",
        vec![map_field("fields", 1, ".google.protobuf.Struct.FieldsEntry")],
    );
    structure.nested_type.push(map_entry(
        "FieldsEntry",
        field("key", 1, Type::String),
        message_field("value", 2, ".google.protobuf.Value"),
    ));

    let mut value = message_type(
        "Value",
        vec![
            oneof_member(
                enum_field("null_value", 1, ".google.protobuf.NullValue"),
                0,
            ),
            oneof_member(field("number_value", 2, Type::Double), 0),
            oneof_member(field("string_value", 3, Type::String), 0),
            oneof_member(field("bool_value", 4, Type::Bool), 0),
            oneof_member(message_field("struct_value", 5, ".google.protobuf.Struct"), 0),
            oneof_member(message_field("list_value", 6, ".google.protobuf.ListValue"), 0),
        ],
    );
    value.oneof_decl.push(oneof("kind"));

    let list_value = message_type(
        "ListValue",
        vec![repeated(message_field("values", 1, ".google.protobuf.Value"))],
    );

    file(
        "google/protobuf/struct.proto",
        "google.protobuf",
        &[],
        vec![structure, value, list_value],
        vec![enum_type("NullValue", &[("NULL_VALUE", 0)])],
    )
}

fn wrappers_file() -> FileDescriptorProto {
    let wrappers = [
        ("DoubleValue", Type::Double),
        ("FloatValue", Type::Float),
        ("Int64Value", Type::Int64),
        ("UInt64Value", Type::Uint64),
        ("Int32Value", Type::Int32),
        ("UInt32Value", Type::Uint32),
        ("BoolValue", Type::Bool),
        ("StringValue", Type::String),
        ("BytesValue", Type::Bytes),
    ];
    file(
        "google/protobuf/wrappers.proto",
        "google.protobuf",
        &[],
        wrappers
            .into_iter()
            .map(|(name, ty)| message_type(name, vec![field("value", 1, ty)]))
            .collect(),
        vec![],
    )
}

fn example_file() -> FileDescriptorProto {
    let mut kitchen_sink = message_type(
        "KitchenSink",
        vec![
            field("int32_field", 1, Type::Int32),
            field("int64_field", 2, Type::Int64),
            field("uint32_field", 3, Type::Uint32),
            field("uint64_field", 4, Type::Uint64),
            field("sint32_field", 5, Type::Sint32),
            field("fixed64_field", 6, Type::Fixed64),
            field("bool_field", 7, Type::Bool),
            field("string_field", 8, Type::String),
            field("bytes_field", 9, Type::Bytes),
            field("float_field", 10, Type::Float),
            field("double_field", 11, Type::Double),
            enum_field("status", 12, ".example.Status"),
            message_field("nested", 13, ".example.Nested"),
            repeated(message_field("repeated_nested", 14, ".example.Nested")),
            repeated(field("repeated_int32", 15, Type::Int32)),
            repeated(enum_field("repeated_status", 16, ".example.Status")),
            map_field("string_to_int", 17, ".example.KitchenSink.StringToIntEntry"),
            map_field("int_to_string", 18, ".example.KitchenSink.IntToStringEntry"),
            map_field(
                "string_to_status",
                19,
                ".example.KitchenSink.StringToStatusEntry",
            ),
            oneof_member(field("name", 20, Type::String), 0),
            oneof_member(field("number", 21, Type::Int32), 0),
            message_field("timestamp", 22, ".google.protobuf.Timestamp"),
            message_field("duration", 23, ".google.protobuf.Duration"),
            message_field("field_mask", 24, ".google.protobuf.FieldMask"),
            message_field("struct_field", 25, ".google.protobuf.Struct"),
            message_field("value_field", 26, ".google.protobuf.Value"),
            message_field("list_value", 27, ".google.protobuf.ListValue"),
            message_field("any_field", 28, ".google.protobuf.Any"),
            message_field("int32_wrapper", 29, ".google.protobuf.Int32Value"),
            message_field("string_wrapper", 30, ".google.protobuf.StringValue"),
            enum_field("null_value", 31, ".google.protobuf.NullValue"),
            proto3_optional(field("optional_int32", 32, Type::Int32), 1),
            map_field("bool_to_string", 33, ".example.KitchenSink.BoolToStringEntry"),
            map_field(
                "uint64_to_string",
                34,
                ".example.KitchenSink.Uint64ToStringEntry",
            ),
            repeated(message_field("repeated_value", 35, ".google.protobuf.Value")),
        ],
    );
    kitchen_sink.nested_type = vec![
        map_entry(
            "StringToIntEntry",
            field("key", 1, Type::String),
            field("value", 2, Type::Int32),
        ),
        map_entry(
            "IntToStringEntry",
            field("key", 1, Type::Int32),
            field("value", 2, Type::String),
        ),
        map_entry(
            "StringToStatusEntry",
            field("key", 1, Type::String),
            enum_field("value", 2, ".example.Status"),
        ),
        map_entry(
            "BoolToStringEntry",
            field("key", 1, Type::Bool),
            field("value", 2, Type::String),
        ),
        map_entry(
            "Uint64ToStringEntry",
            field("key", 1, Type::Uint64),
            field("value", 2, Type::String),
        ),
    ];
    kitchen_sink.oneof_decl = vec![oneof("choice"), oneof("_optional_int32")];

    let nested = message_type(
        "Nested",
        vec![
            field("id", 1, Type::Int32),
            field("note", 2, Type::String),
        ],
    );

    let recursive = message_type(
        "Recursive",
        vec![
            message_field("child", 1, ".example.Recursive"),
            field("depth", 2, Type::Int32),
        ],
    );

    let name = message_type(
        "Name",
        vec![
            field("first_name", 1, Type::String),
            field("last_name", 2, Type::String),
        ],
    );

    file(
        "example/kitchen_sink.proto",
        "example",
        &[
            "google/protobuf/any.proto",
            "google/protobuf/duration.proto",
            "google/protobuf/field_mask.proto",
            "google/protobuf/struct.proto",
            "google/protobuf/timestamp.proto",
            "google/protobuf/wrappers.proto",
        ],
        vec![kitchen_sink, nested, recursive, name],
        vec![enum_type(
            "Status",
            &[("STATUS_UNSPECIFIED", 0), ("ACTIVE", 1), ("INACTIVE", 2)],
        )],
    )
}

fn legacy_file() -> FileDescriptorProto {
    let mut legacy = message_type(
        "LegacyMessage",
        vec![
            enum_field("level", 1, ".example.legacy.Level"),
            repeated(enum_field("levels", 2, ".example.legacy.Level")),
            map_field(
                "level_by_name",
                3,
                ".example.legacy.LegacyMessage.LevelByNameEntry",
            ),
        ],
    );
    legacy.nested_type.push(map_entry(
        "LevelByNameEntry",
        field("key", 1, Type::String),
        enum_field("value", 2, ".example.legacy.Level"),
    ));

    let mut file = file(
        "example/legacy.proto",
        "example.legacy",
        &[],
        vec![legacy],
        vec![enum_type("Level", &[("LOW", 0), ("HIGH", 1)])],
    );
    file.syntax = Some("proto2".to_string());
    file
}

fn file(
    name: &str,
    package: &str,
    dependencies: &[&str],
    message_type: Vec<DescriptorProto>,
    enum_type: Vec<EnumDescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some(package.to_string()),
        dependency: dependencies.iter().map(ToString::to_string).collect(),
        message_type,
        enum_type,
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

fn message_type(name: &str, field: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field,
        ..Default::default()
    }
}

fn map_entry(
    name: &str,
    key: FieldDescriptorProto,
    value: FieldDescriptorProto,
) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: vec![key, value],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn enum_type(name: &str, values: &[(&str, i32)]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_string()),
        value: values
            .iter()
            .map(|(name, number)| EnumValueDescriptorProto {
                name: Some((*name).to_string()),
                number: Some(*number),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

fn oneof(name: &str) -> OneofDescriptorProto {
    OneofDescriptorProto {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        json_name: Some(json_name(name)),
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, Type::Message)
    }
}

fn enum_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, Type::Enum)
    }
}

fn map_field(name: &str, number: i32, entry_type_name: &str) -> FieldDescriptorProto {
    repeated(message_field(name, number, entry_type_name))
}

fn repeated(field: FieldDescriptorProto) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Repeated as i32),
        ..field
    }
}

fn oneof_member(field: FieldDescriptorProto, index: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        oneof_index: Some(index),
        ..field
    }
}

fn proto3_optional(field: FieldDescriptorProto, index: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        proto3_optional: Some(true),
        ..oneof_member(field, index)
    }
}

/// Mirrors protoc's lowerCamelCase projection of a field name.
fn json_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            result.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}
