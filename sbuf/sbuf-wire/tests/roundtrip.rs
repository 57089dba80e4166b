use sbuf_core::{Type, TypeKind};
use sbuf_wire::{Value, WireError, decode, decode_args, encode, encode_args};

fn order_schema() -> sbuf_core::Schema {
    sbuf_schema::compile(
        r#"
        Status = Ok | Err | Stale(7)
        Info {
            title text
            flags [bool]
        }
        Order {
            id u64
            price f64
            ratio f32
            neg i32
            status Status
            urgent bool
            info Info
            history [Info]
            codes [Status]
            zip bin
            notes [text]
        }
        "#,
    )
    .expect("schema compiles")
}

fn struct_ty(name: &str) -> Type {
    Type {
        name: name.to_string(),
        is_list: false,
        kind: TypeKind::Struct,
    }
}

fn info(title: &str, flags: &[bool]) -> Value {
    Value::Struct(vec![
        Value::text(title),
        Value::List(flags.iter().map(|&b| Value::Bool(b)).collect()),
    ])
}

fn populated_order() -> Value {
    Value::Struct(vec![
        Value::U64(9_000_000_001),
        Value::F64(12.5),
        Value::F32(-0.25),
        Value::I32(-42),
        Value::Enum(7),
        Value::Bool(true),
        info("first", &[true, false]),
        Value::List(vec![info("a", &[]), info("b", &[true])]),
        Value::List(vec![Value::Enum(1), Value::Enum(7)]),
        Value::Bin(vec![0xDE, 0xAD]),
        Value::List(vec![Value::text("x"), Value::text("")]),
    ])
}

#[test]
fn populated_struct_round_trips() {
    let schema = order_schema();
    let order = struct_ty("Order");
    let value = populated_order();

    let bytes = encode(&schema, &order, &value).unwrap();
    assert_eq!(decode(&schema, &order, &bytes).unwrap(), value);
}

#[test]
fn encoded_length_is_mask_plus_present_fields() {
    let schema = order_schema();
    let order = struct_ty("Order");

    // Only id (u64) and urgent (bool) set: 2-byte mask + 8-byte body.
    let mut fields: Vec<Value> = schema
        .find_struct("Order")
        .unwrap()
        .fields
        .iter()
        .map(|f| sbuf_wire::zero_value(&f.ty))
        .collect();
    fields[0] = Value::U64(3);
    fields[5] = Value::Bool(true);

    let bytes = encode(&schema, &order, &Value::Struct(fields.clone())).unwrap();
    assert_eq!(bytes.len(), 2 + 8);
    // id occupies bit 0, urgent bit 5.
    assert_eq!(bytes[0], 0b0010_0001);
    assert_eq!(bytes[1], 0b0000_0000);
    assert_eq!(
        decode(&schema, &order, &bytes).unwrap(),
        Value::Struct(fields)
    );
}

#[test]
fn zero_fields_are_indistinguishable_from_absent_ones() {
    let schema = order_schema();
    let order = struct_ty("Order");

    let zeroed: Vec<Value> = schema
        .find_struct("Order")
        .unwrap()
        .fields
        .iter()
        .map(|f| sbuf_wire::zero_value(&f.ty))
        .collect();
    let mut explicit = zeroed.clone();
    explicit[0] = Value::U64(0);
    explicit[9] = Value::Bin(vec![]);

    let a = encode(&schema, &order, &Value::Struct(zeroed)).unwrap();
    let b = encode(&schema, &order, &Value::Struct(explicit)).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 2);
}

#[test]
fn nested_empty_struct_is_present_with_zero_mask() {
    let schema = order_schema();
    let order = struct_ty("Order");

    let mut fields: Vec<Value> = schema
        .find_struct("Order")
        .unwrap()
        .fields
        .iter()
        .map(|f| sbuf_wire::zero_value(&f.ty))
        .collect();
    // A non-null nested struct with all-default fields still occupies its
    // mask bit and contributes its own (zero) mask byte.
    fields[6] = info("", &[]);

    let value = Value::Struct(fields);
    let bytes = encode(&schema, &order, &value).unwrap();
    assert_eq!(&bytes[..], [0b0100_0000, 0x00, 0x00]);
    assert_eq!(decode(&schema, &order, &bytes).unwrap(), value);
}

#[test]
fn args_concatenate_in_declaration_order() {
    let schema = sbuf_schema::compile(
        "Info { title text }\nuser.set(page u8, label text, info Info) => nil",
    )
    .unwrap();
    let args = &schema.apis[0].args;

    let values = vec![
        Value::U8(5),
        Value::text("ok"),
        Value::Struct(vec![Value::text("t")]),
    ];
    let bytes = encode_args(&schema, args, &values).unwrap();
    assert_eq!(
        &bytes[..],
        [
            0x05, // page
            0x02, 0x00, b'o', b'k', // label
            0b0000_0001, 0x01, 0x00, b't', // info: mask + title
        ]
    );
    assert_eq!(decode_args(&schema, args, &bytes).unwrap(), values);
}

#[test]
fn arg_count_mismatch_is_rejected() {
    let schema = sbuf_schema::compile("user.set(page u8) => nil").unwrap();
    let err = encode_args(&schema, &schema.apis[0].args, &[]).unwrap_err();
    assert!(matches!(err, WireError::FieldCountMismatch { .. }));
}

#[test]
fn struct_value_with_wrong_arity_is_rejected() {
    let schema = order_schema();
    let err = encode(&schema, &struct_ty("Info"), &Value::Struct(vec![])).unwrap_err();
    assert!(matches!(
        err,
        WireError::FieldCountMismatch { want: 2, got: 0, .. }
    ));
}

#[test]
fn null_outside_a_struct_field_is_a_type_mismatch() {
    let schema = order_schema();
    let err = encode(&schema, &struct_ty("Info"), &Value::Null).unwrap_err();
    assert!(matches!(
        err,
        WireError::TypeMismatch {
            expected: "struct",
            found: "null",
            ..
        }
    ));
}

#[test]
fn oversized_text_fails_instead_of_truncating_the_prefix() {
    let schema = sbuf_core::Schema::default();
    let text = Type {
        name: "text".to_string(),
        is_list: false,
        kind: TypeKind::Base,
    };
    let big = "x".repeat(70_000);
    let err = encode(&schema, &text, &Value::text(big)).unwrap_err();
    assert!(matches!(err, WireError::TooLong { len: 70_000, .. }));
}
