//! Byte-exact wire format vectors. Generated bindings in any language must
//! reproduce these streams bit for bit.

use sbuf_core::{Schema, Type, TypeKind};
use sbuf_wire::{Value, WireError, decode, encode};

fn sim_info_schema() -> Schema {
    sbuf_schema::compile(
        r#"
        SimInfo {
            id u32
            title text
            content text
            a bool
            b bool
            c bool
            d bool
            zip bin
        }
        "#,
    )
    .expect("schema compiles")
}

fn ty(name: &str, kind: TypeKind, is_list: bool) -> Type {
    Type {
        name: name.to_string(),
        is_list,
        kind,
    }
}

fn empty_sim_info() -> Value {
    Value::Struct(vec![
        Value::U32(0),
        Value::text(""),
        Value::text(""),
        Value::Bool(false),
        Value::Bool(false),
        Value::Bool(false),
        Value::Bool(false),
        Value::Bin(vec![]),
    ])
}

#[test]
fn defaulted_struct_encodes_to_zero_mask_only() {
    // 27 fields → a 4-byte mask and nothing else.
    let mut src = String::from("Sim {\n");
    for i in 0..12 {
        src.push_str(&format!(" f{i} u32\n"));
    }
    src.push_str(" can_move bool\n");
    for i in 13..27 {
        src.push_str(&format!(" f{i} text\n"));
    }
    src.push('}');
    let schema = sbuf_schema::compile(&src).expect("schema compiles");
    let sim = ty("Sim", TypeKind::Struct, false);

    let mut fields = Vec::new();
    for f in &schema.find_struct("Sim").unwrap().fields {
        fields.push(sbuf_wire::zero_value(&f.ty));
    }
    let value = Value::Struct(fields);

    let bytes = encode(&schema, &sim, &value).unwrap();
    assert_eq!(&bytes[..], [0x00, 0x00, 0x00, 0x00]);
    assert_eq!(decode(&schema, &sim, &bytes).unwrap(), value);
}

#[test]
fn bool_fields_live_in_the_mask_without_body_bytes() {
    let schema = sim_info_schema();
    let sim_info = ty("SimInfo", TypeKind::Struct, false);

    let mut value = empty_sim_info();
    let Value::Struct(fields) = &mut value else {
        unreachable!()
    };
    fields[3] = Value::Bool(true); // a
    fields[5] = Value::Bool(true); // c

    let bytes = encode(&schema, &sim_info, &value).unwrap();
    assert_eq!(&bytes[..], [0b0010_1000]);
    assert_eq!(decode(&schema, &sim_info, &bytes).unwrap(), value);
}

#[test]
fn mixed_fields_follow_mask_in_declaration_order() {
    let schema = sim_info_schema();
    let sim_info = ty("SimInfo", TypeKind::Struct, false);

    let mut value = empty_sim_info();
    let Value::Struct(fields) = &mut value else {
        unreachable!()
    };
    fields[0] = Value::U32(1);
    fields[1] = Value::text("hi");
    fields[3] = Value::Bool(true);

    let bytes = encode(&schema, &sim_info, &value).unwrap();
    assert_eq!(
        &bytes[..],
        [0b0000_1011, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00, b'h', b'i']
    );
    assert_eq!(bytes.len(), 9);
    assert_eq!(decode(&schema, &sim_info, &bytes).unwrap(), value);
}

#[test]
fn struct_list_elements_are_self_delimited() {
    let schema = sim_info_schema();
    let list = ty("SimInfo", TypeKind::Struct, true);

    let value = Value::List(vec![empty_sim_info(), empty_sim_info()]);
    let bytes = encode(&schema, &list, &value).unwrap();
    assert_eq!(&bytes[..], [0x02, 0x00, 0x00]);
    assert_eq!(decode(&schema, &list, &bytes).unwrap(), value);
}

#[test]
fn enum_lists_encode_ids_byte_per_element() {
    let schema = sbuf_schema::compile(
        "OrderStatus = Pending | Closed | Canceled | Shipped | Delivered | Actived | Settled",
    )
    .unwrap();
    let list = ty("OrderStatus", TypeKind::Enum, true);

    // Pending, Settled, Shipped.
    let value = Value::List(vec![Value::Enum(0), Value::Enum(6), Value::Enum(3)]);
    let bytes = encode(&schema, &list, &value).unwrap();
    assert_eq!(&bytes[..], [0x03, 0x00, 0x06, 0x03]);
    assert_eq!(decode(&schema, &list, &bytes).unwrap(), value);
}

#[test]
fn text_is_u16_length_then_utf8_bytes() {
    let schema = Schema::default();
    let text = ty("text", TypeKind::Base, false);
    let bytes = encode(&schema, &text, &Value::text("héllo")).unwrap();
    let payload = "héllo".as_bytes();
    let mut want = vec![payload.len() as u8, 0x00];
    want.extend_from_slice(payload);
    assert_eq!(&bytes[..], want);
}

#[test]
fn bool_list_packs_bits_lsb_first() {
    let schema = Schema::default();
    let list = ty("bool", TypeKind::Base, true);
    let value = Value::List(vec![
        Value::Bool(true),
        Value::Bool(false),
        Value::Bool(true),
        Value::Bool(true),
    ]);
    let bytes = encode(&schema, &list, &value).unwrap();
    assert_eq!(&bytes[..], [0x04, 0b0000_1101]);
    assert_eq!(decode(&schema, &list, &bytes).unwrap(), value);

    // Nine bools need a count byte plus two bit bytes.
    let long = Value::List(vec![Value::Bool(true); 9]);
    let bytes = encode(&schema, &list, &long).unwrap();
    assert_eq!(&bytes[..], [0x09, 0xFF, 0x01]);
}

#[test]
fn standalone_bool_scalar_is_one_byte() {
    let schema = Schema::default();
    let b = ty("bool", TypeKind::Base, false);
    assert_eq!(&encode(&schema, &b, &Value::Bool(true)).unwrap()[..], [0x01]);
    assert_eq!(
        &encode(&schema, &b, &Value::Bool(false)).unwrap()[..],
        [0x00]
    );
}

#[test]
fn lists_longer_than_255_fail_to_encode() {
    let schema = Schema::default();
    let list = ty("u8", TypeKind::Base, true);
    let value = Value::List(vec![Value::U8(1); 256]);
    let err = encode(&schema, &list, &value).unwrap_err();
    assert!(matches!(err, WireError::ListTooLong { len: 256, .. }));
}

#[test]
fn unknown_enum_ids_survive_decode_and_reencode() {
    let schema = sbuf_schema::compile("Status = Ok | Err").unwrap();
    let status = ty("Status", TypeKind::Enum, false);
    let value = decode(&schema, &status, &[0x63]).unwrap();
    assert_eq!(value, Value::Enum(0x63));
    assert_eq!(&encode(&schema, &status, &value).unwrap()[..], [0x63]);
}

#[test]
fn short_buffers_are_rejected_with_the_failing_path() {
    let schema = sim_info_schema();
    let sim_info = ty("SimInfo", TypeKind::Struct, false);

    // Mask claims the title is present but the body is missing.
    let err = decode(&schema, &sim_info, &[0b0000_0010]).unwrap_err();
    assert_eq!(
        err,
        WireError::UnexpectedEof {
            path: "SimInfo.title".to_string(),
        }
    );

    // No bytes at all: even the mask is short.
    let err = decode(&schema, &sim_info, &[]).unwrap_err();
    assert!(matches!(err, WireError::UnexpectedEof { .. }));
}
