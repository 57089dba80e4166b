//! Dynamic value representation the reference codec encodes and decodes.
//!
//! Generated bindings work with native types; this IR exists so the codec,
//! the RPC runtime, and the cross-language tests can handle any schema
//! without generated code.

use sbuf_core::{Type, TypeKind};

/// One value of any schema type. `Struct` payloads are positional, in field
/// declaration order (after embedded expansion). `Null` is an absent struct
/// reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Text(String),
    Bin(Vec<u8>),
    /// Raw enum id. Ids outside the declared set are preserved as-is.
    Enum(u8),
    Struct(Vec<Value>),
    List(Vec<Value>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Text(_) => "text",
            Value::Bin(_) => "bin",
            Value::Enum(_) => "enum",
            Value::Struct(_) => "struct",
            Value::List(_) => "list",
        }
    }

    /// The present-if-non-default predicate of the struct encoding: default
    /// values occupy no body bytes and decode back from a clear mask bit.
    pub fn is_default(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(v) => !v,
            Value::I8(v) => *v == 0,
            Value::I16(v) => *v == 0,
            Value::I32(v) => *v == 0,
            Value::I64(v) => *v == 0,
            Value::U8(v) => *v == 0,
            Value::U16(v) => *v == 0,
            Value::U32(v) => *v == 0,
            Value::U64(v) => *v == 0,
            Value::F32(v) => *v == 0.0,
            Value::F64(v) => *v == 0.0,
            Value::Text(v) => v.is_empty(),
            Value::Bin(v) => v.is_empty(),
            Value::Enum(v) => *v == 0,
            Value::Struct(_) => false,
            Value::List(v) => v.is_empty(),
        }
    }
}

/// The zero value a clear mask bit decodes to.
pub fn zero_value(ty: &Type) -> Value {
    if ty.is_list {
        return Value::List(Vec::new());
    }
    match ty.kind {
        TypeKind::Struct => Value::Null,
        TypeKind::Enum => Value::Enum(0),
        TypeKind::Base => match ty.name.as_str() {
            "bool" => Value::Bool(false),
            "i8" => Value::I8(0),
            "i16" => Value::I16(0),
            "i32" => Value::I32(0),
            "i64" => Value::I64(0),
            "u8" => Value::U8(0),
            "u16" => Value::U16(0),
            "u32" => Value::U32(0),
            "u64" => Value::U64(0),
            "f32" => Value::F32(0.0),
            "f64" => Value::F64(0.0),
            "text" => Value::Text(String::new()),
            "bin" => Value::Bin(Vec::new()),
            _ => Value::Null,
        },
    }
}
