//! Core schema model for the sbuf compiler.
//!
//! Everything here is produced by the `sbuf-schema` front-end and consumed
//! read-only by the wire codec, the RPC runtime, and the code generators.

mod ast;

pub use ast::{
    Api, ApiArg, BASE_TYPES, Enum, EnumChild, Schema, Struct, StructField, Type, TypeKind,
    is_base_type,
};
