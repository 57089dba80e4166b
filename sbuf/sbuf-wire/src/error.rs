//! Codec error type.
//!
//! `path` values name the failing location the way the decoder walked to it,
//! e.g. `Order.info.title` or `Sim.ban_city[2]`.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Buffer exhausted before the expected bytes.
    #[error("unexpected end of input at {path}")]
    UnexpectedEof { path: String },

    /// List counts are carried in a single u8.
    #[error("list at {path} has {len} elements, exceeding 255")]
    ListTooLong { path: String, len: usize },

    /// `text`/`bin` lengths are carried in a u16.
    #[error("value at {path} is {len} bytes, exceeding 65535")]
    TooLong { path: String, len: usize },

    #[error("invalid UTF-8 at {path}")]
    InvalidUtf8 { path: String },

    /// A dynamic value does not match the schema type it is encoded against.
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A struct value carries a different number of fields than its schema
    /// declares; the presence mask cannot be laid out.
    #[error("struct at {path} has {got} values for {want} fields")]
    FieldCountMismatch {
        path: String,
        want: usize,
        got: usize,
    },

    /// The schema handed to the codec does not define the referenced type.
    /// Unreachable for schemas that passed resolution.
    #[error("unknown type '{name}' at {path}")]
    UnknownType { path: String, name: String },
}
