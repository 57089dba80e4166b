//! Error type shared by the lexing, parsing, and resolution passes.

/// First failure encountered while compiling a schema source.
///
/// The pipeline is fail-fast: whichever pass trips first reports one
/// diagnostic, with a source line wherever one is known.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("line {line}: {message}")]
    Lex { line: u32, message: String },

    #[error("line {line}: unexpected token '{token}'")]
    Unexpected { line: u32, token: String },

    #[error("line {line}: expected {expected}, found '{found}'")]
    Expected {
        line: u32,
        expected: &'static str,
        found: String,
    },

    /// Struct and enum names share one top-level namespace.
    #[error("line {line}: '{name}' redefined")]
    Redefined { line: u32, name: String },

    #[error("line {line}: invalid enum id '{text}'")]
    InvalidEnumId { line: u32, text: String },

    /// Auto-increment would assign an id past 255.
    #[error("line {line}: enum id overflow")]
    EnumIdOverflow { line: u32 },

    /// `context` names the containing entity, e.g. `struct User field info`
    /// or `api user.get arg id`.
    #[error("{context}: undefined type '{name}'")]
    UndefinedType { context: String, name: String },

    #[error("circular embedding detected: '{name}'")]
    CircularEmbedding { name: String },

    #[error("embedded struct '{name}' not found")]
    EmbeddedNotFound { name: String },

    /// The presence bitmask addresses fields by u8 index.
    #[error("struct '{name}' has {count} fields, exceeding the 255-field limit")]
    TooManyFields { name: String, count: usize },
}
