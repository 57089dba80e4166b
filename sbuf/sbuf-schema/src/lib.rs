//! Schema language front-end for sbuf.
//!
//! # Pipeline
//!
//! ```text
//! schema source (UTF-8 text)
//!   └─ Lexer        – characters → line-tracked tokens
//!       └─ Parser   – tokens → Schema (structs, enums, APIs)
//!           └─ resolve – kind assignment, embedded expansion, field bounds
//! ```
//!
//! [`compile`] runs the whole pipeline; the pieces are public for tools that
//! want to stop part-way (e.g. formatters working on the unresolved AST).

mod error;
mod lex;
mod parser;
mod resolver;

use sbuf_core::Schema;

pub use error::SchemaError;
pub use lex::{Lexer, Token, TokenKind};
pub use parser::Parser;
pub use resolver::resolve;

/// Compile schema source into a fully resolved [`Schema`].
pub fn compile(source: &str) -> Result<Schema, SchemaError> {
    let mut schema = Parser::new(Lexer::new(source)).parse()?;
    resolve(&mut schema)?;
    Ok(schema)
}
