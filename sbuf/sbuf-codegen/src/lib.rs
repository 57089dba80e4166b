//! Code generators for sbuf schemas.
//!
//! Each generator consumes a resolved [`sbuf_core::Schema`] and produces a
//! list of [`GeneratedFile`]s; writing them to disk is the CLI's concern.
//! The observable contracts every target must uphold: field iteration in
//! declaration order, mask bit index = field index, enums as u8 on the wire,
//! `SetAll`-concatenated request bodies, and API paths that keep their dots.

mod doc;
mod go;
mod naming;
mod ts;
mod writer;

pub use doc::generate_doc;
pub use go::{GoOptions, generate_go};
pub use naming::{camel_case, pascal_case, snake_case};
pub use ts::generate_ts;

/// One output file, with a path relative to the target package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
    /// Scaffolding (logic stubs) the driver must not clobber on regeneration.
    pub skip_if_exists: bool,
}

impl GeneratedFile {
    fn new(path: impl Into<String>, content: String) -> Self {
        Self {
            path: path.into(),
            content,
            skip_if_exists: false,
        }
    }

    fn scaffold(path: impl Into<String>, content: String) -> Self {
        Self {
            path: path.into(),
            content,
            skip_if_exists: true,
        }
    }
}

/// Raised when a schema reaches a generator without having been resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodegenError {
    #[error("unresolved base type '{name}' reached the {target} generator")]
    UnknownBaseType { name: String, target: &'static str },
}
