//! Schema AST shared between the front-end, the codec, and the generators.
//!
//! The parser constructs these types, the resolver in `sbuf-schema` mutates
//! them in place (kind assignment, embedded-field expansion), and everything
//! downstream consumes them read-only.

use std::collections::BTreeMap;

/// Closed set of built-in scalar type names.
pub const BASE_TYPES: [&str; 13] = [
    "i8", "u8", "i16", "u16", "i32", "u32", "i64", "u64", "f32", "f64", "bool", "text", "bin",
];

/// Returns `true` for names in [`BASE_TYPES`].
pub fn is_base_type(name: &str) -> bool {
    BASE_TYPES.contains(&name)
}

/// Resolved category of a type reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Base,
    Struct,
    Enum,
}

/// A reference to a named type, possibly wrapped in a list.
///
/// `kind` is meaningful only after resolution; the parser leaves it at
/// `Base` and the resolver overwrites it for struct and enum references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub name: String,
    pub is_list: bool,
    pub kind: TypeKind,
}

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_list: false,
            kind: TypeKind::Base,
        }
    }

    pub fn list_of(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_list: true,
            kind: TypeKind::Base,
        }
    }

    /// The `nil` name marks "no result" in API return position.
    pub fn is_nil(&self) -> bool {
        self.name == "nil"
    }

    pub fn is_bool(&self) -> bool {
        !self.is_list && self.kind == TypeKind::Base && self.name == "bool"
    }
}

/// A single struct field.
///
/// An empty `name` marks an embedded field: `ty.name` refers to another
/// struct whose fields are inlined during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    pub name: String,
    pub ty: Type,
    /// Raw tag literal payload (quotes stripped), e.g. `bson:"_id"` input.
    pub tag: String,
    pub note: String,
}

impl StructField {
    pub fn is_embedded(&self) -> bool {
        self.name.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Struct {
    pub name: String,
    pub fields: Vec<StructField>,
    pub note: String,
}

impl Struct {
    /// Bytes in this struct's presence bitmask (one bit per field).
    pub fn mask_len(&self) -> usize {
        self.fields.len().div_ceil(8)
    }
}

/// One enum variant. Ids need not be contiguous or monotonic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumChild {
    pub id: u8,
    pub name: String,
    pub note: String,
}

/// An enum definition; underlying storage is always u8 on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Enum {
    pub name: String,
    pub children: Vec<EnumChild>,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiArg {
    pub name: String,
    pub ty: Type,
}

/// An RPC endpoint. `name` may be dotted (`user.get_abc`); the first dotted
/// segment is the module, and single-segment names live in module `api`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Api {
    pub name: String,
    pub args: Vec<ApiArg>,
    pub result: Type,
    pub note: String,
}

impl Api {
    pub fn module(&self) -> &str {
        match self.name.split_once('.') {
            Some((module, _)) => module,
            None => "api",
        }
    }

    /// HTTP path the endpoint is registered under (dots preserved).
    pub fn path(&self) -> String {
        format!("/{}", self.name)
    }
}

/// Root of a parsed (and, after `sbuf-schema` resolution, validated) schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    pub structs: Vec<Struct>,
    pub enums: Vec<Enum>,
    pub apis: Vec<Api>,
    pub note: String,
}

impl Schema {
    pub fn find_struct(&self, name: &str) -> Option<&Struct> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn find_enum(&self, name: &str) -> Option<&Enum> {
        self.enums.iter().find(|e| e.name == name)
    }

    /// APIs grouped by module, in deterministic module order.
    pub fn apis_by_module(&self) -> BTreeMap<&str, Vec<&Api>> {
        let mut groups: BTreeMap<&str, Vec<&Api>> = BTreeMap::new();
        for api in &self.apis {
            groups.entry(api.module()).or_default().push(api);
        }
        groups
    }
}
