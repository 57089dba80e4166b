//! Type resolution over a freshly parsed schema.
//!
//! Three passes, all mutating the AST in place:
//!
//! 1. **Kind assignment** — every type reference in struct fields and API
//!    args/results becomes `Base`, `Struct`, or `Enum`, or resolution fails
//!    naming the containing entity.
//! 2. **Embedded expansion** — fields with an empty name are replaced by the
//!    full, already-expanded field list of the named struct. Re-entering a
//!    struct mid-expansion is a circular-embedding error.
//! 3. **Field bound** — after expansion every struct must fit the 255-field
//!    limit the presence bitmask relies on.

use std::collections::{HashMap, HashSet};

use sbuf_core::{Schema, StructField, Type, TypeKind, is_base_type};

use crate::error::SchemaError;

pub fn resolve(schema: &mut Schema) -> Result<(), SchemaError> {
    let struct_names: HashSet<String> = schema.structs.iter().map(|s| s.name.clone()).collect();
    let enum_names: HashSet<String> = schema.enums.iter().map(|e| e.name.clone()).collect();

    resolve_struct_fields(schema, &struct_names, &enum_names)?;
    resolve_api_types(schema, &struct_names, &enum_names)?;
    expand_embedded(schema)?;
    check_field_bounds(schema)
}

fn resolve_struct_fields(
    schema: &mut Schema,
    struct_names: &HashSet<String>,
    enum_names: &HashSet<String>,
) -> Result<(), SchemaError> {
    for s in &mut schema.structs {
        for field in &mut s.fields {
            // Embedded fields have no name of their own; report them by the
            // struct they pull in.
            let label = if field.name.is_empty() {
                &field.ty.name
            } else {
                &field.name
            };
            let context = format!("struct {} field {}", s.name, label);
            resolve_type(&mut field.ty, struct_names, enum_names, &context)?;
        }
    }
    Ok(())
}

fn resolve_api_types(
    schema: &mut Schema,
    struct_names: &HashSet<String>,
    enum_names: &HashSet<String>,
) -> Result<(), SchemaError> {
    for api in &mut schema.apis {
        for arg in &mut api.args {
            let context = format!("api {} arg {}", api.name, arg.name);
            resolve_type(&mut arg.ty, struct_names, enum_names, &context)?;
        }
        let context = format!("api {} result", api.name);
        resolve_type(&mut api.result, struct_names, enum_names, &context)?;
    }
    Ok(())
}

fn resolve_type(
    ty: &mut Type,
    struct_names: &HashSet<String>,
    enum_names: &HashSet<String>,
    context: &str,
) -> Result<(), SchemaError> {
    if ty.name == "nil" || is_base_type(&ty.name) {
        ty.kind = TypeKind::Base;
    } else if struct_names.contains(&ty.name) {
        ty.kind = TypeKind::Struct;
    } else if enum_names.contains(&ty.name) {
        ty.kind = TypeKind::Enum;
    } else {
        return Err(SchemaError::UndefinedType {
            context: context.to_string(),
            name: ty.name.clone(),
        });
    }
    Ok(())
}

/// Materializes embedded fields eagerly so later phases never re-traverse.
/// Expansion runs against the pre-expansion field lists, depth-first, with a
/// per-root set of structs currently being expanded.
fn expand_embedded(schema: &mut Schema) -> Result<(), SchemaError> {
    let by_name: HashMap<String, Vec<StructField>> = schema
        .structs
        .iter()
        .map(|s| (s.name.clone(), s.fields.clone()))
        .collect();

    for s in &mut schema.structs {
        let mut in_progress = HashSet::new();
        s.fields = expand_fields(&s.fields, &by_name, &mut in_progress, &s.name)?;
    }
    Ok(())
}

fn expand_fields(
    fields: &[StructField],
    by_name: &HashMap<String, Vec<StructField>>,
    in_progress: &mut HashSet<String>,
    root: &str,
) -> Result<Vec<StructField>, SchemaError> {
    if !in_progress.insert(root.to_string()) {
        return Err(SchemaError::CircularEmbedding {
            name: root.to_string(),
        });
    }

    let mut result = Vec::with_capacity(fields.len());
    for field in fields {
        if !field.is_embedded() {
            result.push(field.clone());
            continue;
        }
        // Kind assignment already ran, so a miss here means the name
        // resolved to something that is not a struct.
        let base = by_name
            .get(&field.ty.name)
            .ok_or_else(|| SchemaError::EmbeddedNotFound {
                name: field.ty.name.clone(),
            })?;
        result.extend(expand_fields(base, by_name, in_progress, &field.ty.name)?);
    }

    in_progress.remove(root);
    Ok(result)
}

fn check_field_bounds(schema: &Schema) -> Result<(), SchemaError> {
    for s in &schema.structs {
        if s.fields.len() > 255 {
            return Err(SchemaError::TooManyFields {
                name: s.name.clone(),
                count: s.fields.len(),
            });
        }
    }
    Ok(())
}
