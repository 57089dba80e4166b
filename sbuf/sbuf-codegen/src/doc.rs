//! Markdown documentation artifact: APIs grouped by module, followed by
//! struct and enum references.

use sbuf_core::{Schema, Type, TypeKind};

use crate::naming::pascal_case;
use crate::writer::{CodeWriter, w};
use crate::GeneratedFile;

pub fn generate_doc(schema: &Schema) -> GeneratedFile {
    let mut out = CodeWriter::new();
    out.line("# API Documentation");
    if !schema.note.is_empty() {
        out.blank();
        out.line(&schema.note);
    }

    for (module, apis) in schema.apis_by_module() {
        out.blank();
        w!(out, "## Module `{module}`");
        for api in apis {
            out.blank();
            w!(out, "### `{}`", api.name);
            if !api.note.is_empty() {
                out.blank();
                out.line(&api.note);
            }
            out.blank();
            w!(out, "`POST {}`", api.path());
            out.blank();
            if api.args.is_empty() {
                out.line("No arguments.");
            } else {
                out.line("| Argument | Type |");
                out.line("|---|---|");
                for arg in &api.args {
                    w!(out, "| {} | `{}` |", arg.name, type_label(&arg.ty));
                }
            }
            out.blank();
            if api.result.is_nil() {
                out.line("Returns nothing (empty response body).");
            } else {
                w!(out, "Returns `{}`.", type_label(&api.result));
            }
        }
    }

    if !schema.structs.is_empty() {
        out.blank();
        out.line("## Structs");
        for s in &schema.structs {
            out.blank();
            w!(out, "### `{}`", pascal_case(&s.name));
            if !s.note.is_empty() {
                out.blank();
                out.line(&s.note);
            }
            out.blank();
            out.line("| Field | Type | Note |");
            out.line("|---|---|---|");
            for field in &s.fields {
                w!(
                    out,
                    "| {} | `{}` | {} |",
                    field.name,
                    type_label(&field.ty),
                    field.note
                );
            }
        }
    }

    if !schema.enums.is_empty() {
        out.blank();
        out.line("## Enums");
        for e in &schema.enums {
            out.blank();
            w!(out, "### `{}`", pascal_case(&e.name));
            if !e.note.is_empty() {
                out.blank();
                out.line(&e.note);
            }
            out.blank();
            out.line("| Variant | Id | Note |");
            out.line("|---|---|---|");
            for child in &e.children {
                w!(out, "| {} | {} | {} |", child.name, child.id, child.note);
            }
        }
    }

    GeneratedFile::new("DOC.md", out.finish())
}

fn type_label(ty: &Type) -> String {
    let name = match ty.kind {
        TypeKind::Base => ty.name.clone(),
        _ => pascal_case(&ty.name),
    };
    if ty.is_list {
        format!("[{name}]")
    } else {
        name
    }
}
