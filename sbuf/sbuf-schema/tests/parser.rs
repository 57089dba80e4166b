use sbuf_core::TypeKind;
use sbuf_schema::{SchemaError, compile};

#[test]
fn parses_structs_enums_and_apis_in_declaration_order() {
    let schema = compile(
        r#"
        // Account state machine
        AccountStatus = Offline | Online(3) | Deleted

        // A user record
        User {
            id u32 `bson:"_id"` // primary key
            name text,
            tags [text]
            status AccountStatus
        }

        user.get(id u32) => User
        user.drop(id u32) => nil
        get_count(page u8) => u8
        "#,
    )
    .expect("schema should compile");

    assert_eq!(schema.structs.len(), 1);
    assert_eq!(schema.enums.len(), 1);
    assert_eq!(schema.apis.len(), 3);

    let user = &schema.structs[0];
    assert_eq!(user.name, "User");
    assert_eq!(user.note, "A user record");
    let names: Vec<&str> = user.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["id", "name", "tags", "status"]);
    assert_eq!(user.fields[0].tag, r#"bson:"_id""#);
    assert_eq!(user.fields[0].note, "primary key");
    assert!(user.fields[2].ty.is_list);
    assert_eq!(user.fields[3].ty.kind, TypeKind::Enum);

    let status = &schema.enums[0];
    assert_eq!(status.note, "Account state machine");
    let ids: Vec<u8> = status.children.iter().map(|c| c.id).collect();
    assert_eq!(ids, [0, 3, 4]);
}

#[test]
fn enum_auto_ids_continue_from_explicit_assignment() {
    let schema = compile("E = A | B | C(10) | D | E").expect("schema should compile");
    let ids: Vec<u8> = schema.enums[0].children.iter().map(|c| c.id).collect();
    assert_eq!(ids, [0, 1, 10, 11, 12]);
}

#[test]
fn enum_assign_token_is_optional_with_leading_pipe() {
    let schema = compile("E | A | B").expect("schema should compile");
    let ids: Vec<u8> = schema.enums[0].children.iter().map(|c| c.id).collect();
    assert_eq!(ids, [0, 1]);
}

#[test]
fn enum_auto_id_overflow_is_rejected() {
    let mut src = String::from("Big =");
    for i in 0..257 {
        if i > 0 {
            src.push_str(" |");
        }
        src.push_str(&format!(" V{i}"));
    }
    let err = compile(&src).expect_err("id 256 cannot fit in u8");
    assert!(matches!(err, SchemaError::EnumIdOverflow { .. }));
}

#[test]
fn explicit_enum_id_out_of_range_is_rejected() {
    let err = compile("E = A(300)").expect_err("300 exceeds u8");
    assert!(matches!(err, SchemaError::InvalidEnumId { .. }));
    let err = compile("E = A(-1)").expect_err("ids are unsigned");
    assert!(matches!(err, SchemaError::InvalidEnumId { .. }));
}

#[test]
fn duplicate_top_level_names_are_rejected_with_line() {
    let err = compile("User { id u32 }\nUser { name text }").expect_err("redefinition");
    assert_eq!(
        err,
        SchemaError::Redefined {
            line: 2,
            name: "User".to_string(),
        }
    );

    // Structs and enums share one namespace.
    let err = compile("User { id u32 }\nUser = A | B").expect_err("redefinition");
    assert!(matches!(err, SchemaError::Redefined { line: 2, .. }));
}

#[test]
fn embedded_field_is_recognized_by_line_break() {
    let schema = compile("Base { id u32 }\nUser {\n Base\n name text\n}").expect("compiles");
    let user = schema.find_struct("User").unwrap();
    // Base's fields were inlined ahead of User's own.
    let names: Vec<&str> = user.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["id", "name"]);
}

#[test]
fn embedded_field_on_closing_brace_line_is_recognized() {
    let schema = compile("Base { id u32 }\nUser { Base }").expect("compiles");
    let user = schema.find_struct("User").unwrap();
    assert_eq!(user.fields.len(), 1);
    assert_eq!(user.fields[0].name, "id");
}

#[test]
fn dotted_api_names_and_module_grouping() {
    let schema = compile(
        "user.get_abc() => u8\nuser.set(v u8) => nil\nget_count(page u8) => u8",
    )
    .expect("compiles");

    assert_eq!(schema.apis[0].name, "user.get_abc");
    assert_eq!(schema.apis[0].module(), "user");
    assert_eq!(schema.apis[0].path(), "/user.get_abc");
    assert_eq!(schema.apis[2].module(), "api");

    let groups = schema.apis_by_module();
    assert_eq!(groups["user"].len(), 2);
    assert_eq!(groups["api"].len(), 1);
}

#[test]
fn api_result_nil_resolves_as_base() {
    let schema = compile("ping() => nil").expect("compiles");
    let api = &schema.apis[0];
    assert!(api.result.is_nil());
    assert_eq!(api.result.kind, TypeKind::Base);
}

#[test]
fn api_trailing_comment_replaces_doc_note() {
    let schema = compile("// pending note\nping() => nil // same-line note").expect("compiles");
    assert_eq!(schema.apis[0].note, "same-line note");
}

#[test]
fn api_missing_arrow_is_rejected() {
    let err = compile("user.get(id u32) User").expect_err("no arrow");
    assert!(matches!(err, SchemaError::Expected { expected: "'=>'", .. }));
}

#[test]
fn api_missing_result_is_rejected() {
    let err = compile("user.get(id u32) =>").expect_err("no result");
    assert!(matches!(
        err,
        SchemaError::Expected {
            expected: "result type or 'nil'",
            ..
        }
    ));
}

#[test]
fn unterminated_struct_is_rejected() {
    let err = compile("User { id u32").expect_err("missing brace");
    assert!(matches!(err, SchemaError::Expected { .. }));
}

#[test]
fn unknown_character_reports_lex_error_with_line() {
    let err = compile("User { id u32 }\n@").expect_err("bad character");
    assert_eq!(
        err,
        SchemaError::Lex {
            line: 2,
            message: "unexpected character '@'".to_string(),
        }
    );
}

#[test]
fn comment_lines_inside_struct_bodies_are_skipped() {
    let schema = compile("User {\n // standalone\n id u32 // attached\n}").expect("compiles");
    let user = &schema.structs[0];
    assert_eq!(user.fields.len(), 1);
    assert_eq!(user.fields[0].note, "attached");
}

#[test]
fn backquoted_tags_and_multiline_notes_attach() {
    let schema = compile(
        "// first line\n// second line\nUser { blob bin \"raw\" }",
    )
    .expect("compiles");
    assert_eq!(schema.structs[0].note, "first line\nsecond line");
    assert_eq!(schema.structs[0].fields[0].tag, "raw");
}
