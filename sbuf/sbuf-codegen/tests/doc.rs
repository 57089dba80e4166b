use sbuf_codegen::generate_doc;

#[test]
fn doc_groups_apis_by_module_and_lists_types() {
    let schema = sbuf_schema::compile(
        r#"
        // Order lifecycle
        OrderStatus = Pending | Shipped(3) // can resume

        SimInfo {
            id u32 // primary key
            title text
        }

        // Fetch a user's status
        user.get_abc() => OrderStatus
        get_count(page u8) => u8
        drop_all() => nil
        "#,
    )
    .unwrap();

    let doc = generate_doc(&schema).content;

    // Single-segment names group under `api`; dotted ones under their module.
    assert!(doc.contains("## Module `api`"));
    assert!(doc.contains("## Module `user`"));
    let api_pos = doc.find("## Module `api`").unwrap();
    let user_pos = doc.find("## Module `user`").unwrap();
    assert!(api_pos < user_pos, "modules are sorted");

    assert!(doc.contains("### `user.get_abc`"));
    assert!(doc.contains("Fetch a user's status"));
    assert!(doc.contains("`POST /user.get_abc`"));
    assert!(doc.contains("| page | `u8` |"));
    assert!(doc.contains("Returns `OrderStatus`."));
    assert!(doc.contains("Returns nothing (empty response body)."));

    assert!(doc.contains("### `SimInfo`"));
    assert!(doc.contains("| id | `u32` | primary key |"));
    assert!(doc.contains("### `OrderStatus`"));
    assert!(doc.contains("| Shipped | 3 | can resume |"));
}
