use gentree_core::{RebuildOptions, Store};
use serde_json::json;

fn person_rows(store: &Store) -> Vec<(String, Option<String>, Option<String>, Option<String>)> {
    let mut stmt = store
        .connection()
        .prepare("SELECT id, given_name, family_name, birth_date FROM persons ORDER BY id;")
        .unwrap();
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .unwrap();
    rows.map(Result::unwrap).collect()
}

fn relationship_rows(store: &Store) -> Vec<(String, String)> {
    let mut stmt = store
        .connection()
        .prepare("SELECT parent_id, child_id FROM relationships ORDER BY parent_id, child_id;")
        .unwrap();
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap();
    rows.map(Result::unwrap).collect()
}

fn closure_rows(store: &Store) -> Vec<(String, String, i64)> {
    let mut stmt = store
        .connection()
        .prepare(
            "SELECT ancestor_id, descendant_id, depth FROM closure
             ORDER BY ancestor_id, descendant_id;",
        )
        .unwrap();
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap();
    rows.map(Result::unwrap).collect()
}

fn pair(a: &str, b: &str) -> (String, String) {
    (a.to_string(), b.to_string())
}

fn entry(a: &str, b: &str, depth: i64) -> (String, String, i64) {
    (a.to_string(), b.to_string(), depth)
}

#[test]
fn rebuild_projects_the_concrete_two_person_scenario() {
    let mut store = Store::open_in_memory().unwrap();
    store
        .set_tree(
            &json!([
                { "id": "A", "rels": { "children": ["B"] } },
                { "id": "B", "rels": { "parents": ["A"] } },
            ]),
            None,
        )
        .unwrap();

    assert_eq!(relationship_rows(&store), vec![pair("A", "B")]);
    assert_eq!(
        closure_rows(&store),
        vec![entry("A", "A", 0), entry("A", "B", 1), entry("B", "B", 0)]
    );
}

#[test]
fn rebuild_is_idempotent() {
    let payload = json!({ "data": [
        { "id": "A", "data": { "first name": "Ann" }, "rels": { "children": ["B", "C"] } },
        { "id": "B", "rels": { "parents": ["A"], "children": ["C"] } },
        { "id": "C", "rels": { "parents": ["A", "B"] } },
    ]});

    let mut store = Store::open_in_memory().unwrap();
    store.set_tree(&payload, None).unwrap();
    let first = (
        person_rows(&store),
        relationship_rows(&store),
        closure_rows(&store),
    );

    store.set_tree(&payload, None).unwrap();
    let second = (
        person_rows(&store),
        relationship_rows(&store),
        closure_rows(&store),
    );

    assert_eq!(first, second);
}

#[test]
fn no_relationship_row_references_a_missing_person() {
    let mut store = Store::open_in_memory().unwrap();
    store
        .set_tree(
            &json!([
                { "id": "A", "rels": { "children": ["B", "GHOST"] } },
                { "id": "B", "rels": { "parents": ["A", "PHANTOM"] } },
            ]),
            None,
        )
        .unwrap();

    assert_eq!(relationship_rows(&store), vec![pair("A", "B")]);

    let dangling: i64 = store
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM relationships r
             WHERE NOT EXISTS (SELECT 1 FROM persons p WHERE p.id = r.parent_id)
                OR NOT EXISTS (SELECT 1 FROM persons p WHERE p.id = r.child_id);",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(dangling, 0);
}

#[test]
fn persons_without_a_usable_id_are_dropped_silently() {
    let mut store = Store::open_in_memory().unwrap();
    store
        .set_tree(
            &json!([
                { "id": "A" },
                { "id": "   " },
                { "data": { "first name": "nobody" } },
            ]),
            None,
        )
        .unwrap();

    let rows = person_rows(&store);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, "A");
}

#[test]
fn self_loops_and_duplicate_pairs_collapse() {
    let mut store = Store::open_in_memory().unwrap();
    store
        .set_tree(
            &json!([
                { "id": "A", "rels": { "children": ["A", "B", "B"] } },
                { "id": "B", "rels": { "parents": ["A"] } },
            ]),
            None,
        )
        .unwrap();

    assert_eq!(relationship_rows(&store), vec![pair("A", "B")]);
}

#[test]
fn legacy_tree_key_and_bare_array_payloads_project_identically() {
    let persons = json!([
        { "id": "A", "rels": { "children": ["B"] } },
        { "id": "B", "rels": { "parents": ["A"] } },
    ]);

    let mut as_array = Store::open_in_memory().unwrap();
    as_array.set_tree(&persons, None).unwrap();

    let mut as_tree = Store::open_in_memory().unwrap();
    as_tree
        .set_tree(&json!({ "tree": persons.clone() }), None)
        .unwrap();

    assert_eq!(person_rows(&as_array), person_rows(&as_tree));
    assert_eq!(relationship_rows(&as_array), relationship_rows(&as_tree));
    assert_eq!(closure_rows(&as_array), closure_rows(&as_tree));
}

#[test]
fn unknown_payload_shapes_project_an_empty_dataset() {
    let mut store = Store::open_in_memory().unwrap();
    store.set_tree(&json!({ "persons": [1, 2, 3] }), None).unwrap();

    assert!(person_rows(&store).is_empty());
    assert!(relationship_rows(&store).is_empty());
    assert!(closure_rows(&store).is_empty());
}

#[test]
fn chunk_size_does_not_change_final_table_contents() {
    let payload = json!([
        { "id": "P1", "rels": { "children": ["P2"] } },
        { "id": "P2", "rels": { "parents": ["P1"], "children": ["P3"] } },
        { "id": "P3", "rels": { "parents": ["P2"], "children": ["P4", "P5"] } },
        { "id": "P4", "rels": { "parents": ["P3"] } },
        { "id": "P5", "rels": { "parents": ["P3"] } },
    ]);

    let mut default_chunks = Store::open_in_memory().unwrap();
    default_chunks.set_tree(&payload, None).unwrap();

    let mut tiny_chunks = Store::open_in_memory().unwrap();
    tiny_chunks
        .set_tree(
            &payload,
            Some(&RebuildOptions {
                chunk_size: 2,
                ..RebuildOptions::default()
            }),
        )
        .unwrap();

    assert_eq!(person_rows(&default_chunks), person_rows(&tiny_chunks));
    assert_eq!(
        relationship_rows(&default_chunks),
        relationship_rows(&tiny_chunks)
    );
    assert_eq!(closure_rows(&default_chunks), closure_rows(&tiny_chunks));
}

#[test]
fn metadata_preserves_attributes_rels_and_extras_verbatim() {
    let mut store = Store::open_in_memory().unwrap();
    store
        .set_tree(
            &json!([{
                "id": "A",
                "data": { "first name": "Ann", "nickname": "Annie" },
                "rels": { "children": [], "parents": [], "spouses": ["B"] },
                "main": true,
            }, { "id": "B" }]),
            None,
        )
        .unwrap();

    let metadata: String = store
        .connection()
        .query_row(
            "SELECT metadata FROM persons WHERE id = 'A';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&metadata).unwrap();
    assert_eq!(parsed["data"]["nickname"], json!("Annie"));
    assert_eq!(parsed["rels"]["spouses"], json!(["B"]));
    assert_eq!(parsed["extras"]["main"], json!(true));
}

#[test]
fn rebuild_without_index_drop_matches_default() {
    let payload = json!([
        { "id": "A", "data": { "first name": "Ann" }, "rels": { "children": ["B"] } },
        { "id": "B", "rels": { "parents": ["A"] } },
    ]);

    let mut dropped = Store::open_in_memory().unwrap();
    dropped.set_tree(&payload, None).unwrap();

    let mut kept = Store::open_in_memory().unwrap();
    kept.set_tree(
        &payload,
        Some(&RebuildOptions {
            drop_indexes: false,
            ..RebuildOptions::default()
        }),
    )
    .unwrap();

    assert_eq!(person_rows(&dropped), person_rows(&kept));
    assert_eq!(relationship_rows(&dropped), relationship_rows(&kept));

    // The name indexes must exist again after a dropping rebuild.
    let index_count: i64 = dropped
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type = 'index' AND name = 'idx_persons_name';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(index_count, 1);
}
