use gentree_core::{ImportOptions, PersonRepository, Store, TreeService};
use serde_json::json;
use std::io::Cursor;

const SAMPLE: &str = "\
0 HEAD
1 SOUR gentree
0 @I1@ INDI
1 NAME John /Doe/
1 SEX M
1 BIRT
2 DATE 1 JAN 1950
0 @I2@ INDI
1 NAME Jane /Doe/
1 SEX F
1 DEAT
2 DATE 3 MAR 2020
0 @I3@ INDI
1 NAME Kim /Doe/
0 @F1@ FAM
1 HUSB @I1@
1 WIFE @I2@
1 CHIL @I3@
0 TRLR
";

fn person_columns(store: &Store) -> Vec<(String, Option<String>, Option<String>, Option<String>)> {
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

#[test]
fn streaming_import_fills_all_derived_tables() {
    let mut service = TreeService::new(Store::open_in_memory().unwrap());
    let outcome = service
        .import_gedcom(Cursor::new(SAMPLE), ImportOptions::default())
        .unwrap();

    assert_eq!(outcome.persons, 3);
    assert_eq!(outcome.relationships, 2);
    assert_eq!(outcome.closure_entries, 5);

    let persons = person_columns(service.store());
    assert_eq!(persons.len(), 3);
    assert_eq!(
        persons[0],
        (
            "I1".to_string(),
            Some("John".to_string()),
            Some("Doe".to_string()),
            Some("1 JAN 1950".to_string()),
        )
    );

    assert_eq!(
        relationship_rows(service.store()),
        vec![
            ("I1".to_string(), "I3".to_string()),
            ("I2".to_string(), "I3".to_string()),
        ]
    );
}

#[test]
fn streaming_and_codec_imports_project_the_same_tables() {
    let mut streamed = TreeService::new(Store::open_in_memory().unwrap());
    streamed
        .import_gedcom(Cursor::new(SAMPLE), ImportOptions::default())
        .unwrap();

    let mut bulk = TreeService::new(Store::open_in_memory().unwrap());
    bulk.import_gedcom_text(SAMPLE).unwrap();

    assert_eq!(
        person_columns(streamed.store()),
        person_columns(bulk.store())
    );
    assert_eq!(
        relationship_rows(streamed.store()),
        relationship_rows(bulk.store())
    );
    assert_eq!(closure_rows(streamed.store()), closure_rows(bulk.store()));
}

#[test]
fn family_records_ahead_of_their_members_still_link() {
    let text = "\
0 @F1@ FAM
1 HUSB @I1@
1 CHIL @I2@
0 @I1@ INDI
1 NAME Early /Bird/
0 @I2@ INDI
1 NAME Late /Bird/
0 TRLR
";

    let mut service = TreeService::new(Store::open_in_memory().unwrap());
    service
        .import_gedcom(Cursor::new(text), ImportOptions::default())
        .unwrap();

    assert_eq!(
        relationship_rows(service.store()),
        vec![("I1".to_string(), "I2".to_string())]
    );
}

#[test]
fn dangling_family_references_are_filtered_out() {
    let text = "\
0 @I1@ INDI
1 NAME Only /Child/
0 @F1@ FAM
1 HUSB @MISSING@
1 CHIL @I1@
1 CHIL @ALSO_MISSING@
0 TRLR
";

    let mut service = TreeService::new(Store::open_in_memory().unwrap());
    let outcome = service
        .import_gedcom(Cursor::new(text), ImportOptions::default())
        .unwrap();

    assert_eq!(outcome.persons, 1);
    assert_eq!(outcome.relationships, 0);
    assert!(relationship_rows(service.store()).is_empty());
}

#[test]
fn stray_dates_after_unrelated_tags_are_ignored() {
    let text = "\
0 @I1@ INDI
1 BIRT
2 DATE 1 JAN 1980
1 OCCU Sailor
2 DATE 9 SEP 1999
0 TRLR
";

    let mut service = TreeService::new(Store::open_in_memory().unwrap());
    service
        .import_gedcom(Cursor::new(text), ImportOptions::default())
        .unwrap();

    let persons = person_columns(service.store());
    assert_eq!(persons[0].3, Some("1 JAN 1980".to_string()));

    let metadata: String = service
        .store()
        .connection()
        .query_row("SELECT metadata FROM persons WHERE id = 'I1';", [], |row| {
            row.get(0)
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&metadata).unwrap();
    assert_eq!(parsed["data"]["death"], json!(null));
    assert_eq!(parsed["data"]["occupation"], json!("Sailor"));
}

#[test]
fn malformed_lines_are_skipped_mid_stream() {
    let text = "\
garbage
0 @I1@ INDI
not a line
1 NAME Ann /Reed/
0 TRLR
";

    let mut service = TreeService::new(Store::open_in_memory().unwrap());
    let outcome = service
        .import_gedcom(Cursor::new(text), ImportOptions::default())
        .unwrap();

    assert_eq!(outcome.persons, 1);
    let persons = person_columns(service.store());
    assert_eq!(persons[0].1, Some("Ann".to_string()));
}

#[test]
fn duplicate_family_pairs_collapse_to_one_row() {
    let text = "\
0 @I1@ INDI
0 @I2@ INDI
0 @F1@ FAM
1 HUSB @I1@
1 CHIL @I2@
0 @F2@ FAM
1 HUSB @I1@
1 CHIL @I2@
0 TRLR
";

    let mut service = TreeService::new(Store::open_in_memory().unwrap());
    let outcome = service
        .import_gedcom(Cursor::new(text), ImportOptions::default())
        .unwrap();

    assert_eq!(outcome.relationships, 1);
    assert_eq!(
        relationship_rows(service.store()),
        vec![("I1".to_string(), "I2".to_string())]
    );
}

#[test]
fn streaming_import_leaves_the_payload_document_alone() {
    let mut service = TreeService::new(Store::open_in_memory().unwrap());
    service.set_tree(&json!([{ "id": "manual" }])).unwrap();

    service
        .import_gedcom(Cursor::new(SAMPLE), ImportOptions::default())
        .unwrap();

    // The canonical document is untouched; only derived tables changed.
    let payload = service.get_tree().unwrap();
    assert_eq!(payload, json!([{ "id": "manual" }]));
    assert_eq!(service.persons().count_persons().unwrap(), 3);
}

#[test]
fn fast_import_produces_the_same_tables() {
    let mut plain = TreeService::new(Store::open_in_memory().unwrap());
    plain
        .import_gedcom(Cursor::new(SAMPLE), ImportOptions::default())
        .unwrap();

    let mut fast = TreeService::new(Store::open_in_memory().unwrap());
    fast.import_gedcom(
        Cursor::new(SAMPLE),
        ImportOptions {
            fast_import: true,
            chunk_size: 2,
            ..ImportOptions::default()
        },
    )
    .unwrap();

    assert_eq!(person_columns(plain.store()), person_columns(fast.store()));
    assert_eq!(
        relationship_rows(plain.store()),
        relationship_rows(fast.store())
    );
    assert_eq!(closure_rows(plain.store()), closure_rows(fast.store()));
}
