use gentree_core::{
    search_persons, SearchError, SearchQuery, Store, StoreError, StoreOptions,
};
use serde_json::json;

fn seeded_store() -> Store {
    let mut store = Store::open_in_memory().unwrap();
    store
        .set_tree(
            &json!([
                { "id": "A", "data": { "first name": "Amelia", "last name": "Stone",
                                       "occupation": "Cartographer" } },
                { "id": "B", "data": { "first name": "Ben", "last name": "Stone" } },
                { "id": "C", "data": { "first name": "Clara", "last name": "Reed" } },
            ]),
            None,
        )
        .unwrap();
    store
}

#[test]
fn search_finds_persons_by_name() {
    let store = seeded_store();
    let hits = search_persons(&store, &SearchQuery::new("Amelia")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "A");
    assert_eq!(hits[0].given_name.as_deref(), Some("Amelia"));
}

#[test]
fn search_terms_are_and_combined() {
    let store = seeded_store();

    let stones = search_persons(&store, &SearchQuery::new("Stone")).unwrap();
    assert_eq!(stones.len(), 2);

    let narrowed = search_persons(&store, &SearchQuery::new("Stone Amelia")).unwrap();
    assert_eq!(narrowed.len(), 1);
    assert_eq!(narrowed[0].id, "A");
}

#[test]
fn search_covers_metadata_beyond_names() {
    let store = seeded_store();
    let hits = search_persons(&store, &SearchQuery::new("Cartographer")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "A");
}

#[test]
fn blank_queries_return_nothing() {
    let store = seeded_store();
    assert!(search_persons(&store, &SearchQuery::new("")).unwrap().is_empty());
    assert!(search_persons(&store, &SearchQuery::new("   "))
        .unwrap()
        .is_empty());
}

#[test]
fn limit_caps_the_hit_count() {
    let store = seeded_store();
    let mut query = SearchQuery::new("Stone");
    query.limit = 1;
    assert_eq!(search_persons(&store, &query).unwrap().len(), 1);
}

#[test]
fn searches_reflect_the_latest_save() {
    let mut store = seeded_store();
    store
        .set_tree(&json!([{ "id": "Z", "data": { "first name": "Zoe" } }]), None)
        .unwrap();

    assert!(search_persons(&store, &SearchQuery::new("Amelia"))
        .unwrap()
        .is_empty());
    assert_eq!(
        search_persons(&store, &SearchQuery::new("Zoe")).unwrap().len(),
        1
    );
}

#[test]
fn quotes_in_queries_are_escaped_not_parsed() {
    let store = seeded_store();
    let hits = search_persons(&store, &SearchQuery::new("\"Amelia")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "A");
}

#[test]
fn broken_raw_syntax_reports_an_invalid_query() {
    let store = seeded_store();
    let mut query = SearchQuery::new("Stone AND (");
    query.raw_fts_syntax = true;

    match search_persons(&store, &query) {
        Err(SearchError::InvalidQuery { .. }) => {}
        other => panic!("expected InvalidQuery, got {other:?}"),
    }
}

#[test]
fn disabled_search_is_reported_not_swallowed() {
    let mut store = Store::open_in_memory_with(StoreOptions {
        disable_search: true,
        ..StoreOptions::default()
    })
    .unwrap();
    store.set_tree(&json!([{ "id": "A" }]), None).unwrap();

    match search_persons(&store, &SearchQuery::new("anything")) {
        Err(SearchError::Disabled) => {}
        other => panic!("expected Disabled, got {other:?}"),
    }

    match store.rebuild_search_index() {
        Err(StoreError::SearchDisabled) => {}
        other => panic!("expected SearchDisabled, got {other:?}"),
    }
}

#[test]
fn rebuild_search_index_reports_indexed_rows() {
    let mut store = seeded_store();
    assert_eq!(store.rebuild_search_index().unwrap(), 3);
}
