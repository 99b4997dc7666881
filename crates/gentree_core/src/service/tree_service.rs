//! Tree use-case service.
//!
//! # Responsibility
//! - Provide the stable entry points callers (HTTP layer, CLI, tooling)
//!   use: document read/write, GEDCOM import/export, search, traversal.
//! - Delegate persistence to the store and repositories.
//!
//! # Invariants
//! - Service APIs never bypass the store's transaction orchestration.
//! - Import and save paths share the projection pipeline, so streaming
//!   and bulk imports converge on identical relational state.

use crate::db::DbResult;
use crate::gedcom::{generate_gedcom, parse_gedcom};
use crate::import::{ingest_gedcom, ImportOptions, ImportOutcome, ImportResult};
use crate::model::document::Document;
use crate::repo::person_repo::SqlitePersonRepository;
use crate::search::fts::{search_persons, SearchHit, SearchQuery, SearchResult};
use crate::store::{Store, StoreResult};
use serde_json::Value;
use std::io::BufRead;
use std::path::Path;

/// Use-case facade owning the storage context.
pub struct TreeService {
    store: Store,
}

impl TreeService {
    /// Wraps an already-open store.
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Opens a file-backed service with an empty-dataset seed.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(Store::open(path)?))
    }

    /// Opens a file-backed service seeding the dataset on first boot.
    pub fn open_with_seed(
        path: impl AsRef<Path>,
        seed: impl FnOnce() -> Value,
    ) -> DbResult<Self> {
        Ok(Self::new(Store::open_with_seed(path, seed)?))
    }

    /// Reads the canonical document.
    pub fn get_tree(&self) -> DbResult<Value> {
        self.store.get_tree()
    }

    /// Saves the document and rebuilds the projection atomically.
    pub fn set_tree(&mut self, payload: &Value) -> DbResult<Document> {
        self.store.set_tree(payload, None)
    }

    /// Timestamp of the last save.
    pub fn last_updated_at(&self) -> DbResult<Option<String>> {
        self.store.last_updated_at()
    }

    /// Overwrites the dataset with a seed payload wholesale.
    pub fn reset_to_seed(&mut self, seed: &Value) -> DbResult<Document> {
        self.store.reset_to_seed(seed)
    }

    /// Streams a GEDCOM source into storage, bypassing the document.
    pub fn import_gedcom<R: BufRead>(
        &mut self,
        reader: R,
        options: ImportOptions,
    ) -> ImportResult<ImportOutcome> {
        let mut buffer = self.store.import_buffer(options)?;
        ingest_gedcom(reader, &mut buffer)?;
        let outcome = buffer.commit()?;
        Ok(outcome)
    }

    /// Imports GEDCOM text through the codec and a full document save.
    ///
    /// Smaller inputs only; large files should use [`Self::import_gedcom`].
    pub fn import_gedcom_text(&mut self, text: &str) -> DbResult<Document> {
        let persons = parse_gedcom(text);
        let document = Document::from_persons(&persons);
        self.store.set_tree(&document.to_value(), None)
    }

    /// Exports the current person graph as GEDCOM text.
    pub fn export_gedcom(&self) -> DbResult<String> {
        let payload = self.store.get_tree()?;
        let persons = Document::normalize(&payload).persons();
        Ok(generate_gedcom(&persons))
    }

    /// Full-text search over projected persons.
    pub fn search(&self, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
        search_persons(&self.store, query)
    }

    /// Re-derives the search index from the persons table.
    pub fn rebuild_search_index(&mut self) -> StoreResult<usize> {
        self.store.rebuild_search_index()
    }

    /// Read-side person repository.
    pub fn persons(&self) -> SqlitePersonRepository<'_> {
        self.store.persons()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Closes the underlying store.
    pub fn close(self) {
        self.store.close();
    }
}
