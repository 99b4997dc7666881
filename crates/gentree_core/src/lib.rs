//! Core domain logic for the gentree genealogy store.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod gedcom;
pub mod import;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod store;

pub use gedcom::{generate_gedcom, parse_gedcom};
pub use import::{ingest_gedcom, ImportBuffer, ImportError, ImportOptions, ImportOutcome};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::document::Document;
pub use model::person::{Person, Rels};
pub use repo::person_repo::{PersonRepository, PersonRow, Relative, SqlitePersonRepository};
pub use repo::projection::{RebuildOptions, RebuildOutcome};
pub use search::fts::{search_persons, SearchError, SearchHit, SearchQuery, SearchResult};
pub use service::tree_service::TreeService;
pub use store::{Store, StoreError, StoreOptions};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
