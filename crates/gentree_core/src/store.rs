//! Process-wide storage context.
//!
//! # Responsibility
//! - Own the SQLite connection, the search-enabled flag and default
//!   rebuild options as one explicit object threaded through every
//!   component call; no file-scoped singletons.
//! - Orchestrate the payload-write + projection-rebuild transaction.
//!
//! # Invariants
//! - One logical writer: a payload save and its projection rebuild commit
//!   or roll back together.
//! - Once the search index fails (setup or rebuild), search stays disabled
//!   for the store lifetime; no write operation fails because of it.

use crate::db::{bootstrap_connection, open_file, open_memory, DbError, DbResult};
use crate::import::{ImportBuffer, ImportOptions};
use crate::model::document::Document;
use crate::repo::dataset_repo;
use crate::repo::person_repo::SqlitePersonRepository;
use crate::repo::projection::{self, RebuildOptions};
use log::info;
use rusqlite::Connection;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level error for operations beyond plain persistence.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// Full-text search is unavailable in this process (missing FTS5
    /// module or a failed index rebuild).
    SearchDisabled,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::SearchDisabled => write!(f, "full-text search is disabled for this process"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::SearchDisabled => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Construction-time knobs for a store.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Force-disable search even when FTS5 is available.
    pub disable_search: bool,
    /// Default rebuild options applied when a save passes none.
    pub rebuild: RebuildOptions,
}

/// Storage context constructed once at process startup.
pub struct Store {
    conn: Connection,
    fts_enabled: bool,
    defaults: RebuildOptions,
}

impl Store {
    /// Opens a file-backed store with an empty-dataset seed.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Self::open_with_seed(path, || Document::default().to_value())
    }

    /// Opens a file-backed store, seeding the dataset from the loader when
    /// no dataset row exists yet.
    pub fn open_with_seed(
        path: impl AsRef<Path>,
        seed: impl FnOnce() -> Value,
    ) -> DbResult<Self> {
        let conn = open_file(path)?;
        Self::finish_open(conn, StoreOptions::default(), seed)
    }

    /// Opens an in-memory store, mainly for tests and tooling.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open_in_memory_with(StoreOptions::default())
    }

    pub fn open_in_memory_with(options: StoreOptions) -> DbResult<Self> {
        let conn = open_memory()?;
        Self::finish_open(conn, options, || Document::default().to_value())
    }

    fn finish_open(
        conn: Connection,
        options: StoreOptions,
        seed: impl FnOnce() -> Value,
    ) -> DbResult<Self> {
        let fts_available = bootstrap_connection(&conn)?;
        let mut store = Self {
            conn,
            fts_enabled: fts_available && !options.disable_search,
            defaults: options.rebuild,
        };

        if !dataset_repo::dataset_exists(&store.conn)? {
            let seed_payload = seed();
            store.set_tree(&seed_payload, None)?;
            info!("event=store_seed module=store status=ok");
        }

        Ok(store)
    }

    /// Reads the canonical document; corrupt storage degrades to empty.
    pub fn get_tree(&self) -> DbResult<Value> {
        dataset_repo::get_payload(&self.conn)
    }

    /// Persists the payload and rebuilds the relational projection in one
    /// all-or-nothing transaction. Returns the normalized document.
    pub fn set_tree(
        &mut self,
        payload: &Value,
        options: Option<&RebuildOptions>,
    ) -> DbResult<Document> {
        let payload_text = serde_json::to_string(payload)?;
        let normalized = Document::normalize(payload);
        let rebuild_options = options.unwrap_or(&self.defaults).clone();
        let fts_enabled = self.fts_enabled;

        let tx = self.conn.transaction()?;
        dataset_repo::save_payload(&tx, &payload_text)?;
        let outcome = projection::rebuild(&tx, payload, fts_enabled, &rebuild_options)?;
        tx.commit()?;

        if fts_enabled && !outcome.fts_ok {
            self.fts_enabled = false;
        }
        Ok(normalized)
    }

    /// Timestamp of the last save, or `None` before the first one.
    pub fn last_updated_at(&self) -> DbResult<Option<String>> {
        dataset_repo::last_updated_at(&self.conn)
    }

    /// Overwrites the dataset with the provided seed payload wholesale.
    pub fn reset_to_seed(&mut self, seed: &Value) -> DbResult<Document> {
        self.set_tree(seed, None)
    }

    /// Re-derives the search index from the persons table.
    ///
    /// # Errors
    /// Returns [`StoreError::SearchDisabled`] when search is unavailable.
    pub fn rebuild_search_index(&mut self) -> StoreResult<usize> {
        if !self.fts_enabled {
            return Err(StoreError::SearchDisabled);
        }
        let chunk_size = self.defaults.chunk_size;
        let tx = self.conn.transaction()?;
        let indexed = projection::rebuild_search_rows(&tx, chunk_size)?;
        tx.commit()?;
        Ok(indexed)
    }

    /// Opens a batched import surface bypassing the payload document.
    ///
    /// The buffer holds one transaction from construction to `commit`; a
    /// dropped buffer rolls everything back.
    pub fn import_buffer(&mut self, options: ImportOptions) -> DbResult<ImportBuffer<'_>> {
        let Store {
            conn, fts_enabled, ..
        } = self;
        ImportBuffer::begin(conn, fts_enabled, options)
    }

    /// Whether full-text search is currently available.
    pub fn search_enabled(&self) -> bool {
        self.fts_enabled
    }

    /// Default rebuild options for this store.
    pub fn rebuild_defaults(&self) -> &RebuildOptions {
        &self.defaults
    }

    /// Raw connection access for read-side repositories and callers with
    /// bespoke queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Read-side person repository bound to this store.
    pub fn persons(&self) -> SqlitePersonRepository<'_> {
        SqlitePersonRepository::new(&self.conn)
    }

    /// Closes the store, releasing the connection.
    pub fn close(self) {
        if let Err((_conn, err)) = self.conn.close() {
            log::warn!("event=store_close module=store status=warn error={err}");
        }
    }
}
