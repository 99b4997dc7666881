//! Batched write surface decoupling a streaming source from the bulk
//! insert pipeline.
//!
//! # Responsibility
//! - Accept persons and relationship pairs incrementally, flushing persons
//!   in fixed-size chunks.
//! - Defer all relationship writes until `commit`, after every person is
//!   flushed, so foreign-key ordering never fails an import.
//!
//! # Invariants
//! - One transaction spans the buffer lifetime; dropping an uncommitted
//!   buffer rolls the import back, leaving prior state intact.
//! - `commit` runs the same closure + search-index pipeline as a direct
//!   payload save.

use crate::db::DbResult;
use crate::model::person::Person;
use crate::repo::closure::rebuild_closure;
use crate::repo::projection::{self, DEFAULT_CHUNK_SIZE};
use log::{info, warn};
use rusqlite::{Connection, Transaction};
use std::collections::{BTreeSet, HashSet};

/// Tuning knobs for one import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Drop secondary indexes for the duration of the bulk load.
    pub drop_indexes: bool,
    /// Rows per bulk-insert statement.
    pub chunk_size: usize,
    /// Relax `synchronous` durability while the import runs. Applied to
    /// the connection before the transaction opens and restored to its
    /// prior level when the buffer ends, committed or not.
    pub fast_import: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            drop_indexes: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            fast_import: false,
        }
    }
}

/// Counters describing a committed import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    pub persons: usize,
    pub relationships: usize,
    pub closure_entries: usize,
}

/// Puts the connection's `synchronous` level back once the import ends,
/// whether the transaction committed or rolled back.
struct SynchronousReset<'s> {
    conn: &'s Connection,
    prior: Option<i64>,
}

impl SynchronousReset<'_> {
    fn restore(&mut self) -> DbResult<()> {
        if let Some(prior) = self.prior.take() {
            self.conn.pragma_update(None, "synchronous", prior)?;
        }
        Ok(())
    }
}

impl Drop for SynchronousReset<'_> {
    fn drop(&mut self) {
        if let Some(prior) = self.prior.take() {
            if let Err(err) = self.conn.pragma_update(None, "synchronous", prior) {
                warn!(
                    "event=pragma_restore module=import status=warn pragma=synchronous error={err}"
                );
            }
        }
    }
}

/// Batched import surface: `add_person`, `add_relationship`, `commit`.
pub struct ImportBuffer<'s> {
    // Declared before the reset so an abandoned buffer rolls the
    // transaction back before the pragma is restored.
    tx: Transaction<'s>,
    synchronous_reset: SynchronousReset<'s>,
    fts_enabled: &'s mut bool,
    chunk_size: usize,
    dropped_indexes: bool,
    pending: Vec<Person>,
    known_ids: HashSet<String>,
    // BTreeSet keeps relationship flushing deterministic besides deduping.
    pairs: BTreeSet<(String, String)>,
    persons_written: usize,
}

impl<'s> ImportBuffer<'s> {
    pub(crate) fn begin(
        conn: &'s mut Connection,
        fts_enabled: &'s mut bool,
        options: ImportOptions,
    ) -> DbResult<Self> {
        let prior_synchronous = if options.fast_import {
            let prior: i64 = conn.pragma_query_value(None, "synchronous", |row| row.get(0))?;
            conn.pragma_update(None, "synchronous", "OFF")?;
            Some(prior)
        } else {
            None
        };

        let conn: &'s Connection = conn;
        let synchronous_reset = SynchronousReset {
            conn,
            prior: prior_synchronous,
        };
        let tx = conn.unchecked_transaction()?;
        let dropped_indexes = options.drop_indexes && projection::drop_secondary_indexes(&tx)?;
        projection::truncate_projection(&tx, *fts_enabled)?;

        Ok(Self {
            tx,
            synchronous_reset,
            fts_enabled,
            chunk_size: options.chunk_size.max(1),
            dropped_indexes,
            pending: Vec::new(),
            known_ids: HashSet::new(),
            pairs: BTreeSet::new(),
            persons_written: 0,
        })
    }

    /// Queues one person, flushing a chunk when full.
    ///
    /// Persons with a blank id are dropped silently, matching the bulk
    /// projection.
    pub fn add_person(&mut self, mut person: Person) -> DbResult<()> {
        let id = person.id.trim().to_string();
        if id.is_empty() {
            return Ok(());
        }
        person.id = id;
        self.known_ids.insert(person.id.clone());
        self.pending.push(person);
        if self.pending.len() >= self.chunk_size {
            self.flush_pending()?;
        }
        Ok(())
    }

    /// Queues one parent→child pair for the post-person flush. Returns
    /// whether the pair was newly queued.
    ///
    /// Pairs may reference persons not yet added; endpoint filtering
    /// happens at commit once the full person set is known.
    pub fn add_relationship(&mut self, parent_id: &str, child_id: &str) -> bool {
        let parent = parent_id.trim();
        let child = child_id.trim();
        if parent.is_empty() || child.is_empty() {
            return false;
        }
        self.pairs.insert((parent.to_string(), child.to_string()))
    }

    /// Drains the buffer: remaining persons, endpoint-filtered
    /// relationships, closure and search index, then commits.
    pub fn commit(mut self) -> DbResult<ImportOutcome> {
        self.flush_pending()?;

        let pairs: Vec<(String, String)> = std::mem::take(&mut self.pairs).into_iter().collect();
        let kept = projection::filter_relationship_pairs(pairs, &self.known_ids);
        for chunk in kept.chunks(self.chunk_size) {
            projection::insert_relationship_chunk(&self.tx, chunk)?;
        }

        let closure_entries = rebuild_closure(&self.tx, self.chunk_size)?;

        if *self.fts_enabled {
            if let Err(err) = projection::rebuild_search_rows(&self.tx, self.chunk_size) {
                warn!("event=fts_rebuild module=import status=warn search=disabled error={err}");
                *self.fts_enabled = false;
            }
        }

        if self.dropped_indexes {
            projection::restore_secondary_indexes(&self.tx)?;
        }

        let outcome = ImportOutcome {
            persons: self.persons_written,
            relationships: kept.len(),
            closure_entries,
        };

        let Self {
            tx,
            mut synchronous_reset,
            ..
        } = self;
        tx.commit()?;
        synchronous_reset.restore()?;

        info!(
            "event=import_commit module=import status=ok persons={} relationships={} closure={}",
            outcome.persons, outcome.relationships, outcome.closure_entries
        );
        Ok(outcome)
    }

    fn flush_pending(&mut self) -> DbResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        projection::insert_person_chunk(&self.tx, &self.pending)?;
        self.persons_written += self.pending.len();
        self.pending.clear();
        Ok(())
    }
}
