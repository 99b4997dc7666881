//! Relational projection of the canonical JSON document.
//!
//! # Responsibility
//! - Rebuild persons/relationships/closure/persons_fts from an arbitrary,
//!   possibly-inconsistent payload, inside the caller's transaction.
//! - Provide the chunked bulk-write helpers shared with the import buffer.
//!
//! # Invariants
//! - The rebuild replaces all derived tables in full; there is no partial
//!   update path.
//! - Rebuilding the same payload twice yields identical relational state.
//! - No relationship row may reference a person id absent from the person
//!   set; dangling pairs, self-loops and duplicates are dropped silently.

use crate::db::DbResult;
use crate::model::document::Document;
use crate::model::person::Person;
use crate::repo::closure::rebuild_closure;
use log::{info, warn};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Transaction};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Instant;

/// Default rows per bulk-insert statement.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Secondary person-name indexes dropped during bulk loads and rebuilt
/// afterwards to reduce write amplification.
const SECONDARY_INDEXES: &[(&str, &str)] = &[
    ("idx_persons_given_name", "persons(given_name)"),
    ("idx_persons_family_name", "persons(family_name)"),
    ("idx_persons_name", "persons(family_name, given_name)"),
    ("idx_persons_created_at", "persons(created_at)"),
    ("idx_persons_updated_at", "persons(updated_at)"),
];

/// Tuning knobs for one rebuild run.
#[derive(Debug, Clone)]
pub struct RebuildOptions {
    /// Drop secondary lookup indexes before the bulk load and recreate
    /// them afterwards. Trades mid-rebuild query speed for throughput;
    /// readers never see a half-rebuilt table either way.
    pub drop_indexes: bool,
    /// Rows per bulk-insert statement. Final table contents do not depend
    /// on this value, only the number of round trips does.
    pub chunk_size: usize,
}

impl Default for RebuildOptions {
    fn default() -> Self {
        Self {
            drop_indexes: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Counters describing what one rebuild wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildOutcome {
    pub persons: usize,
    pub relationships: usize,
    pub closure_entries: usize,
    /// False when the search-index rebuild failed; the caller disables
    /// search process-wide without failing the rebuild.
    pub fts_ok: bool,
}

/// Rebuilds all derived tables from the payload.
///
/// Runs inside the caller's transaction so the relational view and the
/// canonical JSON are never observably inconsistent.
pub fn rebuild(
    tx: &Transaction<'_>,
    payload: &Value,
    fts_enabled: bool,
    options: &RebuildOptions,
) -> DbResult<RebuildOutcome> {
    let started_at = Instant::now();
    let document = Document::normalize(payload);
    let persons = document.persons();

    let dropped_indexes = options.drop_indexes && drop_secondary_indexes(tx)?;
    truncate_projection(tx, fts_enabled)?;

    let chunk_size = options.chunk_size.max(1);
    let mut known_ids: HashSet<String> = HashSet::with_capacity(persons.len());
    let mut pending_pairs: Vec<(String, String)> = Vec::new();
    for person in &persons {
        known_ids.insert(person.id.clone());
        pending_pairs.extend(person.relationship_pairs());
    }

    for chunk in persons.chunks(chunk_size) {
        insert_person_chunk(tx, chunk)?;
    }

    let pairs = filter_relationship_pairs(pending_pairs, &known_ids);
    for chunk in pairs.chunks(chunk_size) {
        insert_relationship_chunk(tx, chunk)?;
    }

    let closure_entries = rebuild_closure(tx, chunk_size)?;

    let fts_ok = if fts_enabled {
        rebuild_search_rows(tx, chunk_size).map(|_| true).unwrap_or_else(|err| {
            warn!("event=fts_rebuild module=projection status=warn search=disabled error={err}");
            false
        })
    } else {
        false
    };

    if dropped_indexes {
        restore_secondary_indexes(tx)?;
    }

    let outcome = RebuildOutcome {
        persons: persons.len(),
        relationships: pairs.len(),
        closure_entries,
        fts_ok,
    };
    info!(
        "event=projection_rebuild module=projection status=ok persons={} relationships={} closure={} duration_ms={}",
        outcome.persons,
        outcome.relationships,
        outcome.closure_entries,
        started_at.elapsed().as_millis()
    );
    Ok(outcome)
}

/// Clears all derived tables. The dataset payload row is untouched.
pub(crate) fn truncate_projection(tx: &Transaction<'_>, fts_enabled: bool) -> DbResult<()> {
    tx.execute("DELETE FROM persons;", [])?;
    tx.execute("DELETE FROM relationships;", [])?;
    tx.execute("DELETE FROM closure;", [])?;
    if fts_enabled {
        tx.execute("DELETE FROM persons_fts;", [])?;
    }
    Ok(())
}

/// Drops the secondary name indexes; returns whether the drop took effect.
pub(crate) fn drop_secondary_indexes(tx: &Transaction<'_>) -> DbResult<bool> {
    for (name, _) in SECONDARY_INDEXES {
        if let Err(err) = tx.execute_batch(&format!("DROP INDEX IF EXISTS {name};")) {
            warn!("event=index_drop module=projection status=warn index={name} error={err}");
            return Ok(false);
        }
    }
    Ok(true)
}

pub(crate) fn restore_secondary_indexes(tx: &Transaction<'_>) -> DbResult<()> {
    for (name, definition) in SECONDARY_INDEXES {
        tx.execute_batch(&format!("CREATE INDEX IF NOT EXISTS {name} ON {definition};"))?;
    }
    Ok(())
}

/// Bulk-upserts one chunk of persons.
///
/// Conflicting ids overwrite every field except the stable `created_at`.
pub(crate) fn insert_person_chunk(tx: &Transaction<'_>, chunk: &[Person]) -> DbResult<()> {
    if chunk.is_empty() {
        return Ok(());
    }

    let mut sql = String::from(
        "INSERT INTO persons (id, given_name, family_name, birth_date, metadata, created_at, updated_at) VALUES ",
    );
    let mut bind_values: Vec<SqlValue> = Vec::with_capacity(chunk.len() * 5);
    for (index, person) in chunk.iter().enumerate() {
        if index > 0 {
            sql.push_str(", ");
        }
        sql.push_str("(?, ?, ?, ?, ?, datetime('now'), datetime('now'))");
        bind_values.push(SqlValue::Text(person.id.clone()));
        bind_values.push(optional_text(person.given_name()));
        bind_values.push(optional_text(person.family_name()));
        bind_values.push(optional_text(person.birth_date()));
        bind_values.push(SqlValue::Text(serde_json::to_string(
            &person.metadata_json(),
        )?));
    }
    sql.push_str(
        " ON CONFLICT(id) DO UPDATE SET
            given_name = excluded.given_name,
            family_name = excluded.family_name,
            birth_date = excluded.birth_date,
            metadata = excluded.metadata,
            updated_at = excluded.updated_at;",
    );

    tx.execute(&sql, params_from_iter(bind_values))?;
    Ok(())
}

/// Keeps pairs whose endpoints both exist, dropping self-loops and
/// duplicates while preserving first-seen order.
pub(crate) fn filter_relationship_pairs(
    pairs: Vec<(String, String)>,
    known_ids: &HashSet<String>,
) -> Vec<(String, String)> {
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(pairs.len());
    let mut kept = Vec::with_capacity(pairs.len());
    for (parent, child) in pairs {
        if parent == child || !known_ids.contains(&parent) || !known_ids.contains(&child) {
            continue;
        }
        if seen.insert((parent.clone(), child.clone())) {
            kept.push((parent, child));
        }
    }
    kept
}

pub(crate) fn insert_relationship_chunk(
    tx: &Transaction<'_>,
    chunk: &[(String, String)],
) -> DbResult<()> {
    if chunk.is_empty() {
        return Ok(());
    }

    let mut sql =
        String::from("INSERT OR IGNORE INTO relationships (parent_id, child_id) VALUES ");
    let mut bind_values: Vec<SqlValue> = Vec::with_capacity(chunk.len() * 2);
    for (index, (parent, child)) in chunk.iter().enumerate() {
        if index > 0 {
            sql.push_str(", ");
        }
        sql.push_str("(?, ?)");
        bind_values.push(SqlValue::Text(parent.clone()));
        bind_values.push(SqlValue::Text(child.clone()));
    }

    tx.execute(&sql, params_from_iter(bind_values))?;
    Ok(())
}

/// Re-derives `persons_fts` from the persons table in chunks.
///
/// Returns the number of indexed rows. Used by the rebuild pipeline and by
/// the explicit search-reindex operation.
pub(crate) fn rebuild_search_rows(tx: &Transaction<'_>, chunk_size: usize) -> DbResult<usize> {
    tx.execute("DELETE FROM persons_fts;", [])?;

    let mut rows_data: Vec<(String, Option<String>, Option<String>, Option<String>)> = Vec::new();
    {
        let mut stmt = tx.prepare(
            "SELECT id, given_name, family_name, metadata FROM persons ORDER BY rowid;",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            rows_data.push((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?));
        }
    }

    for chunk in rows_data.chunks(chunk_size.max(1)) {
        let mut sql = String::from(
            "INSERT INTO persons_fts (id, given_name, family_name, metadata, search_text) VALUES ",
        );
        let mut bind_values: Vec<SqlValue> = Vec::with_capacity(chunk.len() * 5);
        for (index, (id, given, family, metadata)) in chunk.iter().enumerate() {
            if index > 0 {
                sql.push_str(", ");
            }
            sql.push_str("(?, ?, ?, ?, ?)");
            let search_text = build_search_text(id, given.as_deref(), family.as_deref(), metadata.as_deref());
            bind_values.push(SqlValue::Text(id.clone()));
            bind_values.push(optional_text(given.as_deref()));
            bind_values.push(optional_text(family.as_deref()));
            bind_values.push(optional_text(metadata.as_deref()));
            bind_values.push(SqlValue::Text(search_text));
        }
        tx.execute(&sql, params_from_iter(bind_values))?;
    }

    Ok(rows_data.len())
}

/// Concatenates id, name fields and serialized metadata into the single
/// tokenizable string indexed by FTS.
pub(crate) fn build_search_text(
    id: &str,
    given_name: Option<&str>,
    family_name: Option<&str>,
    metadata: Option<&str>,
) -> String {
    let mut text = String::from(id);
    for field in [given_name, family_name, metadata].into_iter().flatten() {
        if !field.is_empty() {
            text.push(' ');
            text.push_str(field);
        }
    }
    text
}

fn optional_text(value: Option<&str>) -> SqlValue {
    match value {
        Some(text) => SqlValue::Text(text.to_string()),
        None => SqlValue::Null,
    }
}
