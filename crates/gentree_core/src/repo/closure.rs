//! Transitive ancestor/descendant closure builder.
//!
//! # Responsibility
//! - Recompute the full `(ancestor, descendant, depth)` relation from the
//!   direct parent→child edge list. Always a full recomputation, never
//!   incremental.
//!
//! # Invariants
//! - Every person gets a reflexive entry of depth 0.
//! - For each reachable pair exactly one entry exists, carrying the
//!   shortest directed path length (BFS visits shallowest first).
//! - Terminates on cyclic input: each BFS tracks visited nodes per source,
//!   so revisits are never expanded. Depths stay shortest-path even when a
//!   cycle exists; cycles are not rejected.

use crate::db::DbResult;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Transaction};
use std::collections::{HashMap, HashSet, VecDeque};

/// One reachability fact in the closure table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClosureEntry {
    pub ancestor_id: String,
    pub descendant_id: String,
    pub depth: i64,
}

/// Computes the reflexive transitive closure of the edge set.
///
/// `person_ids` drives the reflexive entries; `edges` are direct
/// parent→child pairs. Edge endpoints absent from `person_ids` still
/// expand (the projection filters dangling edges before calling this).
pub fn build_closure(person_ids: &[String], edges: &[(String, String)]) -> Vec<ClosureEntry> {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for (parent, child) in edges {
        children
            .entry(parent.as_str())
            .or_default()
            .push(child.as_str());
    }

    let mut entries = Vec::with_capacity(person_ids.len() + edges.len());
    for person in person_ids {
        entries.push(ClosureEntry {
            ancestor_id: person.clone(),
            descendant_id: person.clone(),
            depth: 0,
        });

        let mut visited: HashSet<&str> = HashSet::from([person.as_str()]);
        let mut frontier: VecDeque<(&str, i64)> = VecDeque::from([(person.as_str(), 0)]);
        while let Some((node, depth)) = frontier.pop_front() {
            let Some(next) = children.get(node) else {
                continue;
            };
            for descendant in next {
                if !visited.insert(descendant) {
                    continue;
                }
                entries.push(ClosureEntry {
                    ancestor_id: person.clone(),
                    descendant_id: (*descendant).to_string(),
                    depth: depth + 1,
                });
                frontier.push_back((descendant, depth + 1));
            }
        }
    }

    entries
}

/// Recomputes the closure table from the persons/relationships tables.
///
/// Runs inside the caller's transaction; the table is assumed truncated.
/// Returns the number of entries written.
pub fn rebuild_closure(tx: &Transaction<'_>, chunk_size: usize) -> DbResult<usize> {
    let mut person_ids = Vec::new();
    {
        let mut stmt = tx.prepare("SELECT id FROM persons ORDER BY rowid;")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            person_ids.push(row.get::<_, String>(0)?);
        }
    }

    let mut edges = Vec::new();
    {
        let mut stmt = tx.prepare("SELECT parent_id, child_id FROM relationships ORDER BY rowid;")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            edges.push((row.get::<_, String>(0)?, row.get::<_, String>(1)?));
        }
    }

    let entries = build_closure(&person_ids, &edges);
    for chunk in entries.chunks(chunk_size.max(1)) {
        insert_closure_chunk(tx, chunk)?;
    }
    Ok(entries.len())
}

fn insert_closure_chunk(tx: &Transaction<'_>, chunk: &[ClosureEntry]) -> DbResult<()> {
    let mut sql =
        String::from("INSERT OR IGNORE INTO closure (ancestor_id, descendant_id, depth) VALUES ");
    let mut bind_values: Vec<SqlValue> = Vec::with_capacity(chunk.len() * 3);
    for (index, entry) in chunk.iter().enumerate() {
        if index > 0 {
            sql.push_str(", ");
        }
        sql.push_str("(?, ?, ?)");
        bind_values.push(SqlValue::Text(entry.ancestor_id.clone()));
        bind_values.push(SqlValue::Text(entry.descendant_id.clone()));
        bind_values.push(SqlValue::Integer(entry.depth));
    }

    tx.execute(&sql, params_from_iter(bind_values))?;
    Ok(())
}
