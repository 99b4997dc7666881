//! Canonical JSON payload persistence.
//!
//! # Responsibility
//! - Read and write the single dataset row holding the opaque JSON
//!   document that is the editable source of truth.
//!
//! # Invariants
//! - A single row (`id = 'default'`) is the unit of truth; every save
//!   overwrites it wholesale.
//! - The read path never fails the caller on corrupt stored JSON; it logs
//!   and degrades to an empty document.

use crate::db::DbResult;
use crate::model::document::Document;
use log::error;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

const DATASET_ID: &str = "default";

/// Reads the canonical payload, degrading to an empty document when the
/// row is absent or holds unparsable JSON.
pub fn get_payload(conn: &Connection) -> DbResult<Value> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT payload FROM dataset WHERE id = ?1;",
            [DATASET_ID],
            |row| row.get(0),
        )
        .optional()?;

    let Some(text) = stored else {
        return Ok(Document::default().to_value());
    };

    match serde_json::from_str(&text) {
        Ok(value) => Ok(value),
        Err(err) => {
            error!("event=payload_read module=dataset status=error error={err}");
            Ok(Document::default().to_value())
        }
    }
}

/// Upserts the payload text for the dataset row.
///
/// The raw payload is stored verbatim; normalization is the projection's
/// concern so legacy shapes keep round-tripping unchanged.
pub fn save_payload(conn: &Connection, payload_text: &str) -> DbResult<()> {
    conn.execute(
        "INSERT INTO dataset (id, payload, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(id) DO UPDATE SET
            payload = excluded.payload,
            updated_at = excluded.updated_at;",
        params![DATASET_ID, payload_text],
    )?;
    Ok(())
}

/// Timestamp of the last save, or `None` before the first one.
pub fn last_updated_at(conn: &Connection) -> DbResult<Option<String>> {
    let value = conn
        .query_row(
            "SELECT updated_at FROM dataset WHERE id = ?1;",
            [DATASET_ID],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

/// Whether a dataset row exists yet (first-boot seed decision).
pub fn dataset_exists(conn: &Connection) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM dataset WHERE id = ?1);",
        [DATASET_ID],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
