//! Schema bootstrap and dataset schema-version stamping.
//!
//! # Responsibility
//! - Ensure all relational tables and indexes exist.
//! - Track the dataset schema version in `schema_meta`.
//!
//! # Invariants
//! - `ensure_schema` is idempotent (`IF NOT EXISTS` throughout).
//! - Version 0 means uninitialized and is stamped to the current version.
//! - A version newer than this binary is tolerated as a no-op so older
//!   binaries can still read a future dataset.

use crate::db::DbResult;
use log::info;
use rusqlite::{params, Connection, OptionalExtension};

/// Latest schema version written by this binary.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Creates all tables and secondary indexes if they do not exist yet.
pub fn ensure_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(include_str!("0001_init.sql"))?;
    Ok(())
}

/// Applies pending schema migrations and stamps the current version.
///
/// No migration steps exist beyond version stamping yet; this is the
/// extension point for future schema changes.
pub fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let current = current_version(conn)?;

    if current == 0 {
        set_version(conn, SCHEMA_VERSION)?;
        return Ok(());
    }

    if current == SCHEMA_VERSION {
        return Ok(());
    }

    if current > SCHEMA_VERSION {
        // Forward-compatible read: a newer dataset is left untouched.
        info!(
            "event=schema_migrate module=db status=skip db_version={current} binary_version={SCHEMA_VERSION}"
        );
        return Ok(());
    }

    set_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

/// Reads the stored schema version; 0 when absent or unparsable.
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM schema_meta WHERE key = ?1;",
            [SCHEMA_VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value
        .and_then(|text| text.trim().parse::<u32>().ok())
        .unwrap_or(0))
}

fn set_version(conn: &Connection, version: u32) -> DbResult<()> {
    conn.execute(
        "INSERT INTO schema_meta (key, value)
         VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        params![SCHEMA_VERSION_KEY, version.to_string()],
    )?;
    Ok(())
}
