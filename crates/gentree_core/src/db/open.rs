//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Apply connection pragmas, ensure schema and probe FTS5 availability.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have the schema fully ensured and versioned.

use super::migrations::{apply_migrations, ensure_schema};
use super::DbResult;
use log::{error, info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const FTS_SCHEMA_SQL: &str = "CREATE VIRTUAL TABLE IF NOT EXISTS persons_fts
    USING fts5(id, given_name, family_name, metadata, search_text);";

pub(crate) fn open_file(path: impl AsRef<Path>) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=file");

    let conn = match Connection::open(path) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=file duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    // WAL keeps concurrent readers responsive while a rebuild transaction
    // is in flight. Only meaningful for file-backed databases.
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("event=db_pragma module=db status=warn pragma=journal_mode error={err}");
    }
    if let Err(err) = conn.pragma_update(None, "synchronous", "NORMAL") {
        warn!("event=db_pragma module=db status=warn pragma=synchronous error={err}");
    }
    apply_optional_pragmas(&conn);

    info!(
        "event=db_open module=db status=ok mode=file duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(conn)
}

pub(crate) fn open_memory() -> DbResult<Connection> {
    info!("event=db_open module=db status=start mode=memory");
    let conn = Connection::open_in_memory()?;
    info!("event=db_open module=db status=ok mode=memory");
    Ok(conn)
}

/// Configures the connection, ensures the schema and probes FTS5.
///
/// Returns whether full-text search is available. A missing FTS5 module is
/// not an error: search is disabled for the process lifetime instead.
pub(crate) fn bootstrap_connection(conn: &Connection) -> DbResult<bool> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    ensure_schema(conn)?;
    apply_migrations(conn)?;

    let fts_enabled = match conn.execute_batch(FTS_SCHEMA_SQL) {
        Ok(()) => true,
        Err(err) => {
            warn!("event=fts_setup module=db status=warn search=disabled error={err}");
            false
        }
    };

    Ok(fts_enabled)
}

fn apply_optional_pragmas(conn: &Connection) {
    // Optional tuning pragmas may be missing on some SQLite builds.
    for (pragma, value) in [("temp_store", "MEMORY"), ("cache_size", "2000")] {
        if let Err(err) = conn.pragma_update(None, pragma, value) {
            warn!("event=db_pragma module=db status=warn pragma={pragma} error={err}");
        }
    }
}
