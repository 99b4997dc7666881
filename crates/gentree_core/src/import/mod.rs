//! Bulk import pipeline: batched write buffer and streaming GEDCOM
//! ingestion.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod buffer;
mod stream;

pub use buffer::{ImportBuffer, ImportOptions, ImportOutcome};
pub use stream::{ingest_gedcom, IngestSummary};

pub type ImportResult<T> = Result<T, ImportError>;

/// Import-layer error covering storage and line-source failures.
#[derive(Debug)]
pub enum ImportError {
    Db(DbError),
    Io(std::io::Error),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "unable to read import source: {err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<DbError> for ImportError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ImportError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<std::io::Error> for ImportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
