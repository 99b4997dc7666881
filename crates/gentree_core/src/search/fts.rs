//! SQLite FTS5-based person search.
//!
//! # Responsibility
//! - Provide keyword search over the denormalized person search entries.
//! - Return typed hits with stable person ids.
//!
//! # Invariants
//! - Search is entirely optional: when the store has search disabled the
//!   query surface reports it instead of failing storage operations.
//! - Result ordering is deterministic by rank, then id.

use crate::db::DbError;
use crate::store::Store;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for disabled search, query parsing and DB failures.
#[derive(Debug)]
pub enum SearchError {
    /// Full-text search is unavailable for this process.
    Disabled,
    /// User-provided query cannot be parsed by FTS5 syntax.
    InvalidQuery { query: String, message: String },
    Db(DbError),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "full-text search is disabled for this process"),
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Search options.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// User query text; terms are AND-combined.
    pub text: String,
    /// Maximum number of hits to return.
    pub limit: u32,
    /// Pass text directly as a raw FTS5 expression instead of escaping it.
    pub raw_fts_syntax: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: 20,
            raw_fts_syntax: false,
        }
    }
}

/// Single search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub id: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub snippet: String,
}

/// Searches projected persons via FTS5 and returns ranked results.
///
/// Returns an empty list for blank queries.
///
/// # Errors
/// - [`SearchError::Disabled`] when the store runs without search.
/// - [`SearchError::InvalidQuery`] for unparsable raw FTS5 syntax.
pub fn search_persons(store: &Store, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
    if !store.search_enabled() {
        return Err(SearchError::Disabled);
    }

    let Some(match_expr) = build_match_expression(query) else {
        return Ok(Vec::new());
    };
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let sql = "SELECT
            id,
            given_name,
            family_name,
            snippet(persons_fts, 4, '[', ']', ' ... ', 10) AS snippet
         FROM persons_fts
         WHERE persons_fts MATCH ?
         ORDER BY bm25(persons_fts), id ASC
         LIMIT ?";
    let bind_values = vec![
        SqlValue::Text(match_expr.clone()),
        SqlValue::Integer(i64::from(query.limit)),
    ];

    let mut stmt = store.connection().prepare(sql)?;
    let mut rows = stmt
        .query(params_from_iter(bind_values))
        .map_err(|err| map_query_error(err, &match_expr))?;

    let mut hits = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|err| map_query_error(err, &match_expr))?
    {
        hits.push(parse_hit(row)?);
    }
    Ok(hits)
}

fn parse_hit(row: &Row<'_>) -> SearchResult<SearchHit> {
    Ok(SearchHit {
        id: row.get("id")?,
        given_name: row.get("given_name")?,
        family_name: row.get("family_name")?,
        snippet: row.get("snippet")?,
    })
}

fn build_match_expression(query: &SearchQuery) -> Option<String> {
    let text = query.text.trim();
    if text.is_empty() {
        return None;
    }
    if query.raw_fts_syntax {
        return Some(text.to_string());
    }

    let terms = text
        .split_whitespace()
        .map(escape_fts_term)
        .collect::<Vec<_>>();
    if terms.is_empty() {
        return None;
    }
    Some(terms.join(" AND "))
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }
    SearchError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    }
}
