//! Person query surface over the relational projection.
//!
//! # Responsibility
//! - Provide read APIs over the derived tables: lookup by id/name and
//!   closure-backed ancestor/descendant traversal.
//!
//! # Invariants
//! - Results are deterministic: depth first, then id.
//! - Traversals exclude the reflexive depth-0 entry.

use crate::db::DbResult;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};

/// Projected person row as stored in the `persons` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRow {
    pub id: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub birth_date: Option<String>,
    pub metadata: Option<String>,
}

/// One traversal hit with its path distance from the queried person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relative {
    pub person: PersonRow,
    pub depth: i64,
}

/// Read-side repository interface over the projection.
pub trait PersonRepository {
    /// Gets one projected person by id.
    fn get_person(&self, id: &str) -> DbResult<Option<PersonRow>>;
    /// Finds persons by exact given and/or family name match.
    fn find_by_name(
        &self,
        given_name: Option<&str>,
        family_name: Option<&str>,
        limit: u32,
    ) -> DbResult<Vec<PersonRow>>;
    /// All ancestors of a person, nearest first.
    fn ancestors_of(&self, id: &str, max_depth: Option<i64>) -> DbResult<Vec<Relative>>;
    /// All descendants of a person, nearest first.
    fn descendants_of(&self, id: &str, max_depth: Option<i64>) -> DbResult<Vec<Relative>>;
    /// Total projected person count.
    fn count_persons(&self) -> DbResult<i64>;
}

/// SQLite-backed person queries.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn traverse(
        &self,
        join_column: &str,
        filter_column: &str,
        id: &str,
        max_depth: Option<i64>,
    ) -> DbResult<Vec<Relative>> {
        let mut sql = format!(
            "SELECT p.id, p.given_name, p.family_name, p.birth_date, p.metadata, c.depth
             FROM closure c
             JOIN persons p ON p.id = c.{join_column}
             WHERE c.{filter_column} = ? AND c.depth > 0"
        );
        let mut bind_values: Vec<SqlValue> = vec![SqlValue::Text(id.to_string())];
        if let Some(depth) = max_depth {
            sql.push_str(" AND c.depth <= ?");
            bind_values.push(SqlValue::Integer(depth));
        }
        sql.push_str(" ORDER BY c.depth ASC, p.id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut relatives = Vec::new();
        while let Some(row) = rows.next()? {
            relatives.push(Relative {
                person: person_from_row(row)?,
                depth: row.get(5)?,
            });
        }
        Ok(relatives)
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn get_person(&self, id: &str) -> DbResult<Option<PersonRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, given_name, family_name, birth_date, metadata
                 FROM persons WHERE id = ?1;",
                [id],
                |row| {
                    Ok(PersonRow {
                        id: row.get(0)?,
                        given_name: row.get(1)?,
                        family_name: row.get(2)?,
                        birth_date: row.get(3)?,
                        metadata: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn find_by_name(
        &self,
        given_name: Option<&str>,
        family_name: Option<&str>,
        limit: u32,
    ) -> DbResult<Vec<PersonRow>> {
        let mut sql = String::from(
            "SELECT id, given_name, family_name, birth_date, metadata FROM persons WHERE 1 = 1",
        );
        let mut bind_values: Vec<SqlValue> = Vec::new();
        if let Some(given) = given_name {
            sql.push_str(" AND given_name = ?");
            bind_values.push(SqlValue::Text(given.to_string()));
        }
        if let Some(family) = family_name {
            sql.push_str(" AND family_name = ?");
            bind_values.push(SqlValue::Text(family.to_string()));
        }
        sql.push_str(" ORDER BY family_name ASC, given_name ASC, id ASC LIMIT ?");
        bind_values.push(SqlValue::Integer(i64::from(limit)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut persons = Vec::new();
        while let Some(row) = rows.next()? {
            persons.push(person_from_row(row)?);
        }
        Ok(persons)
    }

    fn ancestors_of(&self, id: &str, max_depth: Option<i64>) -> DbResult<Vec<Relative>> {
        self.traverse("ancestor_id", "descendant_id", id, max_depth)
    }

    fn descendants_of(&self, id: &str, max_depth: Option<i64>) -> DbResult<Vec<Relative>> {
        self.traverse("descendant_id", "ancestor_id", id, max_depth)
    }

    fn count_persons(&self) -> DbResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM persons;", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn person_from_row(row: &Row<'_>) -> DbResult<PersonRow> {
    Ok(PersonRow {
        id: row.get(0)?,
        given_name: row.get(1)?,
        family_name: row.get(2)?,
        birth_date: row.get(3)?,
        metadata: row.get(4)?,
    })
}
