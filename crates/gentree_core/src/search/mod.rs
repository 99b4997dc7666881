//! Full-text search over the projected person table.

pub mod fts;
