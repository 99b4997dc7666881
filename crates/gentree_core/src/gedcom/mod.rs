//! In-memory GEDCOM text codec.
//!
//! Round-trips the person graph to/from GEDCOM 5.5.1 text independently of
//! storage. Parsing and generation are both multi-pass because the flat,
//! singly-ordered format cannot always place a definition before its first
//! reference.

pub mod line;

mod generate;
mod parse;

pub use generate::generate_gedcom;
pub use parse::parse_gedcom;
