//! Domain model for the genealogical dataset.

pub mod document;
pub mod person;
