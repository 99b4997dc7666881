//! Persistence layer: payload storage, relational projection, closure and
//! read-side person queries.

pub mod closure;
pub mod dataset_repo;
pub mod person_repo;
pub mod projection;
