//! Use-case services over the storage context.

pub mod tree_service;
