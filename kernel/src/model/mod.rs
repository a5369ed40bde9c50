//! Per-document data model.
//!
//! The filesystem layout (`md5`, `crashed`, `failed`, `stderr`) is only the
//! serialization format; in memory every state is a tagged variant.

pub mod document;
pub mod outcome;
pub mod verdict;
