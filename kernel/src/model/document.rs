//! Corpus documents.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// One test case, identified by its path relative to the corpus root.
///
/// Immutable once enumerated. The same relative path names the document's
/// reference directory under the references root and its output directory
/// under the output root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Document {
    relative: PathBuf,
}

impl Document {
    #[must_use]
    pub fn new(relative: impl Into<PathBuf>) -> Self {
        Self {
            relative: relative.into(),
        }
    }

    /// Path relative to the corpus root.
    #[must_use]
    pub fn relative_path(&self) -> &Path {
        &self.relative
    }

    /// The input file under `corpus_root`.
    #[must_use]
    pub fn source_in(&self, corpus_root: &Path) -> PathBuf {
        corpus_root.join(&self.relative)
    }

    /// This document's directory under a references or output root.
    #[must_use]
    pub fn dir_in(&self, root: &Path) -> PathBuf {
        root.join(&self.relative)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.relative.display())
    }
}

/// 1-based enumeration position of a document, for progress output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub n_doc: usize,
    pub total_docs: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.n_doc, self.total_docs)
    }
}
