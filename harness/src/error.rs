//! Typed harness errors.
//!
//! Fatal errors abort the whole run; everything else is scoped to one
//! document and is recorded as that document's outcome.

use std::io;
use std::path::PathBuf;

/// Failure while testing documents or creating references.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// A reference checksum index could not be parsed. The reference set is
    /// untrustworthy, so the run stops.
    #[error("malformed checksum index {}: line {line}: {detail}", path.display())]
    MalformedReferenceIndex {
        path: PathBuf,
        line: usize,
        detail: String,
    },
    /// A filesystem operation on a marker, index, or artifact failed.
    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The renderer could not be started.
    #[error("failed to spawn renderer {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A visual diff could not be produced.
    #[error("diff for {}: {detail}", path.display())]
    Diff { path: PathBuf, detail: String },
    /// The corpus could not be enumerated.
    #[error("corpus {}: {detail}", path.display())]
    Corpus { path: PathBuf, detail: String },
    /// The skip list could not be read.
    #[error("skip list {}: {source}", path.display())]
    SkipList {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl HarnessError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Whether this error aborts the whole run rather than one document.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MalformedReferenceIndex { .. } | Self::Corpus { .. } | Self::SkipList { .. }
        )
    }
}
