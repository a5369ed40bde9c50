//! Reference snapshots and single-run outcomes.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// The recorded expectation of one document's reference directory.
///
/// A reference directory should hold exactly one of {checksum index,
/// crashed marker, failed marker}. When several are present the checksum
/// index wins; otherwise the markers are checked crashed first, then failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceState {
    /// No recorded expectation at all (or no reference directory).
    Absent,
    /// A checksum index exists; the run is compared artifact by artifact.
    Checksums,
    /// The renderer is expected to terminate abnormally.
    Crashed,
    /// The renderer is expected to exit with a non-zero status.
    Failed { status: i32 },
}

impl ReferenceState {
    /// Resolve marker presence into a single state using the fixed precedence.
    #[must_use]
    pub fn from_markers(has_index: bool, is_crashed: bool, failed_status: Option<i32>) -> Self {
        if has_index {
            Self::Checksums
        } else if is_crashed {
            Self::Crashed
        } else if let Some(status) = failed_status {
            Self::Failed { status }
        } else {
            Self::Absent
        }
    }

    /// Whether any expectation was recorded.
    #[must_use]
    pub fn has_results(self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// How one renderer invocation ended.
///
/// `Crashed` and `Failed` are mutually exclusive: `Crashed` means the
/// process did not exit normally at all, `Failed` means it exited normally
/// with a non-zero code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Exit code 0.
    Completed,
    /// Terminated abnormally (e.g. by a signal).
    Crashed,
    /// Exited normally with a non-zero code.
    Failed { status: i32 },
}

/// Result of executing the renderer once for a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// Comparable artifacts in the output directory, by basename.
    pub artifacts: BTreeMap<String, PathBuf>,
    /// Whether the renderer wrote anything to standard error.
    pub has_stderr: bool,
}

impl RunOutcome {
    /// Whether the run completed normally and therefore has artifacts to compare.
    #[must_use]
    pub fn completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Result of comparing a run against a checksum reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// No comparison took place (no checksum reference, or no artifacts).
    NotCompared,
    /// Every indexed artifact is present and hashes identically.
    Matched,
    /// At least one indexed artifact is missing or differs.
    Mismatched,
}
