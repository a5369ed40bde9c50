//! Checksum index codec: the `md5` file of a reference or output directory.
//!
//! # Format
//!
//! ```text
//! <hex-hash> <absolute-path-of-artifact>\n
//! <hex-hash> <absolute-path-of-artifact>\n
//! ```
//!
//! The path is split at the first space only, so paths may contain spaces.
//! The artifact's basename (last path component) is the comparison key;
//! the full path is kept for diagnostics and as the diff/update target.
//! Line order carries no meaning, but [`ChecksumIndex::to_text`] preserves
//! insertion order so rewrites are stable.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::checksum::hash::ContentHash;

/// Basename of the checksum index file.
pub const CHECKSUM_INDEX_FILENAME: &str = "md5";
/// Basename of the empty sentinel written when the renderer crashed.
pub const CRASHED_MARKER: &str = "crashed";
/// Basename of the marker holding the renderer's decimal exit status.
pub const FAILED_MARKER: &str = "failed";
/// Basename of the captured standard-error bytes.
pub const STDERR_MARKER: &str = "stderr";

/// Status markers, in the order they are copied during re-baselining.
pub const STATUS_MARKERS: [&str; 3] = [CRASHED_MARKER, FAILED_MARKER, STDERR_MARKER];

/// Basenames that are never comparable rendered artifacts.
pub const RESERVED_BASENAMES: [&str; 4] = [
    CHECKSUM_INDEX_FILENAME,
    CRASHED_MARKER,
    FAILED_MARKER,
    STDERR_MARKER,
];

/// Suffix appended to a fresh artifact's name for its visual diff.
pub const DIFF_SUFFIX: &str = ".diff.png";

/// Prefix of in-flight temp files produced by atomic writes.
pub const TEMP_PREFIX: &str = ".tmp_";

/// Whether `name` is one of the reserved layout basenames.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED_BASENAMES.contains(&name)
}

/// Whether a directory entry named `name` is a rendered artifact that
/// belongs in a checksum index.
#[must_use]
pub fn is_comparable_artifact(name: &str) -> bool {
    !is_reserved(name) && !name.starts_with(TEMP_PREFIX) && !name.ends_with(DIFF_SUFFIX)
}

/// One line of a checksum index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    /// Artifact basename; unique within one index.
    pub basename: String,
    /// Content hash recorded for the artifact.
    pub hash: ContentHash,
    /// Absolute path the artifact had when the index was written.
    pub path: PathBuf,
}

impl ChecksumEntry {
    /// Build an entry from an artifact path, deriving the basename.
    ///
    /// Returns `None` if the path has no UTF-8 final component.
    #[must_use]
    pub fn new(hash: ContentHash, path: PathBuf) -> Option<Self> {
        let basename = path.file_name()?.to_str()?.to_string();
        Some(Self {
            basename,
            hash,
            path,
        })
    }
}

/// A malformed checksum index line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexParseError {
    /// No space separates the hash from the path.
    #[error("line {line}: missing separator between hash and path")]
    MissingSeparator { line: usize },
    /// The hash field is empty or not hex.
    #[error("line {line}: invalid hash {hash:?}")]
    InvalidHash { line: usize, hash: String },
    /// The path field has no usable basename.
    #[error("line {line}: path {path:?} has no basename")]
    MissingBasename { line: usize, path: String },
    /// The same basename appears twice.
    #[error("line {line}: duplicate entry for {basename:?}")]
    DuplicateBasename { line: usize, basename: String },
}

impl IndexParseError {
    /// 1-based line number of the offending line.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::MissingSeparator { line }
            | Self::InvalidHash { line, .. }
            | Self::MissingBasename { line, .. }
            | Self::DuplicateBasename { line, .. } => *line,
        }
    }
}

/// Ordered basename → hash mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumIndex {
    entries: Vec<ChecksumEntry>,
    positions: BTreeMap<String, usize>,
}

impl ChecksumIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse index text.
    ///
    /// Blank lines are ignored. Entries whose basename is reserved are
    /// dropped: they can never be compared.
    ///
    /// # Errors
    ///
    /// Returns [`IndexParseError`] for the first malformed line.
    pub fn parse(text: &str) -> Result<Self, IndexParseError> {
        let mut index = Self::new();
        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            if raw.trim().is_empty() {
                continue;
            }
            let (hash_str, path_str) = raw
                .split_once(' ')
                .ok_or(IndexParseError::MissingSeparator { line })?;
            let hash = ContentHash::parse(hash_str).ok_or_else(|| IndexParseError::InvalidHash {
                line,
                hash: hash_str.to_string(),
            })?;
            let entry = ChecksumEntry::new(hash, PathBuf::from(path_str)).ok_or_else(|| {
                IndexParseError::MissingBasename {
                    line,
                    path: path_str.to_string(),
                }
            })?;
            if is_reserved(&entry.basename) {
                continue;
            }
            if index.positions.contains_key(&entry.basename) {
                return Err(IndexParseError::DuplicateBasename {
                    line,
                    basename: entry.basename,
                });
            }
            index.push(entry);
        }
        Ok(index)
    }

    /// Append an entry, replacing any earlier entry with the same basename.
    pub fn push(&mut self, entry: ChecksumEntry) {
        if let Some(&pos) = self.positions.get(&entry.basename) {
            self.entries[pos] = entry;
            return;
        }
        self.positions
            .insert(entry.basename.clone(), self.entries.len());
        self.entries.push(entry);
    }

    /// Look up the entry for a basename.
    #[must_use]
    pub fn get(&self, basename: &str) -> Option<&ChecksumEntry> {
        self.positions.get(basename).map(|&pos| &self.entries[pos])
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[ChecksumEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Basename → hash view, independent of line order.
    #[must_use]
    pub fn hashes(&self) -> BTreeMap<&str, &ContentHash> {
        self.entries
            .iter()
            .map(|e| (e.basename.as_str(), &e.hash))
            .collect()
    }

    /// Serialize as index text, one `"<hash> <path>"` line per entry.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(entry.hash.as_str());
            out.push(' ');
            out.push_str(&entry.path.to_string_lossy());
            out.push('\n');
        }
        out
    }
}

impl FromIterator<ChecksumEntry> for ChecksumIndex {
    fn from_iter<I: IntoIterator<Item = ChecksumEntry>>(iter: I) -> Self {
        let mut index = Self::new();
        for entry in iter {
            index.push(entry);
        }
        index
    }
}
