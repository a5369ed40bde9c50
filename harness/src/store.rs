//! Checksum store: read/write the checksum index and status markers of one
//! reference or output directory.
//!
//! # Directory layout
//!
//! ```text
//! <dir>/
//!   md5          checksum index, one "<hash> <absolute-path>" line per artifact
//!   crashed      empty sentinel: the renderer terminated abnormally
//!   failed       ASCII decimal exit status of a non-zero exit
//!   stderr       raw bytes the renderer wrote to standard error
//!   page-1.png   rendered artifacts (any other basename)
//! ```
//!
//! Reference and output directories use the same layout. Presence is the
//! only state a marker carries; `failed` additionally carries its code.
//!
//! # Atomicity
//!
//! Index rewrites go through [`write_atomic`] (temp file + rename) so an
//! interrupted update never leaves a truncated index behind.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use regtest_kernel::checksum::hash::{hash_reader, ContentHash};
use regtest_kernel::checksum::index::{
    is_comparable_artifact, ChecksumEntry, ChecksumIndex, CHECKSUM_INDEX_FILENAME,
    CRASHED_MARKER, FAILED_MARKER, STATUS_MARKERS, STDERR_MARKER, TEMP_PREFIX,
};
use regtest_kernel::model::outcome::ReferenceState;

use crate::error::HarnessError;

/// The recorded expectation of a reference directory plus, for checksum
/// references, the parsed index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSnapshot {
    pub state: ReferenceState,
    pub index: Option<ChecksumIndex>,
}

/// Read the checksum index of `dir`.
///
/// Returns `Ok(None)` if the index file does not exist.
///
/// # Errors
///
/// [`HarnessError::MalformedReferenceIndex`] if a line does not parse;
/// [`HarnessError::Io`] for any other read failure.
pub fn read_index(dir: &Path) -> Result<Option<ChecksumIndex>, HarnessError> {
    let path = dir.join(CHECKSUM_INDEX_FILENAME);
    let text = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(HarnessError::io("read", path, e)),
    };
    let text = String::from_utf8(text).map_err(|e| HarnessError::MalformedReferenceIndex {
        path: path.clone(),
        line: 0,
        detail: format!("not UTF-8: {e}"),
    })?;
    ChecksumIndex::parse(&text)
        .map(Some)
        .map_err(|e| HarnessError::MalformedReferenceIndex {
            path,
            line: e.line(),
            detail: e.to_string(),
        })
}

/// Write `index` as the checksum index of `dir`, atomically.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] if the temp file cannot be written or renamed.
pub fn write_index(dir: &Path, index: &ChecksumIndex) -> Result<(), HarnessError> {
    write_atomic(&dir.join(CHECKSUM_INDEX_FILENAME), index.to_text().as_bytes())
}

/// Streaming content hash of a file.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] if the file cannot be opened or read.
pub fn hash_file(path: &Path) -> Result<ContentHash, HarnessError> {
    let file = File::open(path).map_err(|e| HarnessError::io("open", path, e))?;
    hash_reader(file).map_err(|e| HarnessError::io("read", path, e))
}

/// Build a checksum index over every comparable artifact in `dir`.
///
/// Entries record the artifact's absolute path. When `delete_artifacts` is
/// set each artifact is removed once hashed, leaving only the index.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] on listing, hashing, or removal failure.
pub fn index_artifacts(dir: &Path, delete_artifacts: bool) -> Result<ChecksumIndex, HarnessError> {
    let mut index = ChecksumIndex::new();
    for (basename, path) in list_artifacts(dir)? {
        let hash = hash_file(&path)?;
        let absolute = absolute(&path)?;
        index.push(ChecksumEntry {
            basename,
            hash,
            path: absolute,
        });
        if delete_artifacts {
            remove_file(&path)?;
        }
    }
    Ok(index)
}

/// List the comparable artifacts of `dir` by basename.
///
/// Reserved basenames, temp files, diff outputs, subdirectories, and
/// non-UTF-8 names are excluded. A missing directory lists as empty.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] if the directory cannot be read.
pub fn list_artifacts(dir: &Path) -> Result<BTreeMap<String, PathBuf>, HarnessError> {
    let mut artifacts = BTreeMap::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(artifacts),
        Err(e) => return Err(HarnessError::io("read_dir", dir, e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| HarnessError::io("read_dir", dir, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| HarnessError::io("stat", entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_comparable_artifact(name) {
                artifacts.insert(name.to_string(), entry.path());
            }
        }
    }

    Ok(artifacts)
}

// ---------------------------------------------------------------------------
// Status markers
// ---------------------------------------------------------------------------

/// Whether `dir` holds a checksum index.
#[must_use]
pub fn has_index(dir: &Path) -> bool {
    dir.join(CHECKSUM_INDEX_FILENAME).is_file()
}

/// Whether `dir` holds a `crashed` sentinel.
#[must_use]
pub fn is_crashed(dir: &Path) -> bool {
    dir.join(CRASHED_MARKER).is_file()
}

/// Whether `dir` holds captured standard error.
#[must_use]
pub fn has_stderr(dir: &Path) -> bool {
    dir.join(STDERR_MARKER).is_file()
}

/// The exit status recorded in `dir`'s `failed` marker, if present.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] if the marker exists but cannot be read or
/// does not hold a decimal integer.
pub fn failed_status(dir: &Path) -> Result<Option<i32>, HarnessError> {
    let path = dir.join(FAILED_MARKER);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(HarnessError::io("read", path, e)),
    };
    text.trim().parse::<i32>().map(Some).map_err(|e| {
        HarnessError::io(
            "parse",
            path,
            io::Error::new(io::ErrorKind::InvalidData, e.to_string()),
        )
    })
}

/// Snapshot the recorded expectation of a reference directory.
///
/// A missing directory is [`ReferenceState::Absent`]. The index, when
/// present, is parsed here so that a malformed one aborts before the
/// renderer runs.
///
/// # Errors
///
/// Propagates [`read_index`] and [`failed_status`] errors.
pub fn probe_reference(dir: &Path) -> Result<ReferenceSnapshot, HarnessError> {
    if !dir.is_dir() {
        return Ok(ReferenceSnapshot {
            state: ReferenceState::Absent,
            index: None,
        });
    }
    let index = read_index(dir)?;
    let failed = if index.is_none() {
        failed_status(dir)?
    } else {
        None
    };
    let state = ReferenceState::from_markers(index.is_some(), is_crashed(dir), failed);
    Ok(ReferenceSnapshot { state, index })
}

/// Write the `crashed` sentinel.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] on write failure.
pub fn write_crashed(dir: &Path) -> Result<(), HarnessError> {
    let path = dir.join(CRASHED_MARKER);
    fs::write(&path, b"").map_err(|e| HarnessError::io("write", path, e))
}

/// Write the `failed` marker holding `status` in decimal.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] on write failure.
pub fn write_failed(dir: &Path, status: i32) -> Result<(), HarnessError> {
    let path = dir.join(FAILED_MARKER);
    fs::write(&path, status.to_string()).map_err(|e| HarnessError::io("write", path, e))
}

/// Persist captured standard-error bytes. Empty output writes nothing.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] on write failure.
pub fn write_stderr(dir: &Path, bytes: &[u8]) -> Result<(), HarnessError> {
    if bytes.is_empty() {
        return Ok(());
    }
    let path = dir.join(STDERR_MARKER);
    fs::write(&path, bytes).map_err(|e| HarnessError::io("write", path, e))
}

/// Remove everything an earlier render left in `dir`: status markers,
/// rendered artifacts, diff outputs, and in-flight temp files.
///
/// The checksum index is kept; only a render's own output is cleared.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] if the directory cannot be read or a file
/// cannot be removed.
pub fn clear_previous_run(dir: &Path) -> Result<(), HarnessError> {
    for marker in STATUS_MARKERS {
        remove_file_if_exists(&dir.join(marker))?;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(HarnessError::io("read_dir", dir, e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| HarnessError::io("read_dir", dir, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| HarnessError::io("stat", entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name();
        if name.to_str() != Some(CHECKSUM_INDEX_FILENAME) {
            remove_file_if_exists(&entry.path())?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Filesystem helpers
// ---------------------------------------------------------------------------

/// Create `dir` and its parents. Already existing is not an error.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] on failure.
pub fn ensure_dir(dir: &Path) -> Result<(), HarnessError> {
    fs::create_dir_all(dir).map_err(|e| HarnessError::io("create_dir_all", dir, e))
}

/// Write bytes to a path via temp file + rename in the same directory.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] if the write or rename fails.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), HarnessError> {
    let file_name = path.file_name().ok_or_else(|| {
        HarnessError::io(
            "write",
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "no file name"),
        )
    })?;
    let temp_path = path.with_file_name(format!("{TEMP_PREFIX}{}", file_name.to_string_lossy()));

    fs::write(&temp_path, content).map_err(|e| HarnessError::io("write", &temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| HarnessError::io("rename", &temp_path, e))
}

/// Copy `src` over `dst`.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] on failure.
pub fn copy_file(src: &Path, dst: &Path) -> Result<(), HarnessError> {
    fs::copy(src, dst)
        .map(|_| ())
        .map_err(|e| HarnessError::io("copy", dst, e))
}

/// Remove a file.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] on failure.
pub fn remove_file(path: &Path) -> Result<(), HarnessError> {
    fs::remove_file(path).map_err(|e| HarnessError::io("remove", path, e))
}

/// Remove a file, treating "not found" as success.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] for any other failure.
pub fn remove_file_if_exists(path: &Path) -> Result<(), HarnessError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(HarnessError::io("remove", path, e)),
    }
}

fn absolute(path: &Path) -> Result<PathBuf, HarnessError> {
    std::path::absolute(path).map_err(|e| HarnessError::io("resolve", path, e))
}
