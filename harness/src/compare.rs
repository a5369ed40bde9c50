//! Comparator: decide per-artifact equality between a fresh output directory
//! and a checksum reference.
//!
//! # Pipeline
//!
//! ```text
//! for entry in reference index:
//!     not produced this run  → record missing, keep going
//!     hash(fresh) == entry   → matched (fresh copy removed unless keep_results)
//!     otherwise              → mismatched (+ diff, + reference overwrite in update mode)
//! update mode && !passed     → rewrite index atomically, re-baseline status markers
//! ```
//!
//! Presence is decided by the artifacts the run reported, not by what
//! happens to be on disk. A missing artifact is a comparison failure, never
//! an error. Diff generation failures are logged and never change the
//! result. Reference writes stay inside the document's reference directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regtest_kernel::checksum::index::{ChecksumEntry, ChecksumIndex, STATUS_MARKERS};
use regtest_kernel::model::outcome::Comparison;
use tracing::{info, warn};

use crate::diff::DiffGenerator;
use crate::error::HarnessError;
use crate::store;

/// What re-baselining does with a reference status marker that the fresh
/// run did not produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaleMarkerPolicy {
    /// Leave the old marker in place.
    #[default]
    Keep,
    /// Delete the old marker so the reference reflects the fresh run only.
    Remove,
}

/// Comparator toggles.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompareOptions {
    /// Keep fresh artifacts that match their reference.
    pub keep_results: bool,
    /// Produce a visual diff for mismatching artifacts.
    pub create_diffs: bool,
    /// Overwrite the reference with the fresh result on mismatch.
    pub update_refs: bool,
    /// Marker handling when re-baselining.
    pub stale_markers: StaleMarkerPolicy,
}

/// Per-artifact findings of one directory comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonReport {
    pub matched: Vec<String>,
    pub mismatched: Vec<String>,
    pub missing: Vec<String>,
    pub diffs: Vec<PathBuf>,
    pub reference_updated: bool,
}

impl ComparisonReport {
    /// Whether every indexed artifact was present and identical.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty()
    }

    #[must_use]
    pub fn comparison(&self) -> Comparison {
        if self.passed() {
            Comparison::Matched
        } else {
            Comparison::Mismatched
        }
    }
}

/// Compares fresh output directories against checksum references.
pub struct Comparator {
    options: CompareOptions,
    differ: Box<dyn DiffGenerator>,
}

impl Comparator {
    #[must_use]
    pub fn new(options: CompareOptions, differ: Box<dyn DiffGenerator>) -> Self {
        Self { options, differ }
    }

    /// Compare the `artifacts` a run wrote into `out_dir` against the
    /// checksum `index` of `reference_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Io`] if a fresh artifact cannot be hashed or
    /// removed, or a reference update cannot be written.
    pub fn compare(
        &self,
        reference_dir: &Path,
        index: &ChecksumIndex,
        out_dir: &Path,
        artifacts: &BTreeMap<String, PathBuf>,
    ) -> Result<ComparisonReport, HarnessError> {
        let mut report = ComparisonReport::default();
        let mut refreshed = ChecksumIndex::new();

        for entry in index.entries() {
            let Some(fresh) = artifacts.get(&entry.basename).filter(|p| p.is_file()) else {
                warn!(
                    artifact = %entry.basename,
                    out_dir = %out_dir.display(),
                    "artifact found in reference index but missing in output"
                );
                report.missing.push(entry.basename.clone());
                continue;
            };

            let hash = store::hash_file(fresh)?;
            let matched = hash == entry.hash;
            if self.options.update_refs {
                refreshed.push(ChecksumEntry {
                    basename: entry.basename.clone(),
                    hash,
                    path: entry.path.clone(),
                });
            }

            if matched {
                if !self.options.keep_results {
                    store::remove_file(fresh)?;
                }
                report.matched.push(entry.basename.clone());
                continue;
            }

            info!(artifact = %entry.basename, "differences found");
            if self.options.create_diffs {
                let reference = diff_input(reference_dir, entry);
                self.diff(reference.as_deref(), entry, fresh, &mut report);
            }
            if self.options.update_refs {
                let local = reference_dir.join(&entry.basename);
                if local.is_file() {
                    info!(reference = %local.display(), "updating reference artifact");
                    store::copy_file(fresh, &local)?;
                }
            }
            report.mismatched.push(entry.basename.clone());
        }

        if self.options.update_refs && !report.passed() {
            self.rebaseline(reference_dir, &refreshed, out_dir)?;
            report.reference_updated = true;
        }

        Ok(report)
    }

    fn diff(
        &self,
        reference: Option<&Path>,
        entry: &ChecksumEntry,
        fresh: &Path,
        report: &mut ComparisonReport,
    ) {
        let Some(reference) = reference else {
            info!(
                reference = %entry.path.display(),
                result = %fresh.display(),
                "reference file not found, skipping diff"
            );
            return;
        };
        match self.differ.create_diff(reference, fresh) {
            Ok(path) => report.diffs.push(path),
            Err(e) => warn!(error = %e, "could not create diff"),
        }
    }

    fn rebaseline(
        &self,
        reference_dir: &Path,
        refreshed: &ChecksumIndex,
        out_dir: &Path,
    ) -> Result<(), HarnessError> {
        info!(reference_dir = %reference_dir.display(), "updating checksum reference");
        store::write_index(reference_dir, refreshed)?;

        for marker in STATUS_MARKERS {
            let src = out_dir.join(marker);
            let dest = reference_dir.join(marker);
            if src.is_file() {
                store::copy_file(&src, &dest)?;
            } else if self.options.stale_markers == StaleMarkerPolicy::Remove {
                store::remove_file_if_exists(&dest)?;
            }
        }
        Ok(())
    }
}

/// The image to diff against: the copy in the reference directory, else the
/// path recorded in the index. Read-only; never an update target.
fn diff_input(reference_dir: &Path, entry: &ChecksumEntry) -> Option<PathBuf> {
    let local = reference_dir.join(&entry.basename);
    if local.is_file() {
        return Some(local);
    }
    entry.path.is_file().then(|| entry.path.clone())
}
