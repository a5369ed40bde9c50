//! Reference creation: render each document straight into its reference
//! directory and record the result as the expectation for later runs.
//!
//! A completed render is recorded as a checksum index over its artifacts;
//! a crashed or failed render leaves its `crashed`/`failed` marker as the
//! recorded expectation. Documents that already have results are left
//! alone unless forced.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use regtest_kernel::checksum::index::CHECKSUM_INDEX_FILENAME;
use regtest_kernel::model::document::{Document, Position};
use regtest_kernel::model::outcome::{ReferenceState, RunStatus};
use serde::Serialize;
use tracing::{debug, info};

use crate::corpus::SkipList;
use crate::error::HarnessError;
use crate::pool::{self, JobHandler};
use crate::process::Renderer;
use crate::progress::ProgressSink;
use crate::store;

/// `create-refs` toggles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceOptions {
    /// Re-create references that already have results.
    pub force: bool,
    /// Keep only the checksum index; delete rendered artifacts.
    pub checksums_only: bool,
}

/// Counts and lists of a reference-creation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceTally {
    pub total: usize,
    pub created: usize,
    pub skipped: usize,
    pub existing: usize,
    pub crashed: Vec<Document>,
    pub failed: Vec<Document>,
    pub errored: Vec<Document>,
    pub stderr: Vec<Document>,
}

impl fmt::Display for ReferenceTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} documents: {} references created, {} already present, {} skipped",
            self.total, self.created, self.existing, self.skipped
        )?;
        for (list, label) in [
            (&self.crashed, "crashed"),
            (&self.failed, "failed to run"),
            (&self.errored, "could not be processed"),
            (&self.stderr, "have stderr output"),
        ] {
            if !list.is_empty() {
                let names: Vec<String> = list.iter().map(ToString::to_string).collect();
                writeln!(f, "{} documents {label}: {}", list.len(), names.join(", "))?;
            }
        }
        Ok(())
    }
}

/// How one document's reference job ended.
enum Created {
    Skipped,
    Existing,
    Recorded { status: RunStatus, has_stderr: bool },
}

/// Creates references for a corpus.
pub struct ReferenceRun<'a> {
    docs_dir: PathBuf,
    refs_dir: PathBuf,
    options: ReferenceOptions,
    skip: SkipList,
    renderer: &'a dyn Renderer,
    progress: &'a dyn ProgressSink,
    tally: Mutex<ReferenceTally>,
}

impl<'a> ReferenceRun<'a> {
    #[must_use]
    pub fn new(
        docs_dir: PathBuf,
        refs_dir: PathBuf,
        options: ReferenceOptions,
        renderer: &'a dyn Renderer,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            docs_dir,
            refs_dir,
            options,
            skip: SkipList::default(),
            renderer,
            progress,
            tally: Mutex::new(ReferenceTally::default()),
        }
    }

    #[must_use]
    pub fn with_skip_list(mut self, skip: SkipList) -> Self {
        self.skip = skip;
        self
    }

    /// Create references for every document.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] if the references root cannot be created.
    pub fn run(
        self,
        documents: &[Document],
        threads: NonZeroUsize,
    ) -> Result<ReferenceTally, HarnessError> {
        store::ensure_dir(&self.refs_dir)?;
        info!(
            docs = %self.docs_dir.display(),
            refs = %self.refs_dir.display(),
            total = documents.len(),
            "creating references"
        );
        pool::execute(&self, documents, threads)?;
        Ok(self.tally.into_inner().unwrap_or_else(PoisonError::into_inner))
    }

    fn create(&self, document: &Document, position: Position) -> Result<Created, HarnessError> {
        if self.skip.contains(document) {
            self.progress.document_skipped(document, position, "listed in skip file");
            return Ok(Created::Skipped);
        }

        let refs = document.dir_in(&self.refs_dir);
        store::ensure_dir(&refs)?;
        let state = ReferenceState::from_markers(
            store::has_index(&refs),
            store::is_crashed(&refs),
            store::failed_status(&refs)?,
        );
        if state.has_results() {
            if !self.options.force {
                self.progress.document_skipped(document, position, "results found");
                return Ok(Created::Existing);
            }
            discard_results(&refs)?;
        }

        self.progress.test_started(document, position);
        let outcome = self
            .renderer
            .render(&document.source_in(&self.docs_dir), &refs)?;
        if outcome.completed() {
            let index = store::index_artifacts(&refs, self.options.checksums_only)?;
            store::write_index(&refs, &index)?;
            debug!(%document, artifacts = index.len(), "checksum index written");
        }
        self.progress.reference_created(document, position);
        Ok(Created::Recorded {
            status: outcome.status,
            has_stderr: outcome.has_stderr,
        })
    }

    /// Record one document; `None` means it could not be processed.
    fn commit(&self, document: &Document, created: Option<Created>) {
        let mut tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        tally.total += 1;
        match created {
            Some(Created::Skipped) => tally.skipped += 1,
            Some(Created::Existing) => tally.existing += 1,
            Some(Created::Recorded { status, has_stderr }) => {
                tally.created += 1;
                if has_stderr {
                    tally.stderr.push(document.clone());
                }
                match status {
                    RunStatus::Completed => {}
                    RunStatus::Crashed => tally.crashed.push(document.clone()),
                    RunStatus::Failed { .. } => tally.failed.push(document.clone()),
                }
            }
            None => tally.errored.push(document.clone()),
        }
    }
}

impl JobHandler for ReferenceRun<'_> {
    fn run(&self, document: &Document, position: Position) -> Result<(), HarnessError> {
        match self.create(document, position) {
            Ok(created) => self.commit(document, Some(created)),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.progress.test_errored(document, position, &e.to_string());
                self.commit(document, None);
            }
        }
        Ok(())
    }

    fn panicked(&self, document: &Document, position: Position, detail: String) {
        self.progress.test_errored(document, position, &detail);
        self.commit(document, None);
    }
}

/// Remove a previous reference so a forced re-creation cannot inherit its
/// index or stale artifacts. Status markers are cleared by the renderer.
fn discard_results(refs: &Path) -> Result<(), HarnessError> {
    store::remove_file_if_exists(&refs.join(CHECKSUM_INDEX_FILENAME))?;
    for path in store::list_artifacts(refs)?.into_values() {
        store::remove_file(&path)?;
    }
    Ok(())
}
