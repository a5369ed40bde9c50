//! Test run orchestrator: one end-to-end pipeline per document on the
//! worker pool.
//!
//! # Pipeline
//!
//! ```text
//! skip-listed?            → SKIPPED (renderer not run)
//! probe_reference()       → Absent → NEW (renderer not run)
//! render() into out dir   → RunOutcome
//! compare()               only if the reference has an index and the run completed
//! classify()              → Verdict → ResultAggregate::commit
//! ```
//!
//! After the pool joins, the quiescent aggregate becomes a [`Summary`],
//! which is also written to `summary.json` in the output root.

use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use regtest_kernel::classify::classify;
use regtest_kernel::model::document::{Document, Position};
use regtest_kernel::model::outcome::{Comparison, ReferenceState};
use regtest_kernel::model::verdict::Verdict;
use tracing::info;

use crate::aggregate::{JobOutcome, JobRecord, ResultAggregate, Summary};
use crate::compare::Comparator;
use crate::corpus::SkipList;
use crate::error::HarnessError;
use crate::pool::{self, JobHandler};
use crate::process::Renderer;
use crate::progress::ProgressSink;
use crate::store;

/// File name of the machine-readable summary in the output root.
pub const SUMMARY_FILENAME: &str = "summary.json";

/// Roots of one run. Each document owns `<root>/<relative path>` under the
/// references and output roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    pub docs_dir: PathBuf,
    pub refs_dir: PathBuf,
    pub out_dir: PathBuf,
}

/// Tests a corpus against its references.
pub struct TestRun<'a> {
    layout: RunLayout,
    skip: SkipList,
    renderer: &'a dyn Renderer,
    comparator: Comparator,
    progress: &'a dyn ProgressSink,
    aggregate: ResultAggregate,
}

impl<'a> TestRun<'a> {
    #[must_use]
    pub fn new(
        layout: RunLayout,
        renderer: &'a dyn Renderer,
        comparator: Comparator,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            layout,
            skip: SkipList::default(),
            renderer,
            comparator,
            progress,
            aggregate: ResultAggregate::new(),
        }
    }

    #[must_use]
    pub fn with_skip_list(mut self, skip: SkipList) -> Self {
        self.skip = skip;
        self
    }

    /// Test every document and return the run summary.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] if the output root cannot be created or the
    /// summary cannot be written, or the first fatal error a worker hit
    /// (a malformed reference index).
    pub fn run(self, documents: &[Document], threads: NonZeroUsize) -> Result<Summary, HarnessError> {
        store::ensure_dir(&self.layout.out_dir)?;
        info!(
            docs = %self.layout.docs_dir.display(),
            refs = %self.layout.refs_dir.display(),
            out = %self.layout.out_dir.display(),
            total = documents.len(),
            "running tests"
        );

        pool::execute(&self, documents, threads)?;

        let summary = self.aggregate.into_summary();
        write_summary(&self.layout.out_dir, &summary)?;
        Ok(summary)
    }

    /// The pipeline for one document, up to its commit record.
    fn test(&self, document: &Document, position: Position) -> Result<JobRecord, HarnessError> {
        if self.skip.contains(document) {
            self.progress.document_skipped(document, position, "listed in skip file");
            return Ok(record(document, Verdict::Skipped, false));
        }

        let refs = document.dir_in(&self.layout.refs_dir);
        let reference = store::probe_reference(&refs)?;
        if reference.state == ReferenceState::Absent {
            self.progress.document_skipped(document, position, "reference not found");
            return Ok(record(document, Verdict::New, false));
        }

        self.progress.test_started(document, position);
        let out = document.dir_in(&self.layout.out_dir);
        let outcome = self
            .renderer
            .render(&document.source_in(&self.layout.docs_dir), &out)?;

        let comparison = match &reference.index {
            Some(index) if outcome.completed() => {
                self
                    .comparator
                    .compare(&refs, index, &out, &outcome.artifacts)?
                    .comparison()
            }
            _ => Comparison::NotCompared,
        };

        let verdict = classify(reference.state, outcome.status, comparison);
        self.progress.test_finished(document, position, verdict);
        Ok(record(document, verdict, outcome.has_stderr))
    }

    fn errored(&self, document: &Document, position: Position, detail: String) {
        self.progress.test_errored(document, position, &detail);
        let has_stderr = store::has_stderr(&document.dir_in(&self.layout.out_dir));
        self.aggregate.commit(JobRecord {
            document: document.clone(),
            outcome: JobOutcome::Errored(detail),
            has_stderr,
        });
    }
}

impl JobHandler for TestRun<'_> {
    fn run(&self, document: &Document, position: Position) -> Result<(), HarnessError> {
        match self.test(document, position) {
            Ok(record) => self.aggregate.commit(record),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => self.errored(document, position, e.to_string()),
        }
        Ok(())
    }

    fn panicked(&self, document: &Document, position: Position, detail: String) {
        self.errored(document, position, format!("panicked: {detail}"));
    }
}

fn record(document: &Document, verdict: Verdict, has_stderr: bool) -> JobRecord {
    JobRecord {
        document: document.clone(),
        outcome: JobOutcome::Verdict(verdict),
        has_stderr,
    }
}

/// Write `summary` as pretty JSON to `<out_dir>/summary.json`.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] if serialization or the write fails.
pub fn write_summary(out_dir: &Path, summary: &Summary) -> Result<(), HarnessError> {
    let path = out_dir.join(SUMMARY_FILENAME);
    let mut json = serde_json::to_vec_pretty(summary)
        .map_err(|e| HarnessError::io("serialize", &path, io::Error::from(e)))?;
    json.push(b'\n');
    store::write_atomic(&path, &json)
}
