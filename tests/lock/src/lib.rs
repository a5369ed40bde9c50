//! Shared fixtures for the cross-process regression tests.
//!
//! A [`Workspace`] is a throwaway `docs/`, `refs/`, `out/` triple. Documents
//! are `fake_renderer` scripts, so each test states what the renderer does
//! for each document right where it adds it.

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use regtest_harness::aggregate::Summary;
use regtest_harness::compare::{CompareOptions, Comparator};
use regtest_harness::corpus::{Corpus, SkipList};
use regtest_harness::diff::PixelDiff;
use regtest_harness::process::ProcessRunner;
use regtest_harness::progress::TracingProgress;
use regtest_harness::references::{ReferenceOptions, ReferenceRun, ReferenceTally};
use regtest_harness::runner::{RunLayout, TestRun};

/// Temporary corpus with its references and output roots.
pub struct Workspace {
    _root: tempfile::TempDir,
    layout: RunLayout,
}

impl Workspace {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let layout = RunLayout {
            docs_dir: root.path().join("docs"),
            refs_dir: root.path().join("refs"),
            out_dir: root.path().join("out"),
        };
        fs::create_dir_all(&layout.docs_dir).expect("docs dir");
        Self {
            _root: root,
            layout,
        }
    }

    #[must_use]
    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// Write (or overwrite) a document script.
    ///
    /// # Panics
    ///
    /// Panics on write failure.
    pub fn doc(&self, name: &str, script: &str) -> &Self {
        let path = self.layout.docs_dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("doc parent");
        }
        fs::write(path, script).expect("write doc");
        self
    }

    #[must_use]
    pub fn refs(&self, name: &str) -> PathBuf {
        self.layout.refs_dir.join(name)
    }

    #[must_use]
    pub fn out(&self, name: &str) -> PathBuf {
        self.layout.out_dir.join(name)
    }

    /// # Panics
    ///
    /// Panics if the corpus cannot be enumerated.
    #[must_use]
    pub fn corpus(&self) -> Corpus {
        Corpus::discover(&self.layout.docs_dir, &["xps".to_owned()]).expect("corpus")
    }

    /// Run `run-tests` over the whole corpus.
    ///
    /// # Panics
    ///
    /// Panics if the run aborts.
    #[must_use]
    pub fn run_tests(&self, renderer: &Path, options: CompareOptions, threads: usize) -> Summary {
        let corpus = self.corpus();
        let skip = SkipList::load(corpus.root(), None).expect("skip list");
        let runner = ProcessRunner::new(renderer, Vec::new());
        TestRun::new(
            self.layout.clone(),
            &runner,
            Comparator::new(options, Box::new(PixelDiff)),
            &TracingProgress,
        )
        .with_skip_list(skip)
        .run(corpus.documents(), threads_of(threads))
        .expect("test run")
    }

    /// Run `create-refs` over the whole corpus.
    ///
    /// # Panics
    ///
    /// Panics if the run aborts.
    #[must_use]
    pub fn create_refs(
        &self,
        renderer: &Path,
        options: ReferenceOptions,
        threads: usize,
    ) -> ReferenceTally {
        let corpus = self.corpus();
        let skip = SkipList::load(corpus.root(), None).expect("skip list");
        let runner = ProcessRunner::new(renderer, Vec::new());
        ReferenceRun::new(
            self.layout.docs_dir.clone(),
            self.layout.refs_dir.clone(),
            options,
            &runner,
            &TracingProgress,
        )
        .with_skip_list(skip)
        .run(corpus.documents(), threads_of(threads))
        .expect("reference run")
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

fn threads_of(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN)
}

/// Aggregate counts that must not depend on scheduling.
#[must_use]
pub fn counts(summary: &Summary) -> [usize; 10] {
    [
        summary.total,
        summary.run,
        summary.passed,
        summary.skipped,
        summary.failed.len(),
        summary.crashed.len(),
        summary.failed_to_run.len(),
        summary.did_not_crash.len(),
        summary.did_not_fail.len(),
        summary.new.len(),
    ]
}
