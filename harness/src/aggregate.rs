//! Result aggregation: the single shared accumulator of a run.
//!
//! Workers [`commit`](ResultAggregate::commit) one [`JobRecord`] per
//! document. Every commit is one critical section, so a reader never sees
//! a document counted in `total` but missing from its category list. Once
//! the pool has joined, [`ResultAggregate::into_summary`] hands out the
//! quiescent state by value.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use regtest_kernel::model::document::Document;
use regtest_kernel::model::verdict::Verdict;
use serde::Serialize;

/// How one document's job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The pipeline reached a verdict.
    Verdict(Verdict),
    /// A per-document error stopped the pipeline before a verdict.
    Errored(String),
}

/// What a worker commits for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub document: Document,
    pub outcome: JobOutcome,
    pub has_stderr: bool,
}

/// Counts and category lists of a finished run.
///
/// Category lists are in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub run: usize,
    pub passed: usize,
    pub skipped: usize,
    pub failed: Vec<Document>,
    pub crashed: Vec<Document>,
    pub failed_to_run: Vec<Document>,
    pub did_not_crash: Vec<Document>,
    pub did_not_fail: Vec<Document>,
    pub stderr: Vec<Document>,
    pub new: Vec<Document>,
}

impl Summary {
    /// Documents that were run and did not pass, across all verdict lists.
    /// `stderr` and `new` are not verdicts and are not counted.
    #[must_use]
    pub fn not_passed(&self) -> usize {
        self.failed.len()
            + self.crashed.len()
            + self.failed_to_run.len()
            + self.did_not_crash.len()
            + self.did_not_fail.len()
    }

    /// Every executed test passed. Skipped and new documents do not count.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.passed == self.run
    }

    /// Process exit status for this run: 0 iff [`all_passed`](Self::all_passed).
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.all_passed())
    }

    fn record(&mut self, record: JobRecord) {
        self.total += 1;
        let JobRecord {
            document,
            outcome,
            has_stderr,
        } = record;

        match outcome {
            JobOutcome::Verdict(Verdict::Skipped) => self.skipped += 1,
            JobOutcome::Verdict(Verdict::New) => self.new.push(document),
            JobOutcome::Verdict(verdict) => {
                self.run += 1;
                if has_stderr {
                    self.stderr.push(document.clone());
                }
                match verdict {
                    Verdict::Pass
                    | Verdict::PassExpectedCrash
                    | Verdict::PassExpectedFail { .. } => self.passed += 1,
                    Verdict::Fail => self.failed.push(document),
                    Verdict::FailStatus { .. } => self.failed_to_run.push(document),
                    Verdict::Crash => self.crashed.push(document),
                    Verdict::DidNotCrash => self.did_not_crash.push(document),
                    Verdict::DidNotFail => self.did_not_fail.push(document),
                    Verdict::Skipped | Verdict::New => {}
                }
            }
            JobOutcome::Errored(_) => {
                self.run += 1;
                if has_stderr {
                    self.stderr.push(document.clone());
                }
                self.failed_to_run.push(document);
            }
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.run == 0 {
            writeln!(f, "No tests run")?;
        } else {
            writeln!(f, "Total {} tests", self.run)?;
            writeln!(
                f,
                "{} tests passed ({:.2}%)",
                self.passed,
                percent(self.passed, self.run)
            )?;
            for (list, label) in [
                (&self.failed, "failed"),
                (&self.crashed, "crashed"),
                (&self.failed_to_run, "failed to run"),
                (&self.stderr, "have stderr output"),
                (&self.did_not_crash, "expected to crash, but didn't crash"),
                (&self.did_not_fail, "expected to fail to run, but didn't fail"),
            ] {
                if list.is_empty() {
                    continue;
                }
                let names: Vec<String> = list.iter().map(ToString::to_string).collect();
                writeln!(
                    f,
                    "{} tests {label} ({:.2}%): {}",
                    list.len(),
                    percent(list.len(), self.run),
                    names.join(", ")
                )?;
            }
        }
        if self.skipped > 0 {
            writeln!(f, "{} tests skipped", self.skipped)?;
        }
        if !self.new.is_empty() {
            let names: Vec<String> = self.new.iter().map(ToString::to_string).collect();
            writeln!(
                f,
                "{} documents without reference: {}",
                self.new.len(),
                names.join(", ")
            )?;
        }
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, whole: usize) -> f64 {
    (part as f64 * 100.0) / whole as f64
}

/// Thread-safe accumulator shared by all workers of one run.
#[derive(Debug, Default)]
pub struct ResultAggregate {
    inner: Mutex<Summary>,
}

impl ResultAggregate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one document's result atomically.
    pub fn commit(&self, record: JobRecord) {
        // A panic while holding the lock cannot leave a half-applied record:
        // `Summary::record` does not panic between its updates.
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(record);
    }

    /// Consume the aggregate after all workers have joined.
    #[must_use]
    pub fn into_summary(self) -> Summary {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
