//! Process runner: one renderer invocation per document.
//!
//! # State machine
//!
//! ```text
//! Running → Completed(artifacts)   exit code 0
//!         → FailedExit(code)       exit code != 0   (writes `failed`)
//!         → Crashed                no exit code      (writes `crashed`)
//! ```
//!
//! Whatever an earlier run left in the output directory is removed first, so
//! the directory and the reported artifacts describe this run only.
//! Standard error is captured regardless of the outcome and persisted to
//! `stderr` when non-empty. The calling worker blocks until the renderer
//! exits; parallelism comes from running several workers, not from async
//! I/O. A failed or crashed invocation is never retried.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use regtest_kernel::model::outcome::{RunOutcome, RunStatus};
use tracing::{debug, warn};

use crate::error::HarnessError;
use crate::store;

/// Produces the rendered artifacts of one document into an output directory.
///
/// Implementations write the status markers (`crashed`, `failed`,
/// `stderr`) into `out_dir` so that the directory alone records the run.
pub trait Renderer: Sync {
    /// Render `document` into `out_dir` and report how it ended.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] if the renderer cannot be started or the
    /// output directory cannot be prepared or recorded.
    fn render(&self, document: &Path, out_dir: &Path) -> Result<RunOutcome, HarnessError>;
}

/// The external renderer: `<program> [args...] <document> <out_dir>`.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessRunner {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Renderer for ProcessRunner {
    fn render(&self, document: &Path, out_dir: &Path) -> Result<RunOutcome, HarnessError> {
        store::ensure_dir(out_dir)?;
        store::clear_previous_run(out_dir)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(document)
            .arg(out_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Drain stderr before waiting so a chatty renderer cannot block on a full pipe.
        let mut stderr = Vec::new();
        if let Some(mut pipe) = child.stderr.take() {
            pipe.read_to_end(&mut stderr)
                .map_err(|e| HarnessError::io("read stderr of", document, e))?;
        }
        let exit = child
            .wait()
            .map_err(|e| HarnessError::io("wait for renderer on", document, e))?;

        store::write_stderr(out_dir, &stderr)?;
        let status = record_exit(exit, document, out_dir)?;

        let artifacts = match status {
            RunStatus::Completed => store::list_artifacts(out_dir)?,
            RunStatus::Crashed | RunStatus::Failed { .. } => BTreeMap::new(),
        };

        Ok(RunOutcome {
            status,
            artifacts,
            has_stderr: !stderr.is_empty(),
        })
    }
}

/// Normalize an exit status and write the matching marker.
fn record_exit(exit: ExitStatus, document: &Path, out_dir: &Path) -> Result<RunStatus, HarnessError> {
    match exit.code() {
        Some(0) => {
            debug!(document = %document.display(), "renderer completed");
            Ok(RunStatus::Completed)
        }
        Some(status) => {
            debug!(document = %document.display(), status, "renderer exited with failure");
            store::write_failed(out_dir, status)?;
            Ok(RunStatus::Failed { status })
        }
        None => {
            warn!(
                document = %document.display(),
                signal = termination_signal(exit),
                "renderer terminated abnormally"
            );
            store::write_crashed(out_dir)?;
            Ok(RunStatus::Crashed)
        }
    }
}

#[cfg(unix)]
fn termination_signal(exit: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    exit.signal()
}

#[cfg(not(unix))]
fn termination_signal(_exit: ExitStatus) -> Option<i32> {
    None
}
