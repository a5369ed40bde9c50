//! Fixed-size worker pool over one bounded document queue.
//!
//! # Dispatch
//!
//! ```text
//! producer (calling thread) ──► bounded queue ──► worker × min(threads, docs)
//!                                                   └─ JobHandler::run(doc, pos)
//! ```
//!
//! Documents are dispatched in enumeration order; completion order is
//! unspecified. With a single worker the jobs run on the calling thread
//! and no threads are spawned.
//!
//! A handler returns `Err` only for fatal errors. The first one sets the
//! abort flag: the producer stops enqueuing, workers drain the queue
//! without running it, in-flight jobs finish, and the error is returned
//! after the join. A panic inside a job is caught at the job boundary and
//! handed to [`JobHandler::panicked`]; siblings keep running.

use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use regtest_kernel::model::document::{Document, Position};
use tracing::{debug, info};

use crate::error::HarnessError;

/// Queue slots per worker. Keeps the producer a little ahead of the workers
/// without materializing the whole corpus in the channel.
const QUEUE_DEPTH_PER_WORKER: usize = 2;

/// One unit of pool work, executed end to end for a document.
pub trait JobHandler: Sync {
    /// Process one document and commit its result.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`HarnessError`] to abort the whole run. Per-document
    /// failures must be recorded by the handler, not returned.
    fn run(&self, document: &Document, position: Position) -> Result<(), HarnessError>;

    /// The job for `document` panicked with `detail`.
    fn panicked(&self, document: &Document, position: Position, detail: String);
}

/// Number of workers for a corpus of `total` documents.
#[must_use]
pub fn worker_count(threads: NonZeroUsize, total: usize) -> usize {
    threads.get().min(total)
}

/// Run `handler` over every document.
///
/// # Errors
///
/// Returns the first fatal error a handler reported. Documents not yet
/// started at that point are never run.
pub fn execute<H: JobHandler>(
    handler: &H,
    documents: &[Document],
    threads: NonZeroUsize,
) -> Result<(), HarnessError> {
    let total = documents.len();
    let jobs = documents.iter().enumerate().map(|(i, document)| {
        (
            document,
            Position {
                n_doc: i + 1,
                total_docs: total,
            },
        )
    });

    let workers = worker_count(threads, total);
    if workers <= 1 {
        debug!(total, "running documents on the calling thread");
        for (document, position) in jobs {
            run_job(handler, document, position)?;
        }
        return Ok(());
    }

    info!(workers, total, "spawning worker threads");
    let (tx, rx) = crossbeam_channel::bounded(workers * QUEUE_DEPTH_PER_WORKER);
    let abort = AtomicBool::new(false);
    let first_error: Mutex<Option<HarnessError>> = Mutex::new(None);

    thread::scope(|scope| {
        for _ in 0..workers {
            let rx = rx.clone();
            let abort = &abort;
            let first_error = &first_error;
            scope.spawn(move || {
                for (document, position) in rx {
                    if abort.load(Ordering::Acquire) {
                        continue;
                    }
                    if let Err(e) = run_job(handler, document, position) {
                        abort.store(true, Ordering::Release);
                        let mut slot = first_error.lock().unwrap_or_else(PoisonError::into_inner);
                        if slot.is_none() {
                            *slot = Some(e);
                        }
                    }
                }
            });
        }
        drop(rx);

        for job in jobs {
            if abort.load(Ordering::Acquire) || tx.send(job).is_err() {
                break;
            }
        }
        drop(tx);
    });

    match first_error.into_inner().unwrap_or_else(PoisonError::into_inner) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn run_job<H: JobHandler>(
    handler: &H,
    document: &Document,
    position: Position,
) -> Result<(), HarnessError> {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.run(document, position))) {
        Ok(result) => result,
        Err(payload) => {
            handler.panicked(document, position, panic_detail(payload.as_ref()));
            Ok(())
        }
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
