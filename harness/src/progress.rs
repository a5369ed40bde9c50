//! Per-document progress reporting.
//!
//! Workers report through an injected [`ProgressSink`] instead of writing
//! to a shared console. [`TracingProgress`] turns each event into one
//! `tracing` event, so interleaving is the subscriber's concern.

use regtest_kernel::model::document::{Document, Position};
use regtest_kernel::model::verdict::Verdict;
use tracing::{debug, info, warn};

/// Receives progress events from pool workers. Calls may arrive
/// concurrently from several threads.
pub trait ProgressSink: Sync {
    /// A document is about to be rendered.
    fn test_started(&self, document: &Document, position: Position);

    /// A document finished with a verdict.
    fn test_finished(&self, document: &Document, position: Position, verdict: Verdict);

    /// A document could not be processed.
    fn test_errored(&self, document: &Document, position: Position, detail: &str);

    /// A document was not run, either because it is skip-listed or because
    /// it has no reference (`reason` says which).
    fn document_skipped(&self, document: &Document, position: Position, reason: &str);

    /// A reference was written for a document.
    fn reference_created(&self, document: &Document, position: Position);
}

/// Default sink: one structured `tracing` event per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn test_started(&self, document: &Document, position: Position) {
        debug!(%document, %position, "testing");
    }

    fn test_finished(&self, document: &Document, position: Position, verdict: Verdict) {
        if verdict.is_pass() {
            info!(%document, %position, %verdict, "test finished");
        } else {
            warn!(%document, %position, %verdict, "test finished");
        }
    }

    fn test_errored(&self, document: &Document, position: Position, detail: &str) {
        warn!(%document, %position, error = detail, "test could not run");
    }

    fn document_skipped(&self, document: &Document, position: Position, reason: &str) {
        info!(%document, %position, reason, "skipping");
    }

    fn reference_created(&self, document: &Document, position: Position) {
        info!(%document, %position, "reference created");
    }
}
