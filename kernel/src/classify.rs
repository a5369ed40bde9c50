//! The verdict decision table.
//!
//! `classify` is pure: it sees only the reference snapshot, how the run
//! ended, and (for checksum references) the comparator's result. Skipping
//! is decided before any run and never reaches this function.

use crate::model::outcome::{Comparison, ReferenceState, RunStatus};
use crate::model::verdict::Verdict;

/// Map a reference state and a run to a verdict.
///
/// | reference | run | comparison | verdict |
/// |---|---|---|---|
/// | absent | any | any | `New` |
/// | checksums | completed | matched | `Pass` |
/// | checksums | completed | mismatched / not compared | `Fail` |
/// | crashed | completed | – | `DidNotCrash` |
/// | failed | completed | – | `DidNotFail` |
/// | crashed | crashed | – | `PassExpectedCrash` |
/// | failed | failed(code) | – | `PassExpectedFail(code)` |
/// | other | crashed | – | `Crash` |
/// | other | failed(code) | – | `FailStatus(code)` |
///
/// An expected failure passes on any non-zero status; the recorded code is
/// informational only.
#[must_use]
pub fn classify(reference: ReferenceState, run: RunStatus, comparison: Comparison) -> Verdict {
    match (reference, run) {
        (ReferenceState::Absent, _) => Verdict::New,

        (ReferenceState::Checksums, RunStatus::Completed) => match comparison {
            Comparison::Matched => Verdict::Pass,
            Comparison::Mismatched | Comparison::NotCompared => Verdict::Fail,
        },
        (ReferenceState::Crashed, RunStatus::Completed) => Verdict::DidNotCrash,
        (ReferenceState::Failed { .. }, RunStatus::Completed) => Verdict::DidNotFail,

        (ReferenceState::Crashed, RunStatus::Crashed) => Verdict::PassExpectedCrash,
        (ReferenceState::Failed { .. }, RunStatus::Failed { status }) => {
            Verdict::PassExpectedFail { status }
        }

        (_, RunStatus::Crashed) => Verdict::Crash,
        (_, RunStatus::Failed { status }) => Verdict::FailStatus { status },
    }
}
