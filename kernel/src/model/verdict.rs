//! Verdicts: the final classification of one document's test.

use std::fmt;

/// Exactly one verdict is produced per document per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Every indexed artifact matched its reference.
    Pass,
    /// The reference expects a crash and the renderer crashed.
    PassExpectedCrash,
    /// The reference expects a failure and the renderer exited non-zero.
    PassExpectedFail { status: i32 },
    /// At least one artifact differed from, or was missing against, the reference.
    Fail,
    /// The renderer exited non-zero where a normal result was expected.
    FailStatus { status: i32 },
    /// The renderer terminated abnormally where it was not expected to.
    Crash,
    /// The reference expects a crash but the renderer completed.
    DidNotCrash,
    /// The reference expects a failure but the renderer completed.
    DidNotFail,
    /// Listed in the skip file; never run.
    Skipped,
    /// No recorded expectation exists; never run.
    New,
}

impl Verdict {
    /// Whether this verdict counts toward `passed`.
    #[must_use]
    pub fn is_pass(self) -> bool {
        matches!(
            self,
            Self::Pass | Self::PassExpectedCrash | Self::PassExpectedFail { .. }
        )
    }

    /// Whether the renderer was executed to reach this verdict.
    #[must_use]
    pub fn was_run(self) -> bool {
        !matches!(self, Self::Skipped | Self::New)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("PASS"),
            Self::PassExpectedCrash => f.write_str("PASS (Expected crash)"),
            Self::PassExpectedFail { status } => {
                write!(f, "PASS (Expected fail with status error {status})")
            }
            Self::Fail => f.write_str("FAIL"),
            Self::FailStatus { status } => write!(f, "FAIL (status error {status})"),
            Self::Crash => f.write_str("CRASH"),
            Self::DidNotCrash => f.write_str("DOES NOT CRASH"),
            Self::DidNotFail => f.write_str("DOES NOT FAIL"),
            Self::Skipped => f.write_str("SKIPPED"),
            Self::New => f.write_str("NEW"),
        }
    }
}
