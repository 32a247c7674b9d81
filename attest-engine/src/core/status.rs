//! Test case lifecycle statuses and verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle status of a test case.
///
/// A test case moves through these states strictly forward:
///
/// ```text
/// NotStarted -> Initiated -> Preconditions -> Executing
///     -> { Finished | Aborted | Error }
/// ```
///
/// `Finished`, `Aborted`, and `Error` are terminal. `Aborted` marks an
/// expected business outcome (missing specification, failed precondition,
/// specification defect); `Error` marks a technical failure that escaped the
/// backend, a check, or the test logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    /// The case exists but construction has not completed
    NotStarted,
    /// Construction completed, result containers initialized
    Initiated,
    /// Required specifications and preconditions are being checked
    Preconditions,
    /// The type-specific test algorithm is running
    Executing,
    /// The test algorithm completed and produced a verdict
    Finished,
    /// The case stopped before execution for an expected business reason
    Aborted,
    /// A technical failure was caught at the case boundary
    Error,
}

impl TestStatus {
    /// Returns true if this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Aborted | Self::Error)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Initiated => "INITIATED",
            Self::Preconditions => "PRECONDITIONS",
            Self::Executing => "EXECUTING",
            Self::Finished => "FINISHED",
            Self::Aborted => "ABORTED",
            Self::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// The verdict of a test case or a test run.
///
/// `NotAssessed` is the initial value and the verdict of every case that did
/// not run to ordinary completion; `Passed`/`Failed` are only ever produced
/// by a test algorithm that completed without a technical failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestResult {
    /// No verdict: the case was aborted, errored, or has not finished
    #[serde(rename = "NA")]
    NotAssessed,
    /// The tested expectation holds
    #[serde(rename = "OK")]
    Passed,
    /// The tested expectation does not hold
    #[serde(rename = "NOK")]
    Failed,
}

impl TestResult {
    /// Returns true if this is a passing verdict.
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotAssessed => "NA",
            Self::Passed => "OK",
            Self::Failed => "NOK",
        };
        write!(f, "{s}")
    }
}
