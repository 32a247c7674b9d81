//! Result DTOs produced by test cases and test runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::{
    specification::Specification,
    status::{TestResult, TestStatus},
    testobject::{TestObject, TestType},
};

/// A single named piece of evidence attached to a test case.
///
/// Facts record headline figures (rowcounts, diff sizes); details record
/// finer-grained findings (per-column comparison outcomes, skipped checks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// Name of the evidence item
    pub name: String,
    /// Arbitrary JSON payload
    pub value: Value,
}

impl Fact {
    /// Creates a new fact.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Immutable snapshot of a finished test case.
///
/// This is the only artifact that outlives the runtime test case; report and
/// CLI layers consume it as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseResult {
    /// Identity of the case within its run
    pub id: String,
    /// The executed test type
    pub testtype: TestType,
    /// The object that was tested
    pub testobject: TestObject,
    /// Terminal lifecycle status
    pub status: TestStatus,
    /// Verdict of the case
    pub result: TestResult,
    /// Human-readable outcome summary
    pub summary: String,
    /// Headline evidence
    pub facts: Vec<Fact>,
    /// Fine-grained evidence
    pub details: Vec<Fact>,
    /// Named diff payloads for the report layer
    pub diff: BTreeMap<String, Value>,
    /// The specifications the case validated against
    pub specifications: Vec<Specification>,
    /// When the case started
    pub start_ts: DateTime<Utc>,
    /// When the case reached its terminal status
    pub end_ts: Option<DateTime<Utc>>,
}

/// The lifecycle status of a test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// The run has been created and cases are executing
    InProgress,
    /// All definitions have been executed
    Finished,
}

/// Aggregate snapshot of a test run.
///
/// Persisted via the storage port at run creation, after every completed
/// case, and at completion; each write overwrites the previous snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRunResult {
    /// Identity of the run
    pub testrun_id: String,
    /// Lifecycle status of the run
    pub status: RunStatus,
    /// Aggregate verdict: `OK` iff every case result is `OK`
    pub result: TestResult,
    /// Results of the executed cases, in execution order
    pub testcase_results: Vec<TestCaseResult>,
    /// When the run started
    pub start_ts: DateTime<Utc>,
    /// When the run finished
    pub end_ts: Option<DateTime<Utc>>,
}

impl TestRunResult {
    /// Computes the aggregate verdict over a set of case results.
    ///
    /// `OK` iff every case passed; any `NOK`, `NA`, aborted, or errored case
    /// degrades the aggregate to `NA` rather than failing hard.
    pub fn aggregate_result(results: &[TestCaseResult]) -> TestResult {
        if results.iter().all(|r| r.result == TestResult::Passed) {
            TestResult::Passed
        } else {
            TestResult::NotAssessed
        }
    }
}
