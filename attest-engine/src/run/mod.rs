//! Test run orchestration.
//!
//! A [`TestRun`] executes a list of test definitions sequentially, collects
//! their results, and computes the aggregate verdict. Failures stay local to
//! one case: an unknown test type or a technical failure degrades that
//! case's result, never the run's execution. The full run snapshot is
//! persisted at creation, after every completed case, and at completion.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::backend::Backend;
use crate::cases::{TestCase, TestLogicRegistry};
use crate::checks::PreconditionChecker;
use crate::core::{
    RunStatus, TestCaseResult, TestDefinition, TestResult, TestRunResult, TestStatus,
};
use crate::error::Result;
use crate::notify::NotifierSet;
use crate::storage::RunStorage;

/// Orchestrates the execution of one test run.
#[derive(Debug)]
pub struct TestRun {
    id: String,
    definitions: Vec<TestDefinition>,
    backend: Arc<dyn Backend>,
    registry: TestLogicRegistry,
    checker: PreconditionChecker,
    notifiers: NotifierSet,
    storage: Arc<dyn RunStorage>,
}

impl TestRun {
    /// Creates a builder for a test run against the given backend.
    pub fn builder(id: impl Into<String>, backend: Arc<dyn Backend>) -> TestRunBuilder {
        TestRunBuilder::new(id, backend)
    }

    /// The identity of the run.
    pub fn id(&self) -> &str {
        &self.id
    }

    fn snapshot(
        &self,
        status: RunStatus,
        result: TestResult,
        results: &[TestCaseResult],
        start_ts: chrono::DateTime<Utc>,
        end_ts: Option<chrono::DateTime<Utc>>,
    ) -> TestRunResult {
        TestRunResult {
            testrun_id: self.id.clone(),
            status,
            result,
            testcase_results: results.to_vec(),
            start_ts,
            end_ts,
        }
    }

    fn synthetic_error_result(
        case_id: String,
        definition: &TestDefinition,
        message: String,
    ) -> TestCaseResult {
        let now = Utc::now();
        TestCaseResult {
            id: case_id,
            testtype: definition.testtype.clone(),
            testobject: definition.testobject.clone(),
            status: TestStatus::Error,
            result: TestResult::NotAssessed,
            summary: message,
            facts: Vec::new(),
            details: Vec::new(),
            diff: BTreeMap::new(),
            specifications: definition.specs.clone(),
            start_ts: now,
            end_ts: Some(now),
        }
    }

    /// Executes every definition sequentially and returns the aggregate
    /// result.
    ///
    /// The aggregate verdict is `OK` iff every case passed; any other case
    /// outcome degrades it to `NA`.
    #[instrument(skip(self), fields(testrun_id = %self.id, definitions = self.definitions.len()))]
    pub async fn execute(self) -> Result<TestRunResult> {
        let start_ts = Utc::now();
        let mut results: Vec<TestCaseResult> = Vec::with_capacity(self.definitions.len());

        info!(testrun_id = %self.id, definitions = self.definitions.len(), "starting test run");
        self.notifiers
            .notify(&format!(
                "Starting test run {} with {} definition(s).",
                self.id,
                self.definitions.len()
            ))
            .await;

        // Snapshot at creation, before any case runs.
        self.storage
            .write(&self.snapshot(
                RunStatus::InProgress,
                TestResult::NotAssessed,
                &results,
                start_ts,
                None,
            ))
            .await?;

        for (index, definition) in self.definitions.iter().enumerate() {
            let case_id = format!("{}-{:03}", self.id, index + 1);
            let result = match self.registry.create(&definition.testtype) {
                Ok(logic) => {
                    let mut case = TestCase::new(
                        case_id,
                        definition.clone(),
                        self.backend.clone(),
                        self.notifiers.clone(),
                    )
                    .await;
                    case.run(logic.as_ref(), &self.checker).await
                }
                Err(e) => {
                    // One unknown type never aborts the whole run.
                    warn!(testrun_id = %self.id, testtype = %definition.testtype, "unknown test type");
                    self.notifiers
                        .notify(&format!(
                            "Testcase {case_id}: no test logic registered for type {}.",
                            definition.testtype
                        ))
                        .await;
                    Self::synthetic_error_result(case_id, definition, e.to_string())
                }
            };
            results.push(result);

            // Snapshot after every completed case for crash recovery.
            self.storage
                .write(&self.snapshot(
                    RunStatus::InProgress,
                    TestResult::NotAssessed,
                    &results,
                    start_ts,
                    None,
                ))
                .await?;
        }

        let aggregate = TestRunResult::aggregate_result(&results);
        let snapshot = self.snapshot(
            RunStatus::Finished,
            aggregate,
            &results,
            start_ts,
            Some(Utc::now()),
        );
        self.storage.write(&snapshot).await?;

        info!(
            testrun_id = %self.id,
            cases = snapshot.testcase_results.len(),
            result = %snapshot.result,
            "test run finished"
        );
        self.notifiers
            .notify(&format!(
                "Finished test run {}: {} case(s), aggregate result {}.",
                self.id,
                snapshot.testcase_results.len(),
                snapshot.result
            ))
            .await;

        Ok(snapshot)
    }
}

/// Builder for [`TestRun`] instances.
#[derive(Debug)]
pub struct TestRunBuilder {
    id: String,
    definitions: Vec<TestDefinition>,
    backend: Arc<dyn Backend>,
    registry: Option<TestLogicRegistry>,
    checker: Option<PreconditionChecker>,
    notifiers: NotifierSet,
    storage: Option<Arc<dyn RunStorage>>,
}

impl TestRunBuilder {
    /// Creates a new builder.
    pub fn new(id: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        Self {
            id: id.into(),
            definitions: Vec::new(),
            backend,
            registry: None,
            checker: None,
            notifiers: NotifierSet::new(),
            storage: None,
        }
    }

    /// Adds a definition to the run.
    pub fn definition(mut self, definition: TestDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Adds multiple definitions to the run.
    pub fn definitions<I>(mut self, definitions: I) -> Self
    where
        I: IntoIterator<Item = TestDefinition>,
    {
        self.definitions.extend(definitions);
        self
    }

    /// Replaces the test logic registry (defaults to the built-in logic).
    pub fn registry(mut self, registry: TestLogicRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replaces the precondition checker (defaults to the built-in checks).
    pub fn checker(mut self, checker: PreconditionChecker) -> Self {
        self.checker = Some(checker);
        self
    }

    /// Sets the notifier set.
    pub fn notifiers(mut self, notifiers: NotifierSet) -> Self {
        self.notifiers = notifiers;
        self
    }

    /// Sets the run storage (defaults to in-memory storage).
    pub fn storage(mut self, storage: Arc<dyn RunStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Builds the run.
    pub fn build(self) -> TestRun {
        TestRun {
            id: self.id,
            definitions: self.definitions,
            backend: self.backend,
            registry: self
                .registry
                .unwrap_or_else(TestLogicRegistry::with_builtin_logic),
            checker: self
                .checker
                .unwrap_or_else(PreconditionChecker::with_builtin_checks),
            notifiers: self.notifiers,
            storage: self
                .storage
                .unwrap_or_else(|| Arc::new(crate::storage::InMemoryRunStorage::new())),
        }
    }
}
