//! Test case state machine and test logic registry.
//!
//! A [`TestCase`] owns the mutable execution state of one planned test. Its
//! lifecycle is a strict state machine:
//!
//! ```text
//! NotStarted -> Initiated -> Preconditions -> Executing
//!     -> { Finished | Aborted | Error }
//! ```
//!
//! The type-specific algorithm lives behind the [`TestLogic`] trait and is
//! resolved from an explicit [`TestLogicRegistry`] owned by the caller;
//! there is no global registry. Any error escaping the logic is caught
//! exactly once at the case boundary: specification defects become
//! `Aborted`, everything else becomes `Error`; nothing propagates to the
//! test run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::backend::Backend;
use crate::checks::{Checkable, PreconditionChecker};
use crate::core::{
    Fact, SpecKind, Specification, TestCaseResult, TestDefinition, TestObject, TestResult,
    TestStatus, TestType,
};
use crate::error::Result;
use crate::notify::NotifierSet;

pub mod compare;
pub mod dummy;
pub mod rowcount;
pub mod schema;

pub use compare::CompareLogic;
pub use dummy::{DummyErrorLogic, DummyNokLogic, DummyOkLogic};
pub use rowcount::RowcountLogic;
pub use schema::SchemaLogic;

/// The type-specific algorithm of a test case.
#[async_trait]
pub trait TestLogic: std::fmt::Debug + Send + Sync {
    /// The test type this logic executes.
    fn test_type(&self) -> TestType;

    /// Specification kinds that must be present before anything runs.
    fn required_specs(&self) -> &[SpecKind];

    /// Names of the precondition checks gating execution, in evaluation
    /// order.
    fn preconditions(&self) -> &[&'static str];

    /// Runs the algorithm against the case, returning the verdict.
    ///
    /// Evidence (facts, details, diff payloads) is attached to the case as
    /// a side effect. Errors are classified at the case boundary, never
    /// here.
    async fn execute(&self, case: &mut TestCase) -> Result<TestResult>;
}

/// Factory producing one test logic instance.
pub type LogicFactory = Box<dyn Fn() -> Box<dyn TestLogic> + Send + Sync>;

/// Explicit registry mapping test types to logic factories.
///
/// Populated at construction time and owned by the test run (or whoever
/// drives cases directly); unknown types fail lookup with a typed error so
/// the caller can synthesize an error result instead of aborting a run.
#[derive(Default)]
pub struct TestLogicRegistry {
    factories: HashMap<TestType, LogicFactory>,
}

impl std::fmt::Debug for TestLogicRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<String> = self.factories.keys().map(|t| t.to_string()).collect();
        types.sort();
        f.debug_struct("TestLogicRegistry")
            .field("types", &types)
            .finish()
    }
}

impl TestLogicRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in test logic.
    pub fn with_builtin_logic() -> Self {
        let mut registry = Self::new();
        registry.register(TestType::Schema, || Box::new(SchemaLogic));
        registry.register(TestType::Rowcount, || Box::new(RowcountLogic));
        registry.register(TestType::Compare, || Box::new(CompareLogic));
        registry.register(TestType::DummyOk, || Box::new(DummyOkLogic));
        registry.register(TestType::DummyNok, || Box::new(DummyNokLogic));
        registry.register(TestType::DummyError, || Box::new(DummyErrorLogic));
        registry
    }

    /// Registers a factory for a test type, replacing any previous one.
    pub fn register<F>(&mut self, testtype: TestType, factory: F)
    where
        F: Fn() -> Box<dyn TestLogic> + Send + Sync + 'static,
    {
        self.factories.insert(testtype, Box::new(factory));
    }

    /// Creates the logic for a test type.
    pub fn create(&self, testtype: &TestType) -> Result<Box<dyn TestLogic>> {
        self.factories
            .get(testtype)
            .map(|factory| factory())
            .ok_or_else(|| crate::error::EngineError::UnknownTestType(testtype.to_string()))
    }
}

/// Runtime state of one executing test case.
///
/// Created by the test run from a [`TestDefinition`], driven through the
/// state machine by [`run`](TestCase::run), and dropped after producing its
/// [`TestCaseResult`].
#[derive(Debug)]
pub struct TestCase {
    id: String,
    definition: TestDefinition,
    backend: Arc<dyn Backend>,
    notifiers: NotifierSet,
    required_specs: Vec<SpecKind>,
    status: TestStatus,
    result: TestResult,
    summary: String,
    facts: Vec<Fact>,
    details: Vec<Fact>,
    diff: BTreeMap<String, Value>,
    start_ts: DateTime<Utc>,
    end_ts: Option<DateTime<Utc>>,
}

impl TestCase {
    /// Creates a new case in the `Initiated` state and announces it.
    pub async fn new(
        id: impl Into<String>,
        definition: TestDefinition,
        backend: Arc<dyn Backend>,
        notifiers: NotifierSet,
    ) -> Self {
        let case = Self {
            id: id.into(),
            backend,
            notifiers,
            required_specs: Vec::new(),
            status: TestStatus::Initiated,
            result: TestResult::NotAssessed,
            summary: String::new(),
            facts: Vec::new(),
            details: Vec::new(),
            diff: BTreeMap::new(),
            start_ts: Utc::now(),
            end_ts: None,
            definition,
        };
        case.notifiers
            .notify(&format!(
                "Initiated testcase {} ({}) for testobject {}.",
                case.id, case.definition.testtype, case.definition.testobject
            ))
            .await;
        case
    }

    /// The case identity within its run.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The definition this case executes.
    pub fn definition(&self) -> &TestDefinition {
        &self.definition
    }

    /// The backend the case runs against.
    pub fn backend_handle(&self) -> Arc<dyn Backend> {
        self.backend.clone()
    }

    /// The current lifecycle status.
    pub fn status(&self) -> TestStatus {
        self.status
    }

    /// The current verdict.
    pub fn result(&self) -> TestResult {
        self.result
    }

    /// Appends a headline evidence item.
    pub fn add_fact(&mut self, name: &str, value: Value) {
        self.facts.push(Fact::new(name, value));
    }

    /// Appends a fine-grained evidence item.
    pub fn add_detail(&mut self, name: &str, value: Value) {
        self.details.push(Fact::new(name, value));
    }

    /// Stores a named diff payload for the report layer.
    pub fn set_diff(&mut self, name: &str, value: Value) {
        self.diff.insert(name.to_string(), value);
    }

    /// Replaces the outcome summary.
    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = summary.into();
    }

    async fn transition(&mut self, status: TestStatus) {
        debug!(case = %self.id, from = %self.status, to = %status, "phase transition");
        self.status = status;
        self.notifiers
            .notify(&format!(
                "Testcase {}: {} test on {} entered phase {}.",
                self.id, self.definition.testtype, self.definition.testobject, status
            ))
            .await;
    }

    /// Stamps the terminal status, the end timestamp, and produces the
    /// result DTO. Every exit path of [`run`](TestCase::run) goes through
    /// here exactly once.
    async fn finalize(&mut self, status: TestStatus) -> TestCaseResult {
        self.status = status;
        if self.end_ts.is_none() {
            self.end_ts = Some(Utc::now());
        }
        self.notifiers
            .notify(&format!(
                "Testcase {}: {} test on {} finished with status {}, result {}.",
                self.id,
                self.definition.testtype,
                self.definition.testobject,
                self.status,
                self.result
            ))
            .await;
        info!(
            case = %self.id,
            testtype = %self.definition.testtype,
            testobject = %self.definition.testobject,
            status = %self.status,
            result = %self.result,
            "testcase finished"
        );
        self.snapshot()
    }

    fn snapshot(&self) -> TestCaseResult {
        TestCaseResult {
            id: self.id.clone(),
            testtype: self.definition.testtype.clone(),
            testobject: self.definition.testobject.clone(),
            status: self.status,
            result: self.result,
            summary: self.summary.clone(),
            facts: self.facts.clone(),
            details: self.details.clone(),
            diff: self.diff.clone(),
            specifications: self.definition.specs.clone(),
            start_ts: self.start_ts,
            end_ts: self.end_ts,
        }
    }

    /// Drives the case through preconditions and execution.
    ///
    /// Never returns an error: every failure mode is encoded in the
    /// returned result's status/verdict pair.
    #[instrument(skip(self, logic, checker), fields(case = %self.id, testtype = %self.definition.testtype))]
    pub async fn run(
        &mut self,
        logic: &dyn TestLogic,
        checker: &PreconditionChecker,
    ) -> TestCaseResult {
        self.required_specs = logic.required_specs().to_vec();
        self.transition(TestStatus::Preconditions).await;

        // Required specifications gate execution before any backend call.
        for kind in logic.required_specs() {
            if !self.definition.specs.iter().any(|s| s.kind() == *kind) {
                self.set_summary(format!(
                    "Required specification '{kind}' not provided for {} test.",
                    self.definition.testtype
                ));
                return self.finalize(TestStatus::Aborted).await;
            }
        }

        for name in logic.preconditions() {
            self.notifiers
                .notify(&format!(
                    "Testcase {}: evaluating precondition '{}'.",
                    self.id, name
                ))
                .await;
            match checker.check(name, self).await {
                Ok(true) => {}
                Ok(false) => {
                    let explanation = self.summary.clone();
                    self.set_summary(format!(
                        "Stopped before execution: precondition '{name}' not satisfied. {explanation}"
                    ));
                    return self.finalize(TestStatus::Aborted).await;
                }
                Err(e) => {
                    warn!(case = %self.id, check = %name, error = %e, "precondition check failed technically");
                    self.set_summary(e.to_string());
                    return self.finalize(TestStatus::Error).await;
                }
            }
        }

        self.transition(TestStatus::Executing).await;
        match logic.execute(self).await {
            Ok(result) => {
                self.result = result;
                self.finalize(TestStatus::Finished).await
            }
            Err(e) if e.is_specification_defect() => {
                self.set_summary(e.to_string());
                self.finalize(TestStatus::Aborted).await
            }
            Err(e) => {
                warn!(case = %self.id, error = %e, "technical failure caught at case boundary");
                self.set_summary(e.to_string());
                self.finalize(TestStatus::Error).await
            }
        }
    }
}

#[async_trait]
impl Checkable for TestCase {
    fn testobject(&self) -> &TestObject {
        &self.definition.testobject
    }

    fn specs(&self) -> &[Specification] {
        &self.definition.specs
    }

    fn required_specs(&self) -> &[SpecKind] {
        &self.required_specs
    }

    fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    fn update_summary(&mut self, summary: &str) {
        self.summary = summary.to_string();
    }

    fn add_detail(&mut self, name: &str, value: Value) {
        self.details.push(Fact::new(name, value));
    }

    async fn notify(&self, message: &str) {
        self.notifiers.notify(message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::core::{DomainConfig, TestDefinition};
    use crate::notify::CollectingNotifier;

    fn definition(testtype: TestType) -> TestDefinition {
        TestDefinition::builder(
            TestObject::new("sales", "test", "alpha", "orders"),
            testtype,
        )
        .domain_config(DomainConfig::default())
        .testrun_id("run-1")
        .build()
    }

    async fn run_case(
        testtype: TestType,
    ) -> (TestCaseResult, std::sync::Arc<CollectingNotifier>) {
        let registry = TestLogicRegistry::with_builtin_logic();
        let checker = PreconditionChecker::with_builtin_checks();
        let backend = Arc::new(MemoryBackend::new());
        let collector = std::sync::Arc::new(CollectingNotifier::new());
        let notifiers = NotifierSet::new().with(collector.clone() as Arc<dyn crate::notify::Notifier>);

        let logic = registry.create(&testtype).unwrap();
        let mut case = TestCase::new("run-1-001", definition(testtype), backend, notifiers).await;
        let result = case.run(logic.as_ref(), &checker).await;
        (result, collector)
    }

    #[tokio::test]
    async fn test_dummy_ok_reaches_finished() {
        let (result, _) = run_case(TestType::DummyOk).await;
        assert_eq!(result.status, TestStatus::Finished);
        assert_eq!(result.result, TestResult::Passed);
        assert!(result.end_ts.unwrap() >= result.start_ts);
    }

    #[tokio::test]
    async fn test_dummy_nok_is_finished_but_failed() {
        let (result, _) = run_case(TestType::DummyNok).await;
        assert_eq!(result.status, TestStatus::Finished);
        assert_eq!(result.result, TestResult::Failed);
    }

    #[tokio::test]
    async fn test_dummy_error_is_caught_at_boundary() {
        let (result, _) = run_case(TestType::DummyError).await;
        assert_eq!(result.status, TestStatus::Error);
        assert_eq!(result.result, TestResult::NotAssessed);
        assert!(!result.summary.is_empty());
    }

    #[tokio::test]
    async fn test_missing_required_spec_aborts_without_backend_call() {
        // Rowcount requires a rowcount_sql spec; none is attached, and no
        // object named "orders" is registered, so an attempted backend call
        // would error, so an Aborted status proves the gate fired first.
        let (result, _) = run_case(TestType::Rowcount).await;
        assert_eq!(result.status, TestStatus::Aborted);
        assert_eq!(result.result, TestResult::NotAssessed);
        assert!(result.summary.contains("Required specification"));
    }

    #[tokio::test]
    async fn test_notifications_cover_phases() {
        let (_, collector) = run_case(TestType::DummyOk).await;
        let messages = collector.messages();
        assert!(messages.iter().any(|m| m.contains("Initiated")));
        assert!(messages.iter().any(|m| m.contains("PRECONDITIONS")));
        assert!(messages.iter().any(|m| m.contains("EXECUTING")));
        assert!(messages.iter().any(|m| m.contains("finished with status")));
    }

    #[tokio::test]
    async fn test_unknown_type_fails_registry_lookup() {
        let registry = TestLogicRegistry::with_builtin_logic();
        let err = registry
            .create(&TestType::Custom("PROFILE".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::UnknownTestType(t) if t == "PROFILE"
        ));
    }

    #[tokio::test]
    async fn test_failed_precondition_aborts_with_reason() {
        // DummyOk has no preconditions, so wire a rowcount case with a spec
        // against a backend that does not hold the object.
        let registry = TestLogicRegistry::with_builtin_logic();
        let checker = PreconditionChecker::with_builtin_checks();
        let backend = Arc::new(MemoryBackend::new());

        let def = TestDefinition::builder(
            TestObject::new("sales", "test", "alpha", "orders"),
            TestType::Rowcount,
        )
        .spec(crate::core::Specification::RowcountSql {
            query: "SELECT 1".to_string(),
        })
        .testrun_id("run-1")
        .build();

        let logic = registry.create(&TestType::Rowcount).unwrap();
        let mut case =
            TestCase::new("run-1-001", def, backend, NotifierSet::new()).await;
        let result = case.run(logic.as_ref(), &checker).await;

        assert_eq!(result.status, TestStatus::Aborted);
        assert_eq!(result.result, TestResult::NotAssessed);
        assert!(result.summary.contains("precondition"));
        assert!(result.summary.contains("does not exist"));
    }
}
