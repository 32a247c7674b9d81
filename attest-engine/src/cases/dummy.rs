//! Dummy test logic for harness testing.
//!
//! The three dummies exercise the state machine's terminal paths without
//! touching a backend: ordinary pass, ordinary fail, and a technical
//! failure that the case boundary must catch.

use async_trait::async_trait;
use serde_json::json;

use crate::core::{SpecKind, TestResult, TestType};
use crate::error::{EngineError, Result};

use super::{TestCase, TestLogic};

/// Always passes.
#[derive(Debug, Clone, Copy)]
pub struct DummyOkLogic;

#[async_trait]
impl TestLogic for DummyOkLogic {
    fn test_type(&self) -> TestType {
        TestType::DummyOk
    }

    fn required_specs(&self) -> &[SpecKind] {
        &[]
    }

    fn preconditions(&self) -> &[&'static str] {
        &[]
    }

    async fn execute(&self, case: &mut TestCase) -> Result<TestResult> {
        case.add_fact("dummy", json!(true));
        case.set_summary("Dummy test executed successfully.");
        Ok(TestResult::Passed)
    }
}

/// Always fails the tested expectation.
#[derive(Debug, Clone, Copy)]
pub struct DummyNokLogic;

#[async_trait]
impl TestLogic for DummyNokLogic {
    fn test_type(&self) -> TestType {
        TestType::DummyNok
    }

    fn required_specs(&self) -> &[SpecKind] {
        &[]
    }

    fn preconditions(&self) -> &[&'static str] {
        &[]
    }

    async fn execute(&self, case: &mut TestCase) -> Result<TestResult> {
        case.add_fact("dummy", json!(true));
        case.set_summary("Dummy test executed with a deliberate failure.");
        Ok(TestResult::Failed)
    }
}

/// Always raises a technical failure.
#[derive(Debug, Clone, Copy)]
pub struct DummyErrorLogic;

#[async_trait]
impl TestLogic for DummyErrorLogic {
    fn test_type(&self) -> TestType {
        TestType::DummyError
    }

    fn required_specs(&self) -> &[SpecKind] {
        &[]
    }

    fn preconditions(&self) -> &[&'static str] {
        &[]
    }

    async fn execute(&self, _case: &mut TestCase) -> Result<TestResult> {
        Err(EngineError::Internal(
            "deliberate dummy failure".to_string(),
        ))
    }
}
