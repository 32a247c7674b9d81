//! Precondition checking framework.
//!
//! Preconditions gate whether a test case's core logic may run. Each check
//! is a named predicate over a [`Checkable`], the in-flight test case seen
//! through an explicit capability interface. Checks answer `false` for
//! expected business conditions (object missing, duplicate specs) and
//! explain themselves through the checkable; they only return an error for
//! infrastructure faults, which the test case boundary classifies as
//! technical failures.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::backend::Backend;
use crate::core::{SpecKind, Specification, TestObject};
use crate::error::{EngineError, Result};

pub mod builtin;

pub use builtin::{
    PrimaryKeysAreSpecified, SpecsAreUnique, TestobjectExists, TestobjectNotEmpty,
};

/// Capability interface a precondition check sees of the in-flight test
/// case.
#[async_trait]
pub trait Checkable: Send {
    /// The object under test.
    fn testobject(&self) -> &TestObject;

    /// The specifications attached to the case.
    fn specs(&self) -> &[Specification];

    /// The specification kinds the test type requires.
    fn required_specs(&self) -> &[SpecKind];

    /// The backend the case runs against.
    fn backend(&self) -> &dyn Backend;

    /// Replaces the case's outcome summary.
    fn update_summary(&mut self, summary: &str);

    /// Attaches a fine-grained evidence item to the case.
    fn add_detail(&mut self, name: &str, value: Value);

    /// Fires a progress notification.
    async fn notify(&self, message: &str);
}

/// One named precondition check.
#[async_trait]
pub trait PreconditionCheck: std::fmt::Debug + Send + Sync {
    /// The registry name of the check.
    fn name(&self) -> &'static str;

    /// Evaluates the check.
    ///
    /// `Ok(false)` is an expected business outcome and must come with an
    /// explanation set on the checkable; `Err` is reserved for
    /// infrastructure faults.
    async fn check(&self, checkable: &mut dyn Checkable) -> Result<bool>;
}

/// Named registry of precondition checks.
///
/// Lookup by name fails with [`EngineError::UnknownCheck`] for unregistered
/// names; a misspelled precondition never silently passes.
#[derive(Debug, Default)]
pub struct PreconditionChecker {
    checks: HashMap<&'static str, Box<dyn PreconditionCheck>>,
}

impl PreconditionChecker {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in checks.
    pub fn with_builtin_checks() -> Self {
        let mut checker = Self::new();
        checker.register(Box::new(TestobjectExists));
        checker.register(Box::new(TestobjectNotEmpty));
        checker.register(Box::new(SpecsAreUnique));
        checker.register(Box::new(PrimaryKeysAreSpecified));
        checker
    }

    /// Registers a check under its own name, replacing any previous check
    /// with the same name.
    pub fn register(&mut self, check: Box<dyn PreconditionCheck>) {
        self.checks.insert(check.name(), check);
    }

    /// Returns the registered check names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.checks.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Evaluates the named check against the checkable.
    pub async fn check(&self, name: &str, checkable: &mut dyn Checkable) -> Result<bool> {
        let check = self
            .checks
            .get(name)
            .ok_or_else(|| EngineError::UnknownCheck(name.to_string()))?;
        let outcome = check.check(checkable).await?;
        debug!(check = name, outcome, "precondition evaluated");
        Ok(outcome)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! A minimal standalone checkable for exercising checks without a full
    //! test case.

    use super::*;
    use std::sync::Arc;

    pub struct StubCheckable {
        pub testobject: TestObject,
        pub specs: Vec<Specification>,
        pub required_specs: Vec<SpecKind>,
        pub backend: Arc<dyn Backend>,
        pub summary: String,
        pub details: Vec<(String, Value)>,
    }

    impl StubCheckable {
        pub fn new(testobject: TestObject, backend: Arc<dyn Backend>) -> Self {
            Self {
                testobject,
                specs: Vec::new(),
                required_specs: Vec::new(),
                backend,
                summary: String::new(),
                details: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl Checkable for StubCheckable {
        fn testobject(&self) -> &TestObject {
            &self.testobject
        }

        fn specs(&self) -> &[Specification] {
            &self.specs
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
            self.details.push((name.to_string(), value));
        }

        async fn notify(&self, _message: &str) {}
    }
}
