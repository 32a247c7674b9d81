//! Test objects, test types, and test definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{config::DomainConfig, specification::Specification};

/// Identifies one data object under test.
///
/// A test object is addressed by business domain, deployment stage (e.g.
/// `dev`, `test`, `prod`), platform instance, and object name. The tuple is
/// immutable; it is created by the caller and carried unchanged through the
/// whole test lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestObject {
    /// Business domain the object belongs to
    pub domain: String,
    /// Deployment stage
    pub stage: String,
    /// Platform instance within the stage
    pub instance: String,
    /// Name of the data object (e.g. a table name)
    pub name: String,
}

impl TestObject {
    /// Creates a new test object identifier.
    pub fn new(
        domain: impl Into<String>,
        stage: impl Into<String>,
        instance: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            stage: stage.into(),
            instance: instance.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TestObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.domain, self.stage, self.instance, self.name
        )
    }
}

/// The type of a test, selecting which test logic executes the case.
///
/// Known types are closed variants; `Custom` carries any other type name so
/// that a definition with an unregistered type can flow through a test run
/// and produce a synthetic error result instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestType {
    /// Compare the object's schema against a schema specification
    Schema,
    /// Validate expected vs. actual rowcounts from a rowcount query
    Rowcount,
    /// Sampled data comparison between a query and the object
    Compare,
    /// Harness test logic that always passes
    DummyOk,
    /// Harness test logic that always fails
    DummyNok,
    /// Harness test logic that raises a technical failure
    DummyError,
    /// Any other type name; resolved against the registry at run time
    #[serde(untagged)]
    Custom(String),
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema => write!(f, "SCHEMA"),
            Self::Rowcount => write!(f, "ROWCOUNT"),
            Self::Compare => write!(f, "COMPARE"),
            Self::DummyOk => write!(f, "DUMMY_OK"),
            Self::DummyNok => write!(f, "DUMMY_NOK"),
            Self::DummyError => write!(f, "DUMMY_ERROR"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// One planned test execution, immutable once built.
///
/// A definition binds a test object to a test type, the specifications the
/// test validates against, and the per-domain tuning config. Definitions are
/// produced by the external planning subsystem and consumed read-only by the
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDefinition {
    /// The data object under test
    pub testobject: TestObject,
    /// Which test logic to run
    pub testtype: TestType,
    /// Specifications consumed by the test logic
    pub specs: Vec<Specification>,
    /// Free-form labels attached by the caller
    pub labels: Vec<String>,
    /// Per-domain tuning data
    pub domain_config: DomainConfig,
    /// Identity of the test set this definition belongs to
    pub testset_id: String,
    /// Identity of the test run this definition executes in
    pub testrun_id: String,
}

impl TestDefinition {
    /// Creates a builder for a test definition.
    pub fn builder(testobject: TestObject, testtype: TestType) -> TestDefinitionBuilder {
        TestDefinitionBuilder::new(testobject, testtype)
    }
}

/// Builder for [`TestDefinition`] instances.
#[derive(Debug)]
pub struct TestDefinitionBuilder {
    testobject: TestObject,
    testtype: TestType,
    specs: Vec<Specification>,
    labels: Vec<String>,
    domain_config: DomainConfig,
    testset_id: String,
    testrun_id: String,
}

impl TestDefinitionBuilder {
    /// Creates a new builder for the given object and test type.
    pub fn new(testobject: TestObject, testtype: TestType) -> Self {
        Self {
            testobject,
            testtype,
            specs: Vec::new(),
            labels: Vec::new(),
            domain_config: DomainConfig::default(),
            testset_id: String::new(),
            testrun_id: String::new(),
        }
    }

    /// Adds a specification.
    pub fn spec(mut self, spec: Specification) -> Self {
        self.specs.push(spec);
        self
    }

    /// Adds multiple specifications.
    pub fn specs<I>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = Specification>,
    {
        self.specs.extend(specs);
        self
    }

    /// Adds a label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Sets the domain config.
    pub fn domain_config(mut self, config: DomainConfig) -> Self {
        self.domain_config = config;
        self
    }

    /// Sets the test set identity.
    pub fn testset_id(mut self, id: impl Into<String>) -> Self {
        self.testset_id = id.into();
        self
    }

    /// Sets the test run identity.
    pub fn testrun_id(mut self, id: impl Into<String>) -> Self {
        self.testrun_id = id.into();
        self
    }

    /// Builds the definition.
    pub fn build(self) -> TestDefinition {
        TestDefinition {
            testobject: self.testobject,
            testtype: self.testtype,
            specs: self.specs,
            labels: self.labels,
            domain_config: self.domain_config,
            testset_id: self.testset_id,
            testrun_id: self.testrun_id,
        }
    }
}
