//! Core types for the attest test execution engine.
//!
//! This module provides the data model shared by every part of the engine:
//! test objects and definitions, declarative specifications, lifecycle
//! statuses and verdicts, result DTOs, and per-domain configuration.
//!
//! ## Architecture
//!
//! ```text
//! TestRun
//!     ├── TestDefinition (TestObject, TestType, Specifications, DomainConfig)
//!     │       └── TestCase (runtime state machine, cases module)
//!     │               └── TestCaseResult
//!     └── TestRunResult (aggregate)
//! ```

pub mod config;
pub mod result;
pub mod specification;
pub mod status;
pub mod testobject;

pub use config::{CompareStrategy, DomainConfig};
pub use result::{Fact, RunStatus, TestCaseResult, TestRunResult};
pub use specification::{find_unique_spec, SchemaSpec, SpecKind, Specification};
pub use status::{TestResult, TestStatus};
pub use testobject::{TestDefinition, TestDefinitionBuilder, TestObject, TestType};
