//! Prelude for commonly used types and traits in attest-engine.

pub use crate::backend::{Backend, MemoryBackend};
pub use crate::cases::{TestCase, TestLogic, TestLogicRegistry};
pub use crate::checks::{Checkable, PreconditionCheck, PreconditionChecker};
pub use crate::core::{
    CompareStrategy, DomainConfig, Fact, RunStatus, SchemaSpec, SpecKind, Specification,
    TestCaseResult, TestDefinition, TestObject, TestResult, TestRunResult, TestStatus, TestType,
};
pub use crate::error::{EngineError, Result};
pub use crate::logging::LogConfig;
pub use crate::notify::{Notifier, NotifierSet, TracingNotifier};
pub use crate::run::TestRun;
pub use crate::storage::{InMemoryRunStorage, RunStorage};
