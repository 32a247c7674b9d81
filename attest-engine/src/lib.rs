//! # Attest - Data-Quality Test Execution for Rust
//!
//! Attest is a data-quality test execution engine: given a declarative test
//! definition (a target data object, a test type, and one or more
//! specifications), it executes the test against a pluggable data-platform
//! backend and produces a structured pass/fail result with supporting
//! evidence (facts, details, diffs).
//!
//! ## Overview
//!
//! A [`run::TestRun`] orchestrates one or more test cases. Each case is a
//! small state machine: it checks required specifications and named
//! preconditions, runs a type-specific algorithm (schema comparison,
//! rowcount validation, or sampled data comparison), and snapshots its
//! outcome as an immutable [`core::TestCaseResult`]. The run aggregates the
//! case results and persists its state through a narrow storage port.
//!
//! ## Quick Start
//!
//! ```rust
//! use attest_engine::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<()> {
//! // An in-memory backend holding the objects under test.
//! let backend = Arc::new(MemoryBackend::new());
//! // ... register your tables ...
//!
//! // Plan a rowcount test.
//! let definition = TestDefinition::builder(
//!     TestObject::new("sales", "test", "alpha", "orders"),
//!     TestType::Rowcount,
//! )
//! .spec(Specification::RowcountSql {
//!     query: "SELECT 'expected' AS label, COUNT(*) AS cnt FROM orders_staging \
//!             UNION ALL SELECT 'actual' AS label, COUNT(*) AS cnt FROM orders"
//!         .to_string(),
//! })
//! .testrun_id("run-2026-08-07")
//! .build();
//!
//! // Execute a run and inspect the aggregate result.
//! let run = TestRun::builder("run-2026-08-07", backend)
//!     .definition(definition)
//!     .build();
//! let result = run.execute().await?;
//!
//! for case in &result.testcase_results {
//!     println!("{}: {} -> {}", case.id, case.testtype, case.result);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Pieces
//!
//! - **Test case state machine**: `NOT_STARTED -> INITIATED ->
//!   PRECONDITIONS -> EXECUTING -> {FINISHED | ABORTED | ERROR}`, with a
//!   strict error taxonomy: specification defects abort a case, technical
//!   failures error it, and neither ever propagates past the case boundary.
//! - **Precondition framework**: named, pluggable boolean checks
//!   (`testobject_exists`, `testobject_not_empty`, `specs_are_unique`,
//!   `primary_keys_are_specified`) over an explicit [`checks::Checkable`]
//!   capability interface.
//! - **Sampled data comparison**: deterministic key sampling, cross-source
//!   anti-join diffing over structural row hashes, datatype harmonization,
//!   and a bounded diff preview.
//! - **Ports**: [`backend::Backend`] for data platforms,
//!   [`notify::Notifier`] for progress messages, and
//!   [`storage::RunStorage`] for run persistence, all consumed behind
//!   narrow async traits.
//!
//! ## Architecture
//!
//! - **`core`**: data model: test objects, definitions, specifications,
//!   statuses, result DTOs, domain configuration
//! - **`cases`**: the test case state machine, logic registry, and the
//!   built-in test logic implementations
//! - **`checks`**: the precondition checking framework
//! - **`compare`**: the sampled diff engine
//! - **`backend`**: the backend port, datatype harmonization, and the
//!   DataFusion-based in-memory reference backend
//! - **`run`**: test run orchestration
//! - **`notify`** / **`storage`**: notification and persistence ports
//! - **`logging`**: `tracing` configuration helpers

pub mod backend;
pub mod cases;
pub mod checks;
pub mod compare;
pub mod core;
pub mod error;
pub mod logging;
pub mod notify;
pub mod prelude;
pub mod run;
pub mod storage;
