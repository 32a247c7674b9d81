//! Integration tests for the rowcount test logic.

use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use attest_engine::prelude::*;
use std::sync::Arc;

fn orders_batch(ids: Vec<i64>) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("order_id", DataType::Int64, false),
        Field::new("status", DataType::Utf8, true),
    ]));
    let statuses: Vec<Option<&str>> = ids.iter().map(|_| Some("open")).collect();
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(statuses)),
        ],
    )
    .unwrap()
}

/// Backend with a landing table and a target table.
fn backend(landing_rows: Vec<i64>, target_rows: Vec<i64>) -> Arc<MemoryBackend> {
    let backend = MemoryBackend::new();
    backend
        .register_batches("orders_landing", vec![orders_batch(landing_rows)])
        .unwrap();
    backend
        .register_batches("orders", vec![orders_batch(target_rows)])
        .unwrap();
    Arc::new(backend)
}

fn rowcount_definition(query: &str) -> TestDefinition {
    TestDefinition::builder(
        TestObject::new("sales", "test", "alpha", "orders"),
        TestType::Rowcount,
    )
    .spec(Specification::RowcountSql {
        query: query.to_string(),
    })
    .testrun_id("run-1")
    .build()
}

async fn run_rowcount(backend: Arc<MemoryBackend>, query: &str) -> TestCaseResult {
    let registry = TestLogicRegistry::with_builtin_logic();
    let checker = PreconditionChecker::with_builtin_checks();
    let logic = registry.create(&TestType::Rowcount).unwrap();
    let mut case = TestCase::new(
        "run-1-001",
        rowcount_definition(query),
        backend,
        NotifierSet::new(),
    )
    .await;
    case.run(logic.as_ref(), &checker).await
}

const MATCHING_QUERY: &str = "SELECT 'expected' AS label, COUNT(*) AS cnt FROM orders_landing \
     UNION ALL SELECT 'actual' AS label, COUNT(*) AS cnt FROM orders";

#[tokio::test]
async fn equal_counts_pass_and_record_the_diff() {
    let backend = backend(vec![1, 2, 3], vec![4, 5, 6]);
    let result = run_rowcount(backend, MATCHING_QUERY).await;

    assert_eq!(result.status, TestStatus::Finished);
    assert_eq!(result.result, TestResult::Passed);

    // The diff records both counts even on the passing path.
    let diff = &result.diff["rowcount_diff"];
    assert_eq!(diff["expected_count"], 3);
    assert_eq!(diff["actual_count"], 3);
}

#[tokio::test]
async fn unequal_counts_fail_with_both_counts_in_the_summary() {
    let backend = backend(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10], vec![1, 2, 3, 4, 5]);
    let result = run_rowcount(backend, MATCHING_QUERY).await;

    assert_eq!(result.status, TestStatus::Finished);
    assert_eq!(result.result, TestResult::Failed);
    assert!(result.summary.contains("10"));
    assert!(result.summary.contains('5'));

    let diff = &result.diff["rowcount_diff"];
    assert_eq!(diff["expected_count"], 10);
    assert_eq!(diff["actual_count"], 5);
}

#[tokio::test]
async fn three_labeled_rows_abort_the_case() {
    let backend = backend(vec![1], vec![1]);
    let query = "SELECT 'expected' AS label, COUNT(*) AS cnt FROM orders_landing \
         UNION ALL SELECT 'actual' AS label, COUNT(*) AS cnt FROM orders \
         UNION ALL SELECT 'actual' AS label, COUNT(*) AS cnt FROM orders";
    let result = run_rowcount(backend, query).await;

    // A malformed rowcount result is a specification defect, not an
    // infrastructure fault.
    assert_eq!(result.status, TestStatus::Aborted);
    assert_eq!(result.result, TestResult::NotAssessed);
    assert!(result.summary.contains("exactly two"));
}

#[tokio::test]
async fn missing_rowcount_spec_aborts_before_any_backend_call() {
    let backend = backend(vec![1], vec![1]);
    let registry = TestLogicRegistry::with_builtin_logic();
    let checker = PreconditionChecker::with_builtin_checks();
    let logic = registry.create(&TestType::Rowcount).unwrap();

    let definition = TestDefinition::builder(
        TestObject::new("sales", "test", "alpha", "orders"),
        TestType::Rowcount,
    )
    .testrun_id("run-1")
    .build();
    let mut case = TestCase::new("run-1-001", definition, backend, NotifierSet::new()).await;
    let result = case.run(logic.as_ref(), &checker).await;

    assert_eq!(result.status, TestStatus::Aborted);
    assert_eq!(result.result, TestResult::NotAssessed);
    assert!(result.summary.contains("rowcount_sql"));
}

#[tokio::test]
async fn duplicate_rowcount_specs_fail_the_uniqueness_precondition() {
    let backend = backend(vec![1], vec![1]);
    let registry = TestLogicRegistry::with_builtin_logic();
    let checker = PreconditionChecker::with_builtin_checks();
    let logic = registry.create(&TestType::Rowcount).unwrap();

    let definition = TestDefinition::builder(
        TestObject::new("sales", "test", "alpha", "orders"),
        TestType::Rowcount,
    )
    .spec(Specification::RowcountSql {
        query: MATCHING_QUERY.to_string(),
    })
    .spec(Specification::RowcountSql {
        query: MATCHING_QUERY.to_string(),
    })
    .testrun_id("run-1")
    .build();
    let mut case = TestCase::new("run-1-001", definition, backend, NotifierSet::new()).await;
    let result = case.run(logic.as_ref(), &checker).await;

    assert_eq!(result.status, TestStatus::Aborted);
    assert!(result.summary.contains("specs_are_unique"));
}

#[tokio::test]
async fn broken_query_is_a_technical_failure() {
    let backend = backend(vec![1], vec![1]);
    let result = run_rowcount(backend, "SELECT * FROM no_such_table").await;

    assert_eq!(result.status, TestStatus::Error);
    assert_eq!(result.result, TestResult::NotAssessed);
    assert!(!result.summary.is_empty());
}
