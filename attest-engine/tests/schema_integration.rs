//! Integration tests for the schema comparison test logic.

use arrow::array::{BooleanArray, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use attest_engine::backend::memory::ObjectLayout;
use attest_engine::prelude::*;
use std::sync::Arc;

/// One-row table with columns a: Int64, b: Boolean, c: Utf8.
fn drifted_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("a", DataType::Int64, false),
        Field::new("b", DataType::Boolean, true),
        Field::new("c", DataType::Utf8, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1])),
            Arc::new(BooleanArray::from(vec![Some(true)])),
            Arc::new(StringArray::from(vec![Some("x")])),
        ],
    )
    .unwrap()
}

fn definition(spec: SchemaSpec) -> TestDefinition {
    TestDefinition::builder(
        TestObject::new("sales", "test", "alpha", "orders"),
        TestType::Schema,
    )
    .spec(Specification::Schema(spec))
    .testrun_id("run-1")
    .build()
}

async fn run_schema(backend: Arc<MemoryBackend>, spec: SchemaSpec) -> TestCaseResult {
    let registry = TestLogicRegistry::with_builtin_logic();
    let checker = PreconditionChecker::with_builtin_checks();
    let logic = registry.create(&TestType::Schema).unwrap();
    let mut case = TestCase::new("run-1-001", definition(spec), backend, NotifierSet::new()).await;
    case.run(logic.as_ref(), &checker).await
}

#[tokio::test]
async fn matching_schema_passes() {
    let backend = MemoryBackend::new();
    backend
        .register_batches("orders", vec![drifted_batch()])
        .unwrap();

    let spec = SchemaSpec::new()
        .with_column("a", "int")
        .with_column("b", "Boolean")
        .with_column("c", "string");
    let result = run_schema(Arc::new(backend), spec).await;

    assert_eq!(result.status, TestStatus::Finished);
    assert_eq!(result.result, TestResult::Passed);
}

#[tokio::test]
async fn dtype_mismatch_and_unexpected_column_fail() {
    let backend = MemoryBackend::new();
    backend
        .register_batches("orders", vec![drifted_batch()])
        .unwrap();

    // Expected b as string; the object reports Boolean. Column c is not
    // expected at all.
    let spec = SchemaSpec::new()
        .with_column("a", "int")
        .with_column("b", "string");
    let result = run_schema(Arc::new(backend), spec).await;

    assert_eq!(result.status, TestStatus::Finished);
    assert_eq!(result.result, TestResult::Failed);

    let column_diff = &result.diff["column_diff"];
    assert_eq!(column_diff["a"]["outcome"], "OK");
    assert_eq!(column_diff["b"]["outcome"], "NOK");
    assert_eq!(column_diff["b"]["reason"], "datatype mismatch");
    assert_eq!(column_diff["c"]["outcome"], "NOK");
    assert_eq!(column_diff["c"]["reason"], "unexpected column");
}

#[tokio::test]
async fn non_comparable_dtype_mismatch_is_not_flagged() {
    let backend = MemoryBackend::new();
    backend
        .register_batches("orders", vec![drifted_batch()])
        .unwrap();

    // Drop "string" from the comparable list: the b mismatch disappears.
    let definition = TestDefinition::builder(
        TestObject::new("sales", "test", "alpha", "orders"),
        TestType::Schema,
    )
    .spec(Specification::Schema(
        SchemaSpec::new()
            .with_column("a", "int")
            .with_column("b", "string")
            .with_column("c", "string"),
    ))
    .domain_config(DomainConfig::default().with_comparable_datatypes(vec!["int"]))
    .testrun_id("run-1")
    .build();

    let registry = TestLogicRegistry::with_builtin_logic();
    let checker = PreconditionChecker::with_builtin_checks();
    let logic = registry.create(&TestType::Schema).unwrap();
    let mut case = TestCase::new(
        "run-1-001",
        definition,
        Arc::new(backend),
        NotifierSet::new(),
    )
    .await;
    let result = case.run(logic.as_ref(), &checker).await;

    assert_eq!(result.result, TestResult::Passed);
    assert_eq!(result.diff["column_diff"]["b"]["outcome"], "SKIPPED");
}

#[tokio::test]
async fn primary_keys_compared_only_with_capability() {
    let spec = SchemaSpec::new()
        .with_column("a", "int")
        .with_column("b", "Boolean")
        .with_column("c", "string")
        .with_primary_keys(vec!["a"]);
    let layout = ObjectLayout {
        primary_keys: vec!["c".to_string()],
        ..Default::default()
    };

    // Without the capability the key mismatch is invisible.
    let blind = MemoryBackend::new();
    blind
        .register_object("orders", vec![drifted_batch()], layout.clone())
        .unwrap();
    let result = run_schema(Arc::new(blind), spec.clone()).await;
    assert_eq!(result.result, TestResult::Passed);
    assert!(!result.diff.contains_key("primary_key_diff"));

    // With the capability it fails the case.
    let aware = MemoryBackend::new().with_primary_key_support();
    aware
        .register_object("orders", vec![drifted_batch()], layout)
        .unwrap();
    let result = run_schema(Arc::new(aware), spec).await;
    assert_eq!(result.result, TestResult::Failed);
    assert!(result.summary.contains("primary keys"));
    let key_diff = &result.diff["primary_key_diff"];
    assert_eq!(key_diff["missing"][0], "a");
    assert_eq!(key_diff["unexpected"][0], "c");
}

#[tokio::test]
async fn declared_key_order_is_irrelevant() {
    let spec = SchemaSpec::new()
        .with_column("a", "int")
        .with_column("b", "Boolean")
        .with_column("c", "string")
        .with_primary_keys(vec!["a", "c"]);
    let layout = ObjectLayout {
        primary_keys: vec!["c".to_string(), "a".to_string()],
        ..Default::default()
    };

    let backend = MemoryBackend::new().with_primary_key_support();
    backend
        .register_object("orders", vec![drifted_batch()], layout)
        .unwrap();
    let result = run_schema(Arc::new(backend), spec).await;
    assert_eq!(result.result, TestResult::Passed);
}

#[tokio::test]
async fn missing_object_fails_the_existence_precondition() {
    let backend = MemoryBackend::new();
    let result = run_schema(Arc::new(backend), SchemaSpec::new().with_column("a", "int")).await;

    assert_eq!(result.status, TestStatus::Aborted);
    assert_eq!(result.result, TestResult::NotAssessed);
    assert!(result.summary.contains("does not exist"));
}
