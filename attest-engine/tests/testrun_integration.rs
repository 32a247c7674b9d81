//! End-to-end integration tests for test run orchestration.

use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use attest_engine::prelude::*;
use std::sync::Arc;

fn customers_batch(ids: Vec<i64>) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("customer_id", DataType::Int64, false),
        Field::new("segment", DataType::Utf8, true),
    ]));
    let segments: Vec<Option<&str>> = ids.iter().map(|_| Some("retail")).collect();
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(segments)),
        ],
    )
    .unwrap()
}

/// Backend holding a source table and the object under test.
fn backend() -> Arc<MemoryBackend> {
    let backend = MemoryBackend::new();
    backend
        .register_batches("customers_source", vec![customers_batch(vec![1, 2, 3])])
        .unwrap();
    backend
        .register_batches("customers", vec![customers_batch(vec![1, 2, 3])])
        .unwrap();
    Arc::new(backend)
}

fn testobject() -> TestObject {
    TestObject::new("crm", "test", "alpha", "customers")
}

fn schema_spec() -> SchemaSpec {
    SchemaSpec::new()
        .with_column("customer_id", "int")
        .with_column("segment", "string")
        .with_primary_keys(vec!["customer_id"])
}

fn rowcount_definition() -> TestDefinition {
    TestDefinition::builder(testobject(), TestType::Rowcount)
        .spec(Specification::RowcountSql {
            query: "SELECT 'expected' AS label, COUNT(*) AS cnt FROM customers_source \
                 UNION ALL SELECT 'actual' AS label, COUNT(*) AS cnt FROM customers"
                .to_string(),
        })
        .testrun_id("run-e2e")
        .build()
}

fn schema_definition() -> TestDefinition {
    TestDefinition::builder(testobject(), TestType::Schema)
        .spec(Specification::Schema(schema_spec()))
        .testrun_id("run-e2e")
        .build()
}

fn compare_definition() -> TestDefinition {
    TestDefinition::builder(testobject(), TestType::Compare)
        .spec(Specification::CompareSql {
            query: "SELECT * FROM customers_source".to_string(),
        })
        .spec(Specification::Schema(schema_spec()))
        .testrun_id("run-e2e")
        .build()
}

#[tokio::test]
async fn full_run_over_all_builtin_test_types_passes() {
    let storage = Arc::new(InMemoryRunStorage::new());
    let run = TestRun::builder("run-e2e", backend())
        .definition(rowcount_definition())
        .definition(schema_definition())
        .definition(compare_definition())
        .storage(storage.clone())
        .build();

    let result = run.execute().await.unwrap();

    assert_eq!(result.status, RunStatus::Finished);
    assert_eq!(result.result, TestResult::Passed);
    assert_eq!(result.testcase_results.len(), 3);
    for case in &result.testcase_results {
        assert_eq!(case.status, TestStatus::Finished);
        assert_eq!(case.result, TestResult::Passed);
        assert!(case.end_ts.unwrap() >= case.start_ts);
    }

    // The persisted snapshot matches the returned aggregate.
    let stored = storage.read("run-e2e").await.unwrap();
    assert_eq!(stored.result, TestResult::Passed);
    assert_eq!(stored.testcase_results.len(), 3);
}

#[tokio::test]
async fn one_failing_case_degrades_the_run_but_not_its_siblings() {
    let backend = MemoryBackend::new();
    backend
        .register_batches("customers_source", vec![customers_batch(vec![1, 2, 3])])
        .unwrap();
    // The object is missing customer 3: compare fails, rowcount disagrees.
    backend
        .register_batches("customers", vec![customers_batch(vec![1, 2])])
        .unwrap();
    let backend = Arc::new(backend);

    let run = TestRun::builder("run-e2e", backend)
        .definition(rowcount_definition())
        .definition(schema_definition())
        .definition(compare_definition())
        .build();
    let result = run.execute().await.unwrap();

    assert_eq!(result.result, TestResult::NotAssessed);
    assert_eq!(result.testcase_results.len(), 3);

    let rowcount = &result.testcase_results[0];
    assert_eq!(rowcount.result, TestResult::Failed);
    let schema = &result.testcase_results[1];
    assert_eq!(schema.result, TestResult::Passed);
    let compare = &result.testcase_results[2];
    assert_eq!(compare.result, TestResult::Failed);
    assert!(compare.summary.contains("1 sample row(s)"));
}

#[tokio::test]
async fn notifications_flow_through_the_whole_run() {
    let collector = Arc::new(attest_engine::notify::CollectingNotifier::new());
    let notifiers = NotifierSet::new().with(collector.clone() as Arc<dyn Notifier>);

    let run = TestRun::builder("run-e2e", backend())
        .definition(rowcount_definition())
        .notifiers(notifiers)
        .build();
    run.execute().await.unwrap();

    let messages = collector.messages();
    assert!(messages.iter().any(|m| m.contains("Starting test run")));
    assert!(messages.iter().any(|m| m.contains("Initiated testcase")));
    assert!(messages
        .iter()
        .any(|m| m.contains("evaluating precondition 'testobject_exists'")));
    assert!(messages.iter().any(|m| m.contains("Finished test run")));
}

#[tokio::test]
async fn case_results_serialize_for_the_report_layer() {
    let run = TestRun::builder("run-e2e", backend())
        .definition(rowcount_definition())
        .build();
    let result = run.execute().await.unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["testrun_id"], "run-e2e");
    assert_eq!(json["status"], "FINISHED");
    assert_eq!(json["result"], "OK");
    let case = &json["testcase_results"][0];
    assert_eq!(case["testtype"], "ROWCOUNT");
    assert_eq!(case["result"], "OK");
    assert_eq!(case["diff"]["rowcount_diff"]["expected_count"], 3);
    assert!(case["specifications"][0]["kind"] == "rowcount_sql");
}
