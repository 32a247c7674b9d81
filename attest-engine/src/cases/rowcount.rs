//! Rowcount validation test logic.

use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use serde_json::json;
use tracing::instrument;

use crate::core::{find_unique_spec, SpecKind, TestResult, TestType};
use crate::error::{EngineError, Result};

use super::{TestCase, TestLogic};

const REQUIRED_SPECS: &[SpecKind] = &[SpecKind::RowcountSql];
const PRECONDITIONS: &[&str] = &["specs_are_unique", "testobject_exists"];

/// Validates that an expected and an actual rowcount agree.
///
/// The rowcount query must yield exactly two labeled rows, `expected` and
/// `actual`, over a label column and a numeric count column. Any other
/// cardinality or labeling is a defect of the specification, not of the
/// infrastructure, and aborts the case.
#[derive(Debug, Clone, Copy)]
pub struct RowcountLogic;

/// The two labeled counts extracted from a rowcount query result.
#[derive(Debug)]
struct LabeledCounts {
    expected: i64,
    actual: i64,
}

fn extract_counts(batch: &RecordBatch) -> Result<LabeledCounts> {
    if batch.num_rows() != 2 {
        return Err(EngineError::specification_defect(format!(
            "rowcount query must yield exactly two labeled rows, got {}",
            batch.num_rows()
        )));
    }

    let schema = batch.schema();
    let label_idx = schema
        .fields()
        .iter()
        .position(|f| matches!(f.data_type(), DataType::Utf8 | DataType::LargeUtf8))
        .ok_or_else(|| {
            EngineError::specification_defect("rowcount query result has no label column")
        })?;
    let count_idx = schema
        .fields()
        .iter()
        .enumerate()
        .position(|(i, f)| i != label_idx && f.data_type().is_numeric())
        .ok_or_else(|| {
            EngineError::specification_defect("rowcount query result has no numeric count column")
        })?;

    let labels = cast(batch.column(label_idx), &DataType::Utf8)?;
    let labels = labels
        .as_any()
        .downcast_ref::<arrow::array::StringArray>()
        .ok_or_else(|| EngineError::Internal("label column cast did not yield Utf8".to_string()))?;
    let counts = cast(batch.column(count_idx), &DataType::Int64)?;
    let counts = counts
        .as_any()
        .downcast_ref::<arrow::array::Int64Array>()
        .ok_or_else(|| EngineError::Internal("count column cast did not yield Int64".to_string()))?;

    let mut expected = None;
    let mut actual = None;
    for row in 0..2 {
        let count = counts.value(row);
        match labels.value(row) {
            "expected" => expected = Some(count),
            "actual" => actual = Some(count),
            other => {
                return Err(EngineError::specification_defect(format!(
                    "rowcount query produced unknown label '{other}'"
                )))
            }
        }
    }

    match (expected, actual) {
        (Some(expected), Some(actual)) => Ok(LabeledCounts { expected, actual }),
        _ => Err(EngineError::specification_defect(
            "rowcount query must label one row 'expected' and one row 'actual'",
        )),
    }
}

#[async_trait]
impl TestLogic for RowcountLogic {
    fn test_type(&self) -> TestType {
        TestType::Rowcount
    }

    fn required_specs(&self) -> &[SpecKind] {
        REQUIRED_SPECS
    }

    fn preconditions(&self) -> &[&'static str] {
        PRECONDITIONS
    }

    #[instrument(skip(self, case), fields(case = %case.id()))]
    async fn execute(&self, case: &mut TestCase) -> Result<TestResult> {
        let spec = find_unique_spec(&case.definition().specs, SpecKind::RowcountSql)
            .ok_or_else(|| {
                EngineError::specification_defect("no unique rowcount_sql specification")
            })?;
        let query = spec
            .query()
            .ok_or_else(|| EngineError::Internal("rowcount spec without query".to_string()))?
            .to_string();

        let backend = case.backend_handle();
        let translated = backend.translate_query(&query, &case.definition().testobject)?;
        let batch = backend.run_query(&translated).await?;
        let counts = extract_counts(&batch)?;

        // The diff always records both counts, even on the passing path.
        case.set_diff(
            "rowcount_diff",
            json!({
                "expected_count": counts.expected,
                "actual_count": counts.actual,
            }),
        );
        case.add_fact("expected_count", json!(counts.expected));
        case.add_fact("actual_count", json!(counts.actual));

        if counts.expected == counts.actual {
            case.set_summary(format!(
                "Rowcount matches: expected {} and actual {} are equal.",
                counts.expected, counts.actual
            ));
            Ok(TestResult::Passed)
        } else {
            case.set_summary(format!(
                "Rowcount mismatch: expected {} but found {}.",
                counts.expected, counts.actual
            ));
            Ok(TestResult::Failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    fn counts_batch(labels: Vec<&str>, counts: Vec<i64>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("label", DataType::Utf8, false),
            Field::new("cnt", DataType::Int64, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(labels)),
                Arc::new(Int64Array::from(counts)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_extract_counts_in_any_row_order() {
        let counts =
            extract_counts(&counts_batch(vec!["actual", "expected"], vec![5, 10])).unwrap();
        assert_eq!(counts.expected, 10);
        assert_eq!(counts.actual, 5);
    }

    #[test]
    fn test_wrong_cardinality_is_a_specification_defect() {
        let err = extract_counts(&counts_batch(
            vec!["expected", "actual", "other"],
            vec![1, 2, 3],
        ))
        .unwrap_err();
        assert!(err.is_specification_defect());
        assert!(err.to_string().contains("exactly two"));
    }

    #[test]
    fn test_unknown_label_is_a_specification_defect() {
        let err =
            extract_counts(&counts_batch(vec!["expected", "observed"], vec![1, 2])).unwrap_err();
        assert!(err.is_specification_defect());
        assert!(err.to_string().contains("observed"));
    }

    #[test]
    fn test_duplicate_label_is_a_specification_defect() {
        let err =
            extract_counts(&counts_batch(vec!["expected", "expected"], vec![1, 1])).unwrap_err();
        assert!(err.is_specification_defect());
    }

    #[test]
    fn test_count_column_found_by_type() {
        // Count column before the label column still resolves.
        let schema = Arc::new(Schema::new(vec![
            Field::new("cnt", DataType::Int64, false),
            Field::new("label", DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![7, 7])),
                Arc::new(StringArray::from(vec!["expected", "actual"])),
            ],
        )
        .unwrap();
        let counts = extract_counts(&batch).unwrap();
        assert_eq!(counts.expected, 7);
        assert_eq!(counts.actual, 7);
    }
}
