//! Sampled data comparison test logic.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use crate::compare::{diff_batches, DIFF_PREVIEW_LIMIT};
use crate::core::{find_unique_spec, CompareStrategy, SpecKind, TestResult, TestType};
use crate::error::{EngineError, Result};

use super::{TestCase, TestLogic};

const REQUIRED_SPECS: &[SpecKind] = &[SpecKind::CompareSql, SpecKind::Schema];
const PRECONDITIONS: &[&str] = &[
    "specs_are_unique",
    "testobject_exists",
    "testobject_not_empty",
    "primary_keys_are_specified",
];

/// Compares sampled rows of a test query against the test object.
///
/// Draws a bounded random sample of distinct concatenation-key values from
/// the query, fetches both sides restricted to the sampled keys and the
/// specified column projection, and diffs them structurally. The verdict is
/// decided by the untruncated diff size; only the bounded preview is
/// attached to the result.
#[derive(Debug, Clone, Copy)]
pub struct CompareLogic;

#[async_trait]
impl TestLogic for CompareLogic {
    fn test_type(&self) -> TestType {
        TestType::Compare
    }

    fn required_specs(&self) -> &[SpecKind] {
        REQUIRED_SPECS
    }

    fn preconditions(&self) -> &[&'static str] {
        PRECONDITIONS
    }

    #[instrument(skip(self, case), fields(case = %case.id()))]
    async fn execute(&self, case: &mut TestCase) -> Result<TestResult> {
        let config = case.definition().domain_config.clone();
        if config.compare_strategy == CompareStrategy::BackendNative {
            // Fail loudly instead of silently falling back to sampling.
            return Err(EngineError::NotSupported(
                "backend-native comparison is not implemented; use the sampled strategy"
                    .to_string(),
            ));
        }

        let schema = find_unique_spec(&case.definition().specs, SpecKind::Schema)
            .and_then(|s| s.as_schema())
            .cloned()
            .ok_or_else(|| EngineError::specification_defect("no unique schema specification"))?;
        let query = find_unique_spec(&case.definition().specs, SpecKind::CompareSql)
            .and_then(|s| s.query())
            .map(str::to_string)
            .ok_or_else(|| {
                EngineError::specification_defect("no unique compare_sql specification")
            })?;

        let testobject = case.definition().testobject.clone();
        let primary_keys = schema.primary_keys.clone();
        // The specified schema is the contract for both sides: its columns
        // are the compared projection.
        let columns: Vec<String> = schema.columns.keys().cloned().collect();
        let sample_size = config.sample_size_for(&testobject.name);

        let backend = case.backend_handle();
        let translated = backend.translate_query(&query, &testobject)?;
        let keys = backend
            .get_sample_keys(&translated, &primary_keys, sample_size)
            .await?;
        debug!(case = %case.id(), requested = sample_size, sampled = keys.len(), "key sample drawn");

        case.add_fact("sample_size", json!(sample_size));
        case.add_fact("sampled_keys", json!(keys.len()));

        let expected = backend
            .get_sample_from_query(&translated, &primary_keys, &keys, Some(&columns))
            .await?;
        let actual = backend
            .get_sample_from_testobject(&testobject, &primary_keys, &keys, Some(&columns))
            .await?;

        let diff = diff_batches(&expected, &actual, DIFF_PREVIEW_LIMIT)?;
        if !diff.string_aligned_columns.is_empty() {
            // String-aligned columns can mask type-semantic differences;
            // surface them for the report layer.
            case.add_detail(
                "string_aligned_columns",
                json!(diff.string_aligned_columns),
            );
        }
        case.set_diff("compare_diff", serde_json::to_value(&diff)?);

        if diff.is_empty() {
            case.set_summary(format!(
                "Sample comparison passed over {} sampled key(s).",
                keys.len()
            ));
            Ok(TestResult::Passed)
        } else {
            case.set_summary(format!(
                "{} sample row(s) differ between testquery and testobject.",
                diff.total
            ));
            Ok(TestResult::Failed)
        }
    }
}
