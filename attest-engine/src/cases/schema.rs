//! Schema comparison test logic.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use tracing::instrument;

use crate::backend::harmonize::is_complex_dtype;
use crate::core::{find_unique_spec, SchemaSpec, SpecKind, TestResult, TestType};
use crate::error::{EngineError, Result};

use super::{TestCase, TestLogic};

const REQUIRED_SPECS: &[SpecKind] = &[SpecKind::Schema];
const PRECONDITIONS: &[&str] = &["specs_are_unique", "testobject_exists"];

/// Compares the backend-reported schema of a test object against a schema
/// specification.
///
/// The actual schema is harmonized into canonical datatype categories before
/// comparison. Column comparison is symmetric; partition columns, clustering
/// columns, and primary keys are compared only when the backend declares the
/// matching capability.
#[derive(Debug, Clone, Copy)]
pub struct SchemaLogic;

/// Outcome of one column's comparison.
#[derive(Debug, PartialEq)]
enum ColumnOutcome {
    Ok,
    /// Mismatch or missing/unexpected column
    Nok(&'static str),
    /// Datatype not compared (complex or not in the comparable list)
    DtypeSkipped,
}

fn compare_columns(
    expected: &SchemaSpec,
    actual: &SchemaSpec,
    comparable: impl Fn(&str) -> bool,
) -> (bool, BTreeMap<String, Value>) {
    let mut all_ok = true;
    let mut diff = BTreeMap::new();

    for (name, e_dtype) in &expected.columns {
        let outcome = match actual.columns.get(name) {
            None => ColumnOutcome::Nok("missing in testobject"),
            Some(a_dtype) => {
                if is_complex_dtype(e_dtype) || is_complex_dtype(a_dtype) {
                    ColumnOutcome::DtypeSkipped
                } else if e_dtype == a_dtype {
                    ColumnOutcome::Ok
                } else if comparable(e_dtype) {
                    ColumnOutcome::Nok("datatype mismatch")
                } else {
                    ColumnOutcome::DtypeSkipped
                }
            }
        };

        let (verdict, reason) = match outcome {
            ColumnOutcome::Ok => ("OK", None),
            ColumnOutcome::Nok(reason) => {
                all_ok = false;
                ("NOK", Some(reason))
            }
            ColumnOutcome::DtypeSkipped => ("SKIPPED", None),
        };
        diff.insert(
            name.clone(),
            json!({
                "expected_dtype": e_dtype,
                "actual_dtype": actual.columns.get(name),
                "outcome": verdict,
                "reason": reason,
            }),
        );
    }

    for (name, a_dtype) in &actual.columns {
        if expected.columns.contains_key(name) {
            continue;
        }
        all_ok = false;
        diff.insert(
            name.clone(),
            json!({
                "expected_dtype": Value::Null,
                "actual_dtype": a_dtype,
                "outcome": "NOK",
                "reason": "unexpected column",
            }),
        );
    }

    (all_ok, diff)
}

/// Unordered set comparison of declared columns (keys, partitions,
/// clusters).
fn compare_column_sets(expected: &[String], actual: &[String]) -> (bool, Value) {
    let e_set: BTreeSet<&String> = expected.iter().collect();
    let a_set: BTreeSet<&String> = actual.iter().collect();
    let missing: Vec<&&String> = e_set.difference(&a_set).collect();
    let unexpected: Vec<&&String> = a_set.difference(&e_set).collect();
    let ok = missing.is_empty() && unexpected.is_empty();
    (
        ok,
        json!({
            "expected": expected,
            "actual": actual,
            "missing": missing,
            "unexpected": unexpected,
        }),
    )
}

#[async_trait]
impl TestLogic for SchemaLogic {
    fn test_type(&self) -> TestType {
        TestType::Schema
    }

    fn required_specs(&self) -> &[SpecKind] {
        REQUIRED_SPECS
    }

    fn preconditions(&self) -> &[&'static str] {
        PRECONDITIONS
    }

    #[instrument(skip(self, case), fields(case = %case.id()))]
    async fn execute(&self, case: &mut TestCase) -> Result<TestResult> {
        let expected = find_unique_spec(&case.definition().specs, SpecKind::Schema)
            .and_then(|s| s.as_schema())
            .cloned()
            .ok_or_else(|| EngineError::specification_defect("no unique schema specification"))?;

        let backend = case.backend_handle();
        let testobject = case.definition().testobject.clone();
        let config = case.definition().domain_config.clone();

        let reported = backend.get_schema(&testobject).await?;
        let actual = backend.harmonize_schema(&reported);

        let mut attempted: Vec<(&str, bool)> = Vec::new();

        let (columns_ok, column_diff) =
            compare_columns(&expected, &actual, |dtype| config.is_comparable_datatype(dtype));
        attempted.push(("columns", columns_ok));
        case.set_diff("column_diff", json!(column_diff));
        case.add_fact("expected_columns", json!(expected.columns.len()));
        case.add_fact("actual_columns", json!(actual.columns.len()));

        if backend.supports_primary_keys() {
            let (ok, diff) = compare_column_sets(&expected.primary_keys, &actual.primary_keys);
            attempted.push(("primary keys", ok));
            case.set_diff("primary_key_diff", diff);
        }
        if backend.supports_partitions() {
            let (ok, diff) =
                compare_column_sets(&expected.partition_columns, &actual.partition_columns);
            attempted.push(("partition columns", ok));
            case.set_diff("partition_column_diff", diff);
        }
        if backend.supports_clustering() {
            let (ok, diff) =
                compare_column_sets(&expected.clustering_columns, &actual.clustering_columns);
            attempted.push(("clustering columns", ok));
            case.set_diff("clustering_column_diff", diff);
        }

        let failed: Vec<&str> = attempted
            .iter()
            .filter(|(_, ok)| !ok)
            .map(|(part, _)| *part)
            .collect();

        if failed.is_empty() {
            case.set_summary(format!(
                "Schema matches specification ({}).",
                attempted
                    .iter()
                    .map(|(part, _)| *part)
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            Ok(TestResult::Passed)
        } else {
            case.set_summary(format!(
                "Schema deviates from specification: {} do not match.",
                failed.join(", ")
            ));
            Ok(TestResult::Failed)
        }
    }
}
