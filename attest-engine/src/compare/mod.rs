//! Cross-source sampled diff engine.
//!
//! Compares two record batches holding the same sampled rows from two
//! sources (a test query and a test object). Schemas are aligned first
//! (typed casting where possible, string representation as the universal
//! fallback), then every row gets an order-independent structural hash and
//! the diff is the symmetric difference of the two hash sets.
//!
//! The materialized diff is truncated to a bounded preview; the size of the
//! untruncated diff decides pass/fail in the compare test logic.

use arrow::array::ArrayRef;
use arrow::compute::{can_cast_types, cast};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::error::{EngineError, Result};

/// Maximum number of rows materialized in a diff preview.
pub const DIFF_PREVIEW_LIMIT: usize = 500;

/// Source tag for rows present in the expected sample but missing from the
/// test object.
pub const SOURCE_TESTOBJECT: &str = "testobject";

/// Source tag for rows present in the test object but missing from the
/// expected sample.
pub const SOURCE_TESTQUERY: &str = "testquery";

/// One differing row in a sample diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRow {
    /// Which side the discrepancy is attributed to
    pub source: String,
    /// Structural hash of the row over all compared columns
    pub row_hash: String,
    /// Rendered column values of the row
    pub values: BTreeMap<String, String>,
}

/// The outcome of diffing two aligned samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleDiff {
    /// Size of the untruncated symmetric difference
    pub total: usize,
    /// Differing rows, sorted by row hash then source, truncated to the
    /// preview limit
    pub rows: Vec<DiffRow>,
    /// True when `rows` holds fewer entries than `total`
    pub truncated: bool,
    /// Columns that fell back to string representation during alignment
    pub string_aligned_columns: Vec<String>,
}

impl SampleDiff {
    /// Returns true when both samples held the same rows.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Columns of one batch keyed by name.
fn column_map(batch: &RecordBatch) -> BTreeMap<String, ArrayRef> {
    batch
        .schema()
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| (field.name().clone(), batch.column(i).clone()))
        .collect()
}

/// Aligned column sets of the two sides, in column-name order.
struct AlignedColumns {
    names: Vec<String>,
    expected: Vec<ArrayRef>,
    actual: Vec<ArrayRef>,
    string_aligned: Vec<String>,
}

/// Aligns the schemas of two batches column by column.
///
/// When dtypes differ, the actual side is cast to the expected dtype if
/// Arrow can do so; otherwise both sides are cast to their string
/// representation, the universal comparable type.
fn align_columns(expected: &RecordBatch, actual: &RecordBatch) -> Result<AlignedColumns> {
    let expected_cols = column_map(expected);
    let actual_cols = column_map(actual);

    let missing: Vec<&String> = expected_cols
        .keys()
        .filter(|k| !actual_cols.contains_key(*k))
        .chain(actual_cols.keys().filter(|k| !expected_cols.contains_key(*k)))
        .collect();
    if !missing.is_empty() {
        return Err(EngineError::Internal(format!(
            "compared samples have asymmetric columns: {missing:?}"
        )));
    }

    let mut aligned = AlignedColumns {
        names: Vec::new(),
        expected: Vec::new(),
        actual: Vec::new(),
        string_aligned: Vec::new(),
    };

    for (name, e_col) in &expected_cols {
        let a_col = &actual_cols[name];
        let (e_col, a_col) = if e_col.data_type() == a_col.data_type() {
            (e_col.clone(), a_col.clone())
        } else if can_cast_types(a_col.data_type(), e_col.data_type()) {
            (e_col.clone(), cast(a_col, e_col.data_type())?)
        } else {
            aligned.string_aligned.push(name.clone());
            (cast(e_col, &DataType::Utf8)?, cast(a_col, &DataType::Utf8)?)
        };
        aligned.names.push(name.clone());
        aligned.expected.push(e_col);
        aligned.actual.push(a_col);
    }

    Ok(aligned)
}

/// Renders one cell to its canonical string form.
fn canonical_value(column: &ArrayRef, row: usize) -> Result<String> {
    if column.is_null(row) {
        return Ok("NULL".to_string());
    }
    Ok(array_value_to_string(column.as_ref(), row)?)
}

/// Computes the structural hash of one row.
///
/// The hash covers every compared column; columns are visited in name order,
/// so the hash does not depend on the physical column order of either side.
fn row_hash(names: &[String], columns: &[ArrayRef], row: usize) -> Result<String> {
    let mut hasher = Sha256::new();
    for (name, column) in names.iter().zip(columns) {
        hasher.update(name.as_bytes());
        hasher.update([0x1f]);
        hasher.update(canonical_value(column, row)?.as_bytes());
        hasher.update([0x1e]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn rendered_row(
    names: &[String],
    columns: &[ArrayRef],
    row: usize,
) -> Result<BTreeMap<String, String>> {
    names
        .iter()
        .zip(columns)
        .map(|(name, column)| Ok((name.clone(), canonical_value(column, row)?)))
        .collect()
}

/// Rows of one side that are absent from the other, identified by hash.
fn one_sided_rows(
    names: &[String],
    columns: &[ArrayRef],
    row_count: usize,
    other_hashes: &HashSet<String>,
    source: &str,
) -> Result<Vec<DiffRow>> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for row in 0..row_count {
        let hash = row_hash(names, columns, row)?;
        if other_hashes.contains(&hash) || !seen.insert(hash.clone()) {
            continue;
        }
        rows.push(DiffRow {
            source: source.to_string(),
            row_hash: hash,
            values: rendered_row(names, columns, row)?,
        });
    }
    Ok(rows)
}

fn hash_set(names: &[String], columns: &[ArrayRef], row_count: usize) -> Result<HashSet<String>> {
    let mut hashes = HashSet::with_capacity(row_count);
    for row in 0..row_count {
        hashes.insert(row_hash(names, columns, row)?);
    }
    Ok(hashes)
}

/// Diffs two sampled record batches.
///
/// Returns the symmetric difference: rows present in `expected` but not in
/// `actual` tagged [`SOURCE_TESTOBJECT`], rows present in `actual` but not
/// in `expected` tagged [`SOURCE_TESTQUERY`]. The output is sorted by row
/// hash then source and truncated to `preview_limit` rows; `total` always
/// reflects the untruncated size.
pub fn diff_batches(
    expected: &RecordBatch,
    actual: &RecordBatch,
    preview_limit: usize,
) -> Result<SampleDiff> {
    let aligned = align_columns(expected, actual)?;

    let expected_hashes = hash_set(&aligned.names, &aligned.expected, expected.num_rows())?;
    let actual_hashes = hash_set(&aligned.names, &aligned.actual, actual.num_rows())?;

    let mut rows = one_sided_rows(
        &aligned.names,
        &aligned.expected,
        expected.num_rows(),
        &actual_hashes,
        SOURCE_TESTOBJECT,
    )?;
    rows.extend(one_sided_rows(
        &aligned.names,
        &aligned.actual,
        actual.num_rows(),
        &expected_hashes,
        SOURCE_TESTQUERY,
    )?);

    rows.sort_by(|a, b| {
        a.row_hash
            .cmp(&b.row_hash)
            .then_with(|| a.source.cmp(&b.source))
    });

    let total = rows.len();
    let truncated = total > preview_limit;
    rows.truncate(preview_limit);

    debug!(
        total,
        truncated,
        string_aligned = aligned.string_aligned.len(),
        "sample diff computed"
    );

    Ok(SampleDiff {
        total,
        rows,
        truncated,
        string_aligned_columns: aligned.string_aligned,
    })
}
