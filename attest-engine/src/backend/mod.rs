//! The data-platform backend port.
//!
//! The engine never talks to storage directly; every platform operation goes
//! through the [`Backend`] trait. Concrete warehouse backends live outside
//! the engine; this crate ships one reference implementation,
//! [`MemoryBackend`], built on DataFusion for tests and local runs.
//!
//! Capability flags let test logic skip sub-comparisons a platform cannot
//! answer (partitioning, clustering, declared primary keys) instead of
//! failing them.

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;

use crate::core::{SchemaSpec, TestObject};
use crate::error::Result;

pub mod harmonize;
pub mod memory;

pub use harmonize::{harmonize_dtype, is_complex_dtype};
pub use memory::MemoryBackend;

/// Separator used when building concatenation keys from primary-key values.
pub const KEY_SEPARATOR: &str = "|";

/// Port to one data platform.
///
/// Implementations must be safe for reentrant use: the engine shares one
/// backend across all test cases of a run.
#[async_trait]
pub trait Backend: std::fmt::Debug + Send + Sync {
    /// Lists the names of the data objects visible in the given database
    /// coordinates.
    async fn get_testobjects(
        &self,
        domain: &str,
        stage: &str,
        instance: &str,
    ) -> Result<Vec<String>>;

    /// Reads the platform schema of a test object.
    ///
    /// The returned datatypes are platform-native; callers pass them through
    /// [`harmonize_schema`](Backend::harmonize_schema) before comparing.
    async fn get_schema(&self, testobject: &TestObject) -> Result<SchemaSpec>;

    /// Collapses platform-specific datatype names into the canonical
    /// categories (`int`, `float`, `decimal`, `date`, `timestamp`, `string`).
    ///
    /// Complex types (array, struct, map) pass through unchanged. The
    /// mapping is stable under repeated application.
    fn harmonize_schema(&self, schema: &SchemaSpec) -> SchemaSpec {
        let mut harmonized = schema.clone();
        harmonized.columns = schema
            .columns
            .iter()
            .map(|(name, dtype)| (name.clone(), harmonize_dtype(dtype)))
            .collect();
        harmonized
    }

    /// Counts the rows of a test object, optionally restricted by a filter
    /// expression.
    async fn get_rowcount(&self, testobject: &TestObject, filter: Option<&str>) -> Result<u64>;

    /// Translates a user query to the target environment of the given test
    /// object (stage/instance substitution).
    fn translate_query(&self, query: &str, testobject: &TestObject) -> Result<String>;

    /// Executes a query and returns the full result as one record batch.
    async fn run_query(&self, query: &str) -> Result<RecordBatch>;

    /// Draws a bounded random sample of distinct concatenation-key values
    /// from the query's result.
    ///
    /// Must return exactly `sample_size` distinct keys whenever the
    /// underlying population holds at least that many; fewer only when the
    /// population itself is smaller.
    async fn get_sample_keys(
        &self,
        query: &str,
        primary_keys: &[String],
        sample_size: usize,
    ) -> Result<Vec<String>>;

    /// Fetches the query rows whose concatenation key is in the sampled set,
    /// projected to the given columns (all columns when `None`).
    async fn get_sample_from_query(
        &self,
        query: &str,
        primary_keys: &[String],
        key_sample: &[String],
        columns: Option<&[String]>,
    ) -> Result<RecordBatch>;

    /// Fetches the test object rows whose concatenation key is in the
    /// sampled set, projected to the given columns (all columns when
    /// `None`).
    async fn get_sample_from_testobject(
        &self,
        testobject: &TestObject,
        primary_keys: &[String],
        key_sample: &[String],
        columns: Option<&[String]>,
    ) -> Result<RecordBatch>;

    /// Whether the platform can execute a full comparison natively.
    fn supports_db_comparison(&self) -> bool {
        false
    }

    /// Whether the platform reports clustering columns.
    fn supports_clustering(&self) -> bool {
        false
    }

    /// Whether the platform reports partition columns.
    fn supports_partitions(&self) -> bool {
        false
    }

    /// Whether the platform reports declared primary keys.
    fn supports_primary_keys(&self) -> bool {
        false
    }
}
