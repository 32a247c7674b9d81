//! In-memory reference backend built on DataFusion.
//!
//! This backend registers Arrow record batches as DataFusion `MemTable`s and
//! answers every port operation with SQL against the session context. It is
//! the backend used by the engine's own tests and is useful for local runs
//! against file-based data; warehouse backends live outside this crate.
//!
//! The in-memory catalog is flat: object names are table names, and the
//! domain/stage/instance coordinates of a [`TestObject`] are ignored for
//! lookup. [`translate_query`](MemoryBackend::translate_query) still
//! substitutes `{STAGE}` and `{INSTANCE}` placeholders so that queries
//! written for environment-switching platforms run unchanged.

use arrow::array::Array;
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use rand::seq::index::sample;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, instrument};

use crate::core::{SchemaSpec, TestObject};
use crate::error::{EngineError, Result};

use super::{Backend, KEY_SEPARATOR};

/// Declared physical layout of a registered object.
///
/// The in-memory platform has no real partitioning; the layout is what the
/// schema test compares against when the matching capability is enabled.
#[derive(Debug, Clone, Default)]
pub struct ObjectLayout {
    /// Declared primary key columns
    pub primary_keys: Vec<String>,
    /// Declared partition columns
    pub partition_columns: Vec<String>,
    /// Declared clustering columns
    pub clustering_columns: Vec<String>,
}

/// A [`Backend`] over an in-process DataFusion session.
pub struct MemoryBackend {
    ctx: SessionContext,
    layouts: RwLock<HashMap<String, ObjectLayout>>,
    supports_primary_keys: bool,
    supports_partitions: bool,
    supports_clustering: bool,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("layouts", &self.layouts)
            .field("supports_primary_keys", &self.supports_primary_keys)
            .field("supports_partitions", &self.supports_partitions)
            .field("supports_clustering", &self.supports_clustering)
            .finish_non_exhaustive()
    }
}

impl MemoryBackend {
    /// Creates an empty backend with no layout capabilities.
    pub fn new() -> Self {
        Self {
            ctx: SessionContext::new(),
            layouts: RwLock::new(HashMap::new()),
            supports_primary_keys: false,
            supports_partitions: false,
            supports_clustering: false,
        }
    }

    /// Enables reporting of declared primary keys.
    pub fn with_primary_key_support(mut self) -> Self {
        self.supports_primary_keys = true;
        self
    }

    /// Enables reporting of partition columns.
    pub fn with_partition_support(mut self) -> Self {
        self.supports_partitions = true;
        self
    }

    /// Enables reporting of clustering columns.
    pub fn with_clustering_support(mut self) -> Self {
        self.supports_clustering = true;
        self
    }

    /// Registers record batches under the given object name.
    pub fn register_batches(&self, name: &str, batches: Vec<RecordBatch>) -> Result<()> {
        self.register_object(name, batches, ObjectLayout::default())
    }

    /// Registers record batches together with a declared layout.
    pub fn register_object(
        &self,
        name: &str,
        batches: Vec<RecordBatch>,
        layout: ObjectLayout,
    ) -> Result<()> {
        let schema = batches
            .first()
            .map(|b| b.schema())
            .ok_or_else(|| EngineError::backend("cannot register an object without batches"))?;
        let table = MemTable::try_new(schema, vec![batches])?;
        let _previous = self.ctx.register_table(name, Arc::new(table))?;
        self.layouts
            .write()
            .map_err(|_| EngineError::Internal("layout registry lock poisoned".to_string()))?
            .insert(name.to_string(), layout);
        Ok(())
    }

    /// Returns the underlying session context, e.g. for registering file
    /// sources directly.
    pub fn session(&self) -> &SessionContext {
        &self.ctx
    }

    fn layout_for(&self, name: &str) -> Result<ObjectLayout> {
        Ok(self
            .layouts
            .read()
            .map_err(|_| EngineError::Internal("layout registry lock poisoned".to_string()))?
            .get(name)
            .cloned()
            .unwrap_or_default())
    }

    /// SQL expression building the concatenation key over primary-key
    /// columns, cast to a common string representation.
    fn key_expression(primary_keys: &[String]) -> String {
        let casts: Vec<String> = primary_keys
            .iter()
            .map(|k| format!("CAST({} AS VARCHAR)", quote_ident(k)))
            .collect();
        format!("concat_ws('{}', {})", KEY_SEPARATOR, casts.join(", "))
    }

    fn projection(columns: Option<&[String]>) -> String {
        match columns {
            Some(cols) if !cols.is_empty() => cols
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", "),
            _ => "*".to_string(),
        }
    }

    fn key_predicate(primary_keys: &[String], key_sample: &[String]) -> String {
        if key_sample.is_empty() {
            return "false".to_string();
        }
        let quoted: Vec<String> = key_sample.iter().map(|k| quote_literal(k)).collect();
        format!(
            "{} IN ({})",
            Self::key_expression(primary_keys),
            quoted.join(", ")
        )
    }

    async fn collect_one_batch(&self, sql: &str) -> Result<RecordBatch> {
        let df = self.ctx.sql(sql).await?;
        let logical_schema = df.schema().inner().clone();
        let batches = df.collect().await?;
        match batches.first() {
            // Concatenate under the physical schema; the logical one can
            // disagree on nullability metadata.
            Some(first) => Ok(concat_batches(&first.schema(), &batches)?),
            None => Ok(RecordBatch::new_empty(logical_schema)),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Quotes an identifier for use in generated SQL.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes a string literal for use in generated SQL.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get_testobjects(
        &self,
        _domain: &str,
        _stage: &str,
        _instance: &str,
    ) -> Result<Vec<String>> {
        let catalog = self
            .ctx
            .catalog("datafusion")
            .ok_or_else(|| EngineError::Internal("default catalog missing".to_string()))?;
        let schema = catalog
            .schema("public")
            .ok_or_else(|| EngineError::Internal("default schema missing".to_string()))?;
        let mut names = schema.table_names();
        names.sort();
        Ok(names)
    }

    #[instrument(skip(self), fields(testobject = %testobject))]
    async fn get_schema(&self, testobject: &TestObject) -> Result<SchemaSpec> {
        let df = self.ctx.table(testobject.name.as_str()).await?;
        let schema = df.schema().inner().clone();
        let layout = self.layout_for(&testobject.name)?;

        let mut spec = SchemaSpec::new();
        for field in schema.fields() {
            spec.columns
                .insert(field.name().clone(), field.data_type().to_string());
        }
        spec.primary_keys = layout.primary_keys;
        spec.partition_columns = layout.partition_columns;
        spec.clustering_columns = layout.clustering_columns;
        Ok(spec)
    }

    async fn get_rowcount(&self, testobject: &TestObject, filter: Option<&str>) -> Result<u64> {
        let mut sql = format!(
            "SELECT COUNT(*) AS cnt FROM {}",
            quote_ident(&testobject.name)
        );
        if let Some(filter) = filter {
            sql.push_str(&format!(" WHERE {filter}"));
        }
        let batch = self.collect_one_batch(&sql).await?;
        let counts = batch
            .column(0)
            .as_any()
            .downcast_ref::<arrow::array::Int64Array>()
            .ok_or_else(|| EngineError::Internal("rowcount column is not Int64".to_string()))?;
        Ok(counts.value(0) as u64)
    }

    fn translate_query(&self, query: &str, testobject: &TestObject) -> Result<String> {
        Ok(query
            .replace("{STAGE}", &testobject.stage)
            .replace("{INSTANCE}", &testobject.instance))
    }

    #[instrument(skip(self, query))]
    async fn run_query(&self, query: &str) -> Result<RecordBatch> {
        self.collect_one_batch(query).await
    }

    async fn get_sample_keys(
        &self,
        query: &str,
        primary_keys: &[String],
        sample_size: usize,
    ) -> Result<Vec<String>> {
        if primary_keys.is_empty() {
            return Err(EngineError::backend(
                "cannot sample keys without primary key columns",
            ));
        }
        let sql = format!(
            "SELECT DISTINCT {} AS sample_key FROM ({}) AS q ORDER BY sample_key",
            Self::key_expression(primary_keys),
            query
        );
        let batch = self.collect_one_batch(&sql).await?;
        let keys = batch
            .column(0)
            .as_any()
            .downcast_ref::<arrow::array::StringArray>()
            .ok_or_else(|| EngineError::Internal("sample key column is not Utf8".to_string()))?;

        let population: Vec<String> = (0..keys.len()).map(|i| keys.value(i).to_string()).collect();
        debug!(
            population = population.len(),
            sample_size, "sampling concatenation keys"
        );

        if population.len() <= sample_size {
            return Ok(population);
        }
        let mut rng = rand::rng();
        let mut sampled: Vec<String> = sample(&mut rng, population.len(), sample_size)
            .into_iter()
            .map(|i| population[i].clone())
            .collect();
        sampled.sort();
        Ok(sampled)
    }

    async fn get_sample_from_query(
        &self,
        query: &str,
        primary_keys: &[String],
        key_sample: &[String],
        columns: Option<&[String]>,
    ) -> Result<RecordBatch> {
        let sql = format!(
            "SELECT {} FROM ({}) AS q WHERE {}",
            Self::projection(columns),
            query,
            Self::key_predicate(primary_keys, key_sample)
        );
        self.collect_one_batch(&sql).await
    }

    async fn get_sample_from_testobject(
        &self,
        testobject: &TestObject,
        primary_keys: &[String],
        key_sample: &[String],
        columns: Option<&[String]>,
    ) -> Result<RecordBatch> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {}",
            Self::projection(columns),
            quote_ident(&testobject.name),
            Self::key_predicate(primary_keys, key_sample)
        );
        self.collect_one_batch(&sql).await
    }

    fn supports_clustering(&self) -> bool {
        self.supports_clustering
    }

    fn supports_partitions(&self) -> bool {
        self.supports_partitions
    }

    fn supports_primary_keys(&self) -> bool {
        self.supports_primary_keys
    }
}
