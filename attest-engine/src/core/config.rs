//! Per-domain tuning configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Execution strategy for data comparison tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareStrategy {
    /// Sample keys, fetch both sides into the engine, diff locally
    #[default]
    Sampled,
    /// Push the comparison down into the backend. Not implemented; selecting
    /// it fails the case rather than silently falling back to sampling.
    BackendNative,
}

/// Per-business-domain settings that parameterize test execution.
///
/// Consumed read-only by test cases. The config is carried on every
/// [`TestDefinition`](super::TestDefinition) so that a run can mix
/// definitions from differently tuned domains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Default number of distinct key values sampled per comparison
    pub sample_size: usize,
    /// Per-object sample size overrides, keyed by testobject name
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub sample_size_per_object: HashMap<String, usize>,
    /// Canonical datatype names whose mismatches are flagged in schema
    /// comparisons; expected datatypes outside this list are not compared
    pub comparable_datatypes: Vec<String>,
    /// Execution strategy for data comparison tests
    #[serde(default)]
    pub compare_strategy: CompareStrategy,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            sample_size_per_object: HashMap::new(),
            comparable_datatypes: vec![
                "int".to_string(),
                "float".to_string(),
                "decimal".to_string(),
                "date".to_string(),
                "timestamp".to_string(),
                "string".to_string(),
            ],
            compare_strategy: CompareStrategy::default(),
        }
    }
}

impl DomainConfig {
    /// Creates a config with the engine defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default sample size.
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size;
        self
    }

    /// Adds a per-object sample size override.
    pub fn with_sample_size_for(mut self, object_name: impl Into<String>, size: usize) -> Self {
        self.sample_size_per_object.insert(object_name.into(), size);
        self
    }

    /// Replaces the comparable-datatypes list.
    pub fn with_comparable_datatypes<I, S>(mut self, datatypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.comparable_datatypes = datatypes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the comparison execution strategy.
    pub fn with_compare_strategy(mut self, strategy: CompareStrategy) -> Self {
        self.compare_strategy = strategy;
        self
    }

    /// Resolves the sample size for the given testobject name.
    pub fn sample_size_for(&self, object_name: &str) -> usize {
        self.sample_size_per_object
            .get(object_name)
            .copied()
            .unwrap_or(self.sample_size)
    }

    /// Returns true if mismatches on the given expected datatype are flagged
    /// in schema comparisons.
    pub fn is_comparable_datatype(&self, dtype: &str) -> bool {
        self.comparable_datatypes.iter().any(|d| d == dtype)
    }
}
