//! Declarative specifications consumed by test cases.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An expected schema for a test object.
///
/// Column order is not significant; columns are kept sorted by name so that
/// serialized specifications are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSpec {
    /// Expected columns, mapped from column name to datatype name
    pub columns: BTreeMap<String, String>,
    /// Declared primary key columns, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primary_keys: Vec<String>,
    /// Declared partition columns, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partition_columns: Vec<String>,
    /// Declared clustering columns, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clustering_columns: Vec<String>,
}

impl SchemaSpec {
    /// Creates an empty schema specification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column with the given datatype.
    pub fn with_column(mut self, name: impl Into<String>, dtype: impl Into<String>) -> Self {
        self.columns.insert(name.into(), dtype.into());
        self
    }

    /// Sets the primary key columns.
    pub fn with_primary_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the partition columns.
    pub fn with_partition_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partition_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the clustering columns.
    pub fn with_clustering_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clustering_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// The kind of a specification, used for required-spec declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecKind {
    /// A [`SchemaSpec`]
    Schema,
    /// A rowcount validation query
    RowcountSql,
    /// A data comparison query
    CompareSql,
}

impl fmt::Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Schema => "schema",
            Self::RowcountSql => "rowcount_sql",
            Self::CompareSql => "compare_sql",
        };
        write!(f, "{s}")
    }
}

/// A declarative expectation a test case validates against.
///
/// Specifications are produced by the external specification subsystem and
/// consumed read-only by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Specification {
    /// An expected schema
    Schema(SchemaSpec),
    /// A query yielding labeled `expected`/`actual` rowcounts
    RowcountSql {
        /// The rowcount query, possibly containing stage/instance placeholders
        query: String,
    },
    /// A query producing the expected result set for a data comparison
    CompareSql {
        /// The comparison query, possibly containing stage/instance placeholders
        query: String,
    },
}

impl Specification {
    /// Returns the kind of this specification.
    pub fn kind(&self) -> SpecKind {
        match self {
            Self::Schema(_) => SpecKind::Schema,
            Self::RowcountSql { .. } => SpecKind::RowcountSql,
            Self::CompareSql { .. } => SpecKind::CompareSql,
        }
    }

    /// Returns the schema spec if this is a schema specification.
    pub fn as_schema(&self) -> Option<&SchemaSpec> {
        match self {
            Self::Schema(schema) => Some(schema),
            _ => None,
        }
    }

    /// Returns the query if this is a SQL-bearing specification.
    pub fn query(&self) -> Option<&str> {
        match self {
            Self::RowcountSql { query } | Self::CompareSql { query } => Some(query),
            Self::Schema(_) => None,
        }
    }
}

/// Finds exactly one specification of the given kind in a slice.
///
/// Returns `None` when the kind is absent or occurs more than once; the
/// `specs_are_unique` precondition reports the ambiguous case to the user
/// before any test logic relies on this lookup.
pub fn find_unique_spec(specs: &[Specification], kind: SpecKind) -> Option<&Specification> {
    let mut found = None;
    for spec in specs.iter().filter(|s| s.kind() == kind) {
        if found.is_some() {
            return None;
        }
        found = Some(spec);
    }
    found
}
