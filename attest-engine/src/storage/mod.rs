//! Storage port for test run persistence.
//!
//! The engine persists the full run snapshot at run creation, after every
//! completed case, and at completion. Each write is a full overwrite of the
//! previous snapshot, which keeps crash recovery trivial for storage
//! implementations.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::core::TestRunResult;
use crate::error::{EngineError, Result};

/// Persistence port for test run snapshots.
#[async_trait]
pub trait RunStorage: std::fmt::Debug + Send + Sync {
    /// Persists a snapshot, overwriting any previous snapshot of the same
    /// run.
    async fn write(&self, snapshot: &TestRunResult) -> Result<()>;

    /// Reads the latest snapshot of a run.
    async fn read(&self, testrun_id: &str) -> Result<TestRunResult>;
}

/// In-memory implementation of [`RunStorage`] for tests and development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRunStorage {
    runs: Arc<RwLock<HashMap<String, TestRunResult>>>,
}

impl InMemoryRunStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored run snapshots.
    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    /// Returns true if no snapshot is stored.
    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

#[async_trait]
impl RunStorage for InMemoryRunStorage {
    #[instrument(skip(self, snapshot), fields(testrun_id = %snapshot.testrun_id))]
    async fn write(&self, snapshot: &TestRunResult) -> Result<()> {
        self.runs
            .write()
            .await
            .insert(snapshot.testrun_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn read(&self, testrun_id: &str) -> Result<TestRunResult> {
        self.runs
            .read()
            .await
            .get(testrun_id)
            .cloned()
            .ok_or_else(|| EngineError::Storage(format!("no snapshot for run '{testrun_id}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RunStatus, TestResult};
    use chrono::Utc;

    fn snapshot(id: &str, status: RunStatus) -> TestRunResult {
        TestRunResult {
            testrun_id: id.to_string(),
            status,
            result: TestResult::NotAssessed,
            testcase_results: Vec::new(),
            start_ts: Utc::now(),
            end_ts: None,
        }
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let storage = InMemoryRunStorage::new();
        storage
            .write(&snapshot("run-1", RunStatus::InProgress))
            .await
            .unwrap();

        let read = storage.read("run-1").await.unwrap();
        assert_eq!(read.testrun_id, "run-1");
        assert_eq!(read.status, RunStatus::InProgress);
    }

    #[tokio::test]
    async fn test_write_overwrites_previous_snapshot() {
        let storage = InMemoryRunStorage::new();
        storage
            .write(&snapshot("run-1", RunStatus::InProgress))
            .await
            .unwrap();
        storage
            .write(&snapshot("run-1", RunStatus::Finished))
            .await
            .unwrap();

        assert_eq!(storage.len().await, 1);
        let read = storage.read("run-1").await.unwrap();
        assert_eq!(read.status, RunStatus::Finished);
    }

    #[tokio::test]
    async fn test_read_missing_run_fails() {
        let storage = InMemoryRunStorage::new();
        let err = storage.read("missing").await.unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));
    }
}
