//! Notification port for human-readable progress messages.
//!
//! Notifiers have no control-flow influence: the engine fires a message for
//! every phase transition and precondition evaluation and moves on. Several
//! notifiers can be registered; a failure in one never blocks the others.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::error::Result;

/// Receiver of progress messages.
#[async_trait]
pub trait Notifier: std::fmt::Debug + Send + Sync {
    /// Delivers one message. Errors are logged by the caller and otherwise
    /// ignored.
    async fn notify(&self, message: &str) -> Result<()>;
}

/// A fan-out set of notifiers.
#[derive(Debug, Clone, Default)]
pub struct NotifierSet {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotifierSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a notifier.
    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Delivers a message to every registered notifier.
    ///
    /// All deliveries run concurrently; individual failures are logged and
    /// swallowed so one broken notifier cannot block the rest.
    pub async fn notify(&self, message: &str) {
        let deliveries = self.notifiers.iter().map(|n| n.notify(message));
        for outcome in join_all(deliveries).await {
            if let Err(e) = outcome {
                warn!(error = %e, "notifier delivery failed");
            }
        }
    }
}

/// Notifier that forwards messages to the `tracing` pipeline.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    /// Creates a new tracing notifier.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        info!(target: "attest_engine::notify", "{message}");
        Ok(())
    }
}

/// Notifier that collects messages in memory, for tests and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct CollectingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CollectingNotifier {
    /// Creates a new collecting notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the collected messages.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for CollectingNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        self.messages
            .lock()
            .map_err(|_| crate::error::EngineError::Internal("notifier lock poisoned".to_string()))?
            .push(message.to_string());
        Ok(())
    }
}
