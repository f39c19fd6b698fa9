//! Per-test cleanup stack.

use crate::error::ConformanceError;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

type CleanupAction = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), ConformanceError>> + Send>;

struct CleanupEntry {
    description: String,
    action: CleanupAction,
}

/// A cleanup that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    /// Description given at registration.
    pub description: String,
    /// Error or panic message.
    pub reason: String,
}

impl std::fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.description, self.reason)
    }
}

/// Deferred cleanup actions, run last-in first-out.
///
/// Clones share the same stack.
#[derive(Clone, Default)]
pub struct CleanupStack {
    entries: Arc<Mutex<Vec<CleanupEntry>>>,
}

impl CleanupStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action to run when the stack unwinds.
    pub fn register<F, Fut>(&self, description: impl Into<String>, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ConformanceError>> + Send + 'static,
    {
        let description = description.into();
        debug!(cleanup = %description, "Registered cleanup");
        self.entries.lock().push(CleanupEntry {
            description,
            action: Box::new(move || action().boxed()),
        });
    }

    /// Number of pending actions.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Run every pending action in reverse registration order.
    ///
    /// Each action runs even if earlier ones failed or panicked. Actions
    /// registered while unwinding run too.
    pub async fn unwind(&self) -> Vec<CleanupFailure> {
        let mut failures = Vec::new();

        loop {
            let entry = self.entries.lock().pop();
            let Some(entry) = entry else { break };

            let action = entry.action;
            let result = AssertUnwindSafe(async move { action().await })
                .catch_unwind()
                .await;

            let reason = match result {
                Ok(Ok(())) => {
                    debug!(cleanup = %entry.description, "Cleanup completed");
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("panicked: {}", super::panic_message(panic.as_ref())),
            };

            warn!(cleanup = %entry.description, reason = %reason, "Cleanup failed");
            failures.push(CleanupFailure {
                description: entry.description,
                reason,
            });
        }

        failures
    }
}

impl std::fmt::Debug for CleanupStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupStack")
            .field("pending", &self.len())
            .finish()
    }
}
