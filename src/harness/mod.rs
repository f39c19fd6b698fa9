//! Conformance test harness.
//!
//! A suite is a named set of tests over one interface mode. Each test runs
//! through [`run_case`], which gives it a fresh [`TestContext`], catches
//! panics, and always unwinds the context's cleanup stack afterwards.

pub mod assertions;
mod cleanup;

pub use assertions::AssertionError;
pub use cleanup::{CleanupFailure, CleanupStack};

use crate::error::ConformanceError;
use crate::types::Format;
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

/// Why a test body stopped early.
#[derive(Debug, Error)]
pub enum TestError {
    /// An expectation did not hold.
    #[error("Assertion failed: {0}")]
    Assertion(#[from] AssertionError),

    /// A client call failed.
    #[error("{0}")]
    Service(#[from] ConformanceError),

    /// The test cannot run in this environment.
    #[error("Skipped: {reason}")]
    Skip {
        /// Why the test was skipped.
        reason: String,
    },

    /// The suite has no test with this name.
    #[error("Unknown test '{name}'")]
    UnknownTest {
        /// The requested name.
        name: String,
    },
}

/// Result type of test bodies.
pub type TestResult<T = ()> = std::result::Result<T, TestError>;

/// Outcome of one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    /// The body and every cleanup succeeded.
    Passed,
    /// The body or a cleanup failed.
    Failed {
        /// Failure description.
        reason: String,
    },
    /// The test did not run.
    Skipped {
        /// Why the test was skipped.
        reason: String,
    },
}

impl TestOutcome {
    /// Short label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            TestOutcome::Passed => "PASS",
            TestOutcome::Failed { .. } => "FAIL",
            TestOutcome::Skipped { .. } => "SKIP",
        }
    }
}

/// Report line for one test.
#[derive(Debug, Clone)]
pub struct CaseReport {
    /// Test name.
    pub name: String,
    /// Outcome.
    pub outcome: TestOutcome,
    /// Wall time including cleanups.
    pub duration: Duration,
}

/// Report for one suite run in one interface mode.
#[derive(Debug, Clone)]
pub struct SuiteReport {
    /// Suite name.
    pub suite: String,
    /// Interface mode.
    pub format: Format,
    /// Per-test results in execution order.
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    fn count(&self, pred: impl Fn(&TestOutcome) -> bool) -> usize {
        self.cases.iter().filter(|c| pred(&c.outcome)).count()
    }

    /// Number of passed tests.
    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, TestOutcome::Passed))
    }

    /// Number of failed tests.
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TestOutcome::Failed { .. }))
    }

    /// Number of skipped tests.
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, TestOutcome::Skipped { .. }))
    }

    /// Returns true if nothing failed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Result for the named test.
    pub fn case(&self, name: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|c| c.name == name)
    }
}

/// Per-test state handed to test bodies.
#[derive(Debug, Clone, Default)]
pub struct TestContext {
    cleanups: CleanupStack,
}

impl TestContext {
    /// Create a context with an empty cleanup stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cleanup to run after the test body, whatever its outcome.
    pub fn add_cleanup<F, Fut>(&self, description: impl Into<String>, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ConformanceError>> + Send + 'static,
    {
        self.cleanups.register(description, action);
    }

    /// The cleanup stack.
    pub fn cleanups(&self) -> &CleanupStack {
        &self.cleanups
    }
}

/// A group of conformance tests.
#[async_trait]
pub trait ConformanceSuite: Send + Sync {
    /// Suite name.
    fn name(&self) -> &str;

    /// Interface mode the suite runs in.
    fn format(&self) -> Format;

    /// `Some(reason)` when the suite cannot run here.
    fn check_preconditions(&self) -> Option<String>;

    /// Names of the tests, in execution order.
    fn test_names(&self) -> Vec<&'static str>;

    /// Run one test body.
    async fn run_test(&self, name: &str, ctx: TestContext) -> TestResult;
}

/// Generate a unique resource name.
pub fn rand_name(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run one test body and its cleanups.
///
/// Cleanups run on every exit path. A body that passes but leaves a failing
/// cleanup behind is reported as failed.
pub async fn run_case<F, Fut>(name: &str, body: F) -> CaseReport
where
    F: FnOnce(TestContext) -> Fut,
    Fut: Future<Output = TestResult>,
{
    let started = Instant::now();
    let ctx = TestContext::new();

    let result = AssertUnwindSafe(body(ctx.clone())).catch_unwind().await;
    let cleanup_failures = ctx.cleanups().unwind().await;

    let mut outcome = match result {
        Ok(Ok(())) => TestOutcome::Passed,
        Ok(Err(TestError::Skip { reason })) => TestOutcome::Skipped { reason },
        Ok(Err(e)) => TestOutcome::Failed {
            reason: e.to_string(),
        },
        Err(payload) => TestOutcome::Failed {
            reason: format!("panicked: {}", panic_message(payload.as_ref())),
        },
    };

    if !cleanup_failures.is_empty() {
        let summary = cleanup_failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        outcome = match outcome {
            TestOutcome::Failed { reason } => TestOutcome::Failed {
                reason: format!("{}; cleanup failed: {}", reason, summary),
            },
            _ => TestOutcome::Failed {
                reason: format!("cleanup failed: {}", summary),
            },
        };
    }

    let duration = started.elapsed();
    match &outcome {
        TestOutcome::Failed { reason } => warn!(
            test = name,
            reason = %reason,
            elapsed_ms = duration.as_millis() as u64,
            "Test failed"
        ),
        other => info!(
            test = name,
            outcome = other.label(),
            elapsed_ms = duration.as_millis() as u64,
            "Test finished"
        ),
    }

    CaseReport {
        name: name.to_string(),
        outcome,
        duration,
    }
}

/// Run every test of `suite` whose name contains `filter`.
///
/// When the suite's preconditions fail, each selected test is reported as
/// skipped with the precondition's reason.
pub async fn run_suite(suite: &dyn ConformanceSuite, filter: Option<&str>) -> SuiteReport {
    let format = suite.format();
    let names: Vec<&'static str> = suite
        .test_names()
        .into_iter()
        .filter(|name| filter.map_or(true, |f| name.contains(f)))
        .collect();

    info!(suite = suite.name(), format = %format, tests = names.len(), "Running suite");

    let mut cases = Vec::with_capacity(names.len());
    let skip_reason = suite.check_preconditions();

    for name in names {
        let case = match &skip_reason {
            Some(reason) => {
                info!(test = name, reason = %reason, "Test skipped");
                CaseReport {
                    name: name.to_string(),
                    outcome: TestOutcome::Skipped {
                        reason: reason.clone(),
                    },
                    duration: Duration::ZERO,
                }
            }
            None => run_case(name, |ctx| suite.run_test(name, ctx)).await,
        };
        cases.push(case);
    }

    SuiteReport {
        suite: suite.name().to_string(),
        format,
        cases,
    }
}
