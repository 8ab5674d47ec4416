//! Collected test results.

use crate::listener::{ListenerResult, TestListener};
use crate::test_case::TestCase;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Mutex;
use std::thread::{self, ThreadId};
use std::time::Instant;

/// Final state of one test invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Ran and succeeded.
    Passed,
    /// Ran (or tried to) and failed.
    Failed,
    /// Not executed.
    Skipped,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result of one test invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test name.
    pub test: String,
    /// Package name.
    pub package: String,
    /// Outcome.
    pub outcome: Outcome,
    /// Display form of bound parameters.
    pub parameters: Vec<String>,
    /// Failure cause, for failed tests.
    pub cause: Option<String>,
    /// Wall time between start and finish, zero for skipped tests.
    pub duration_ms: u64,
}

/// All results of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    /// Results in completion order.
    pub results: Vec<TestResult>,
}

impl TestReport {
    /// Number of results with the given outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    /// Passed invocations.
    pub fn passed(&self) -> usize {
        self.count(Outcome::Passed)
    }

    /// Failed invocations.
    pub fn failed(&self) -> usize {
        self.count(Outcome::Failed)
    }

    /// Skipped invocations.
    pub fn skipped(&self) -> usize {
        self.count(Outcome::Skipped)
    }

    /// All invocations.
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// True if nothing failed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Pretty JSON rendering.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

struct Pending {
    started: Instant,
    outcome: Outcome,
    cause: Option<String>,
}

/// Listener that turns lifecycle events into a [`TestReport`].
///
/// In-flight tests are keyed by qualified name and thread, so concurrent
/// executions of different tests do not interfere.
#[derive(Default)]
pub struct ReportListener {
    pending: Mutex<HashMap<(String, ThreadId), Pending>>,
    report: Mutex<TestReport>,
}

impl ReportListener {
    /// Creates an empty report listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the results collected so far.
    pub fn report(&self) -> TestReport {
        self.report.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn key(test: &dyn TestCase) -> (String, ThreadId) {
        (test.qualified_name(), thread::current().id())
    }

    fn update(&self, test: &dyn TestCase, outcome: Outcome, cause: Option<String>) -> ListenerResult {
        let mut pending = self.pending.lock().map_err(|_| "report state poisoned")?;
        match pending.get_mut(&Self::key(test)) {
            Some(entry) => {
                entry.outcome = outcome;
                entry.cause = cause;
                Ok(())
            }
            None => Err(format!("no start recorded for '{}'", test.qualified_name()).into()),
        }
    }

    fn push(&self, result: TestResult) -> ListenerResult {
        self.report
            .lock()
            .map_err(|_| "report poisoned")?
            .results
            .push(result);
        Ok(())
    }
}

impl TestListener for ReportListener {
    fn on_test_start(&self, test: &dyn TestCase) -> ListenerResult {
        let mut pending = self.pending.lock().map_err(|_| "report state poisoned")?;
        pending.insert(
            Self::key(test),
            Pending {
                started: Instant::now(),
                outcome: Outcome::Failed,
                cause: None,
            },
        );
        Ok(())
    }

    fn on_test_success(&self, test: &dyn TestCase) -> ListenerResult {
        self.update(test, Outcome::Passed, None)
    }

    fn on_test_failure(&self, test: &dyn TestCase, cause: &dyn Error) -> ListenerResult {
        self.update(test, Outcome::Failed, Some(cause.to_string()))
    }

    fn on_test_skipped(&self, test: &dyn TestCase) -> ListenerResult {
        self.push(TestResult {
            test: test.name().to_string(),
            package: test.package_name().to_string(),
            outcome: Outcome::Skipped,
            parameters: test.parameters().to_vec(),
            cause: None,
            duration_ms: 0,
        })
    }

    fn on_test_finish(&self, test: &dyn TestCase) -> ListenerResult {
        let entry = self
            .pending
            .lock()
            .map_err(|_| "report state poisoned")?
            .remove(&Self::key(test))
            .ok_or_else(|| format!("no start recorded for '{}'", test.qualified_name()))?;

        self.push(TestResult {
            test: test.name().to_string(),
            package: test.package_name().to_string(),
            outcome: entry.outcome,
            parameters: test.parameters().to_vec(),
            cause: entry.cause,
            duration_ms: entry.started.elapsed().as_millis() as u64,
        })
    }
}
