//! Running a whole suite: hooks, test classes, and invocations.
//!
//! The runner is the outermost caller of the [`Orchestrator`]. It owns
//! scheduling (how many classes run at once, when to stop) while the
//! orchestrator owns the per-test lifecycle.

use crate::config::RunnerConfig;
use crate::error::{ConductorError, ErrorKind, Result};
use crate::loader::{DeclarativeLoader, TestLoader};
use crate::orchestrator::Orchestrator;
use crate::parameters::{Invocation, ParameterSet};
use crate::report::Outcome;
use crate::test_case::TestIdentity;
use std::error::Error;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use tracing::{debug, info, warn};

/// One test definition and the parameters driving its invocations.
#[derive(Debug, Clone, PartialEq)]
pub struct TestClass {
    /// Which test to load.
    pub identity: TestIdentity,
    /// Declared parameter names, if any.
    pub parameter_names: Option<Vec<String>>,
    /// Data provider, if any.
    pub parameters: Option<ParameterSet>,
}

impl TestClass {
    /// A class with no parameters, invoked once.
    pub fn new(identity: TestIdentity) -> Self {
        Self {
            identity,
            parameter_names: None,
            parameters: None,
        }
    }

    /// Attaches parameter names and values.
    pub fn with_parameters(mut self, names: Option<Vec<String>>, set: Option<ParameterSet>) -> Self {
        self.parameter_names = names;
        self.parameters = set;
        self
    }

    /// Number of invocations: one per parameter row, or one without a set.
    pub fn invocation_count(&self) -> usize {
        self.parameters
            .as_ref()
            .map_or(1, ParameterSet::invocation_count)
    }

    fn invocation(&self, index: usize) -> Invocation<'_> {
        Invocation {
            names: self.parameter_names.as_deref(),
            set: self.parameters.as_ref(),
            index,
        }
    }
}

/// What a run executes: one suite and its test classes, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestPlan {
    /// Suite name, resolved through the registry.
    pub suite: String,
    /// Classes to run.
    pub classes: Vec<TestClass>,
}

impl TestPlan {
    /// Creates an empty plan for `suite`.
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            classes: Vec::new(),
        }
    }

    /// Appends a class.
    pub fn with_class(mut self, class: TestClass) -> Self {
        self.classes.push(class);
        self
    }

    /// Plans every discovered test whose qualified name contains `filter`.
    ///
    /// Parameter tables are read from the definitions up front. A
    /// definition that fails to parse is still planned without parameters,
    /// so the failure surfaces as a reported test when it runs.
    pub fn discover(
        loader: &DeclarativeLoader,
        suite: impl Into<String>,
        filter: Option<&str>,
    ) -> Result<Self> {
        let mut plan = Self::new(suite);
        for identity in loader.discover()? {
            if let Some(filter) = filter {
                if !identity.qualified_name().contains(filter) {
                    continue;
                }
            }

            let class = match loader.load_definition(&identity) {
                Ok(definition) => {
                    let names = definition.parameter_names().map(<[String]>::to_vec);
                    let set = definition.parameter_set();
                    TestClass::new(identity).with_parameters(names, set)
                }
                Err(e) => {
                    debug!(test = %identity, "planning without parameters: {}", e);
                    TestClass::new(identity)
                }
            };
            plan.classes.push(class);
        }
        Ok(plan)
    }

    /// Total number of invocations in the plan.
    pub fn invocation_count(&self) -> usize {
        self.classes.iter().map(TestClass::invocation_count).sum()
    }
}

/// A failed invocation, as recorded by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedInvocation {
    /// Qualified test name.
    pub test: String,
    /// Invocation index.
    pub invocation: usize,
    /// Error message including its causes.
    pub message: String,
}

/// Counts of a finished run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Passed invocations.
    pub passed: usize,
    /// Failed or aborted invocations.
    pub failed: usize,
    /// Skipped invocations.
    pub skipped: usize,
    /// Every failure, in completion order.
    pub failures: Vec<FailedInvocation>,
    /// Failure of the suite's after hook, if any.
    pub after_suite_error: Option<ConductorError>,
}

impl RunSummary {
    /// All invocations that reached the orchestrator.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    /// True if no test failed and the suite closed cleanly.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.after_suite_error.is_none()
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Passed => self.passed += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }

    fn record_failure(&mut self, test: &TestIdentity, invocation: usize, error: &ConductorError) {
        self.failed += 1;
        self.failures.push(FailedInvocation {
            test: test.qualified_name(),
            invocation,
            message: error_chain(error),
        });
    }
}

/// Joins an error and its sources into one line.
pub fn error_chain(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Executes a [`TestPlan`] through an orchestrator.
pub struct SuiteRunner<'a> {
    orchestrator: &'a Orchestrator,
    loader: &'a dyn TestLoader,
    workers: usize,
    fail_fast: bool,
}

impl<'a> SuiteRunner<'a> {
    /// Creates a sequential runner.
    pub fn new(orchestrator: &'a Orchestrator, loader: &'a dyn TestLoader) -> Self {
        Self {
            orchestrator,
            loader,
            workers: 1,
            fail_fast: false,
        }
    }

    /// Applies `[runner]` settings.
    pub fn with_config(self, config: &RunnerConfig) -> Self {
        self.workers(config.workers).fail_fast(config.fail_fast)
    }

    /// Number of classes run concurrently (at least one).
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Stop scheduling classes after the first failure.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Runs the plan.
    ///
    /// A failing `before_suite` aborts the run before any test executes;
    /// the suite's after hook is still attempted. Test failures are
    /// counted, never returned as errors.
    pub fn run(&self, plan: &TestPlan) -> Result<RunSummary> {
        info!(
            suite = %plan.suite,
            classes = plan.classes.len(),
            workers = self.workers,
            "starting run"
        );

        if let Err(e) = self.orchestrator.before_suite(&plan.suite) {
            if e.kind() == ErrorKind::SuiteHook {
                if let Err(after) = self.orchestrator.after_suite(&plan.suite) {
                    warn!(suite = %plan.suite, "after suite also failed: {}", after);
                }
            }
            return Err(e);
        }

        let summary = Mutex::new(RunSummary::default());
        let cursor = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let workers = self.workers.min(plan.classes.len()).max(1);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| self.drain(plan, &cursor, &stop, &summary));
            }
        });

        let mut summary = summary.into_inner().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.orchestrator.after_suite(&plan.suite) {
            summary.after_suite_error = Some(e);
        }

        info!(
            suite = %plan.suite,
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            "run finished"
        );
        Ok(summary)
    }

    /// Worker loop: claim the next class until the plan is exhausted.
    fn drain(
        &self,
        plan: &TestPlan,
        cursor: &AtomicUsize,
        stop: &AtomicBool,
        summary: &Mutex<RunSummary>,
    ) {
        while !stop.load(Ordering::SeqCst) {
            let Some(class) = plan.classes.get(cursor.fetch_add(1, Ordering::SeqCst)) else {
                break;
            };
            let failed = self.run_class(&plan.suite, class, summary);
            if failed && self.fail_fast {
                debug!(test = %class.identity, "fail fast, no further classes scheduled");
                stop.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Runs every invocation of one class. Returns true if any failed.
    fn run_class(&self, suite: &str, class: &TestClass, summary: &Mutex<RunSummary>) -> bool {
        let lock = || summary.lock().unwrap_or_else(PoisonError::into_inner);

        if let Err(e) = self.orchestrator.before_test(suite) {
            lock().record_failure(&class.identity, 0, &e);
            return true;
        }

        let mut failed = false;
        for index in 0..class.invocation_count() {
            let invocation = class.invocation(index);
            match self
                .orchestrator
                .load_and_execute(self.loader, &class.identity, &invocation)
            {
                Ok(outcome) => lock().record(outcome),
                Err(e) => {
                    failed = true;
                    lock().record_failure(&class.identity, index, &e);
                }
            }
        }
        failed
    }
}
