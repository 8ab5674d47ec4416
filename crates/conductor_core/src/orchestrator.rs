//! Test lifecycle orchestration.
//!
//! The [`Orchestrator`] drives suites and tests through their lifecycle:
//!
//! ```text
//! before_suite(suite)
//!   before_test(suite)            once per test class
//!     execute_test(test, inv)     once per invocation
//! after_suite(suite)
//! ```
//!
//! For every executed test the listeners see exactly
//! `start -> (success | failure) -> finish`; a disabled test only produces
//! `skipped`. `finish` and `TestCase::finish` run on every exit path.

use crate::config::{Config, SuitesConfig};
use crate::context::{DefaultContextFactory, TestContext, TestContextFactory};
use crate::error::{ConductorError, ExecutionError, Result, SuitePhase};
use crate::listener::{panic_message, TestListener, TestListeners};
use crate::loader::TestLoader;
use crate::parameters::{bind_parameters, Invocation, UnprovidedParameters};
use crate::report::Outcome;
use crate::suite::{ResolutionPath, SuiteRegistry, SuiteResolution, TestSuite};
use crate::test_case::{PlaceholderTestCase, Status, TestCase, TestIdentity};
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Hook applied to every fresh context before parameters are bound.
pub type PrepareHook = Box<dyn Fn(TestContext) -> Result<TestContext> + Send + Sync>;

/// Central coordinator of suite hooks, test execution, and listener
/// notification.
///
/// Safe to share across threads: concurrent `execute_test` calls each get
/// their own context, and suite hook synchronization is left to the suites.
pub struct Orchestrator {
    suites: SuiteRegistry,
    listeners: TestListeners,
    context_factory: Box<dyn TestContextFactory>,
    prepare: Option<PrepareHook>,
    unprovided: UnprovidedParameters,
    started_suites: Mutex<HashSet<String>>,
}

impl Orchestrator {
    /// Starts building an orchestrator.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Builds an orchestrator from project configuration.
    ///
    /// Declared suites are registered, global variables seed every context,
    /// and the parameter policy is taken from `[parameters]`.
    pub fn from_config(config: &Config, listeners: TestListeners) -> Self {
        let globals = config.global_variables();
        Self::builder()
            .suites(SuiteRegistry::from_definitions(
                &config.suites,
                &config.suite,
                &globals,
            ))
            .listeners(listeners)
            .context_factory(DefaultContextFactory::with_globals(globals))
            .unprovided_parameters(config.parameters.unprovided)
            .build()
    }

    fn resolve(&self, name: &str) -> Result<(ResolutionPath, Arc<dyn TestSuite>)> {
        match self.suites.resolve(name) {
            SuiteResolution::Exact(suite) => Ok((ResolutionPath::Exact, suite)),
            SuiteResolution::Default(suite) => Ok((ResolutionPath::Default, suite)),
            SuiteResolution::NotFound => Err(ConductorError::SuiteNotFound(
                self.suites.normalize(name).to_string(),
            )),
        }
    }

    /// Resolves the suite and runs its `before_suite` hook.
    ///
    /// Returns the resolution path taken. A hook failure is a
    /// [`ConductorError::SuiteHookFailed`], distinct from any test failure.
    pub fn before_suite(&self, name: &str) -> Result<ResolutionPath> {
        let (path, suite) = self.resolve(name)?;
        self.started_suites
            .lock()
            .map_err(|_| ConductorError::ConfigError("suite state poisoned".to_string()))?
            .insert(suite.name().to_string());

        info!(suite = suite.name(), "running before suite");
        if !suite.before_suite() {
            error!(suite = suite.name(), "before suite failed with errors");
            return Err(ConductorError::SuiteHookFailed {
                suite: suite.name().to_string(),
                phase: SuitePhase::BeforeSuite,
            });
        }
        Ok(path)
    }

    /// Resolves the suite and runs its `before_test` hook.
    pub fn before_test(&self, name: &str) -> Result<ResolutionPath> {
        let (path, suite) = self.resolve(name)?;
        debug!(suite = suite.name(), "running before test");
        suite.before_test();
        Ok(path)
    }

    /// Resolves the suite and runs its `after_suite` hook.
    ///
    /// The hook only runs for a suite that went through
    /// [`before_suite`](Self::before_suite), and at most once; otherwise
    /// this logs a warning and does nothing.
    pub fn after_suite(&self, name: &str) -> Result<ResolutionPath> {
        let (path, suite) = self.resolve(name)?;
        let was_started = self
            .started_suites
            .lock()
            .map_err(|_| ConductorError::ConfigError("suite state poisoned".to_string()))?
            .remove(suite.name());
        if !was_started {
            warn!(
                suite = suite.name(),
                "after suite requested for a suite that is not running, ignoring"
            );
            return Ok(path);
        }

        info!(suite = suite.name(), "running after suite");
        if !suite.after_suite() {
            error!(suite = suite.name(), "after suite failed with errors");
            return Err(ConductorError::SuiteHookFailed {
                suite: suite.name().to_string(),
                phase: SuitePhase::AfterSuite,
            });
        }
        Ok(path)
    }

    /// Executes one invocation of a test case.
    ///
    /// Disabled tests are reported as skipped and never touch a context.
    /// Otherwise a fresh context is created, passed through the prepare
    /// hook, parameters are bound and the test executes. Execution failures
    /// come back as [`ConductorError::TestFailed`], configuration failures
    /// after start as [`ConductorError::TestAborted`]; in both cases the
    /// listeners have already seen `failure` and `finish`. A panic from the
    /// context factory, the prepare hook or the test itself is reported as
    /// [`ExecutionError::Panicked`].
    pub fn execute_test(
        &self,
        test_case: &mut dyn TestCase,
        invocation: &Invocation<'_>,
    ) -> Result<Outcome> {
        if test_case.meta_info().status == Status::Disabled {
            debug!(test = %test_case.qualified_name(), "test disabled, skipping");
            self.listeners.on_test_skipped(test_case);
            return Ok(Outcome::Skipped);
        }

        self.listeners.on_test_start(test_case);
        let mut guard = FinishGuard {
            test_case,
            listeners: &self.listeners,
        };

        let result = catch_unwind(AssertUnwindSafe(|| {
            self.run(&mut *guard.test_case, invocation)
        }))
        .unwrap_or_else(|payload| {
            Err(Failure::Execution(ExecutionError::Panicked(panic_message(
                payload.as_ref(),
            ))))
        });

        match result {
            Ok(()) => {
                self.listeners.on_test_success(&*guard.test_case);
                Ok(Outcome::Passed)
            }
            Err(Failure::Execution(cause)) => {
                self.listeners.on_test_failure(&*guard.test_case, &cause);
                Err(ConductorError::TestFailed {
                    test: guard.test_case.qualified_name(),
                    source: cause,
                })
            }
            Err(Failure::Configuration(cause)) => {
                self.listeners.on_test_failure(&*guard.test_case, &cause);
                Err(ConductorError::TestAborted {
                    test: guard.test_case.qualified_name(),
                    source: Box::new(cause),
                })
            }
        }
    }

    fn run(
        &self,
        test_case: &mut dyn TestCase,
        invocation: &Invocation<'_>,
    ) -> std::result::Result<(), Failure> {
        let context = self.context_factory.create()?;
        let mut context = match &self.prepare {
            Some(prepare) => prepare(context)?,
            None => context,
        };
        debug!(
            test = %test_case.qualified_name(),
            context = %context.id(),
            "created test context"
        );

        bind_parameters(test_case, &mut context, invocation, self.unprovided)?;

        test_case.execute(&mut context).map_err(Failure::Execution)
    }

    /// Loads a test through `loader` and executes it.
    ///
    /// When loading fails, a placeholder carrying only the identity goes
    /// through `start -> failure -> finish` so the test still shows up in
    /// reports, then the load error is returned.
    pub fn load_and_execute(
        &self,
        loader: &dyn TestLoader,
        identity: &TestIdentity,
        invocation: &Invocation<'_>,
    ) -> Result<Outcome> {
        match loader.load_test_case(identity) {
            Ok(mut test_case) => self.execute_test(test_case.as_mut(), invocation),
            Err(e) => {
                error!(test = %identity, "failed to load test case: {}", e);
                let placeholder = PlaceholderTestCase::new(identity.clone());
                self.listeners.on_test_start(&placeholder);
                self.listeners.on_test_failure(&placeholder, &e);
                self.listeners.on_test_finish(&placeholder);
                Err(e)
            }
        }
    }
}

/// Failure inside the guarded part of a test execution.
enum Failure {
    Execution(ExecutionError),
    Configuration(ConductorError),
}

impl From<ConductorError> for Failure {
    fn from(e: ConductorError) -> Self {
        Self::Configuration(e)
    }
}

/// Fires `on_test_finish` and `TestCase::finish` when dropped.
struct FinishGuard<'a> {
    test_case: &'a mut dyn TestCase,
    listeners: &'a TestListeners,
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.listeners.on_test_finish(&*self.test_case);
        let test_case = &mut *self.test_case;
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| test_case.finish())) {
            error!(
                test = %test_case.qualified_name(),
                "test finish panicked: {}",
                panic_message(payload.as_ref())
            );
        }
    }
}

/// Builder for [`Orchestrator`].
#[derive(Default)]
pub struct OrchestratorBuilder {
    suites: Option<SuiteRegistry>,
    listeners: TestListeners,
    context_factory: Option<Box<dyn TestContextFactory>>,
    prepare: Option<PrepareHook>,
    unprovided: UnprovidedParameters,
}

impl OrchestratorBuilder {
    /// Uses the given suite registry (default: empty, default settings).
    pub fn suites(mut self, suites: SuiteRegistry) -> Self {
        self.suites = Some(suites);
        self
    }

    /// Replaces the listener set.
    pub fn listeners(mut self, listeners: TestListeners) -> Self {
        self.listeners = listeners;
        self
    }

    /// Adds a listener.
    pub fn listener(mut self, listener: impl TestListener + 'static) -> Self {
        self.listeners.register(listener);
        self
    }

    /// Adds a listener the caller keeps a handle to.
    pub fn shared_listener(mut self, listener: Arc<dyn TestListener>) -> Self {
        self.listeners.register_shared(listener);
        self
    }

    /// Uses the given context factory (default: [`DefaultContextFactory`]).
    pub fn context_factory(mut self, factory: impl TestContextFactory + 'static) -> Self {
        self.context_factory = Some(Box::new(factory));
        self
    }

    /// Installs the context prepare hook (default: identity).
    pub fn prepare_context(
        mut self,
        hook: impl Fn(TestContext) -> Result<TestContext> + Send + Sync + 'static,
    ) -> Self {
        self.prepare = Some(Box::new(hook));
        self
    }

    /// Sets the policy for declared names without values.
    pub fn unprovided_parameters(mut self, policy: UnprovidedParameters) -> Self {
        self.unprovided = policy;
        self
    }

    /// Builds the orchestrator.
    pub fn build(self) -> Orchestrator {
        Orchestrator {
            suites: self
                .suites
                .unwrap_or_else(|| SuiteRegistry::new(&SuitesConfig::default())),
            listeners: self.listeners,
            context_factory: self
                .context_factory
                .unwrap_or_else(|| Box::new(DefaultContextFactory::new())),
            prepare: self.prepare,
            unprovided: self.unprovided,
            started_suites: Mutex::new(HashSet::new()),
        }
    }
}
