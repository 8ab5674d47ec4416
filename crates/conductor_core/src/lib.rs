//! Conductor Core Library
//!
//! Lifecycle orchestration for integration tests, providing:
//! - Suite hooks with name resolution and a default-suite fallback
//! - Per-test execution with isolated contexts and parameter binding
//! - Lifecycle listeners that always see a finish for every start
//! - Declarative test definitions loaded from TOML
//!
//! # Quick Start
//!
//! ```
//! use conductor_core::{
//!     Action, ActionTestCase, Invocation, Orchestrator, Outcome, TestIdentity,
//! };
//!
//! let orchestrator = Orchestrator::builder().build();
//!
//! let mut test = ActionTestCase::new(TestIdentity::new("demo", "Hello"))
//!     .with_action(Action::Echo { message: "hello".into() });
//!
//! let outcome = orchestrator.execute_test(&mut test, &Invocation::none()).unwrap();
//! assert_eq!(outcome, Outcome::Passed);
//! ```
//!
//! # Features
//!
//! ## Parameterized Tests
//!
//! Parameter values are bound into a fresh context under their declared
//! names, once per invocation:
//!
//! ```
//! use conductor_core::{
//!     Action, ActionTestCase, Invocation, Orchestrator, ParameterSet, TestCase, TestIdentity,
//! };
//! use serde_json::json;
//!
//! let orchestrator = Orchestrator::builder().build();
//! let names = vec!["user".to_string()];
//! let set = ParameterSet::new(vec![vec![json!("alice")], vec![json!("bob")]]);
//!
//! for index in 0..set.invocation_count() {
//!     let mut test = ActionTestCase::new(TestIdentity::new("demo", "Login"))
//!         .with_action(Action::Echo { message: "login as ${user}".into() });
//!     orchestrator
//!         .execute_test(&mut test, &Invocation::with(&names, &set, index))
//!         .unwrap();
//!     assert_eq!(test.parameters().len(), 1);
//! }
//! ```
//!
//! ## Reports
//!
//! A [`ReportListener`] turns lifecycle events into a [`TestReport`]:
//!
//! ```
//! use conductor_core::{
//!     Action, ActionTestCase, Invocation, Orchestrator, ReportListener, TestIdentity,
//! };
//! use std::sync::Arc;
//!
//! let report = Arc::new(ReportListener::new());
//! let orchestrator = Orchestrator::builder().shared_listener(report.clone()).build();
//!
//! let mut test = ActionTestCase::new(TestIdentity::new("demo", "Broken"))
//!     .with_action(Action::Fail { message: "nope".into() });
//! assert!(orchestrator.execute_test(&mut test, &Invocation::none()).is_err());
//!
//! assert_eq!(report.report().failed(), 1);
//! ```

mod config;
mod context;
mod error;
mod listener;
mod loader;
mod orchestrator;
mod parameters;
mod report;
mod runner;
mod suite;
mod test_case;

pub use config::{
    Config, LoggingConfig, ParametersConfig, RunnerConfig, SuiteDefinition, SuitesConfig,
    CONFIG_FILE, DEFAULT_SUITE_NAME,
};
pub use context::{display_value, DefaultContextFactory, TestContext, TestContextFactory};
pub use error::{ConductorError, ErrorKind, ExecutionError, Result, SuitePhase};
pub use listener::{ListenerResult, LoggingListener, TestListener, TestListeners};
pub use loader::{
    DeclarativeLoader, ParameterTable, TestDefinition, TestLoader, DEFINITION_EXTENSION,
    TESTS_DIR,
};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, PrepareHook};
pub use parameters::{bind_parameters, Invocation, ParameterSet, UnprovidedParameters};
pub use report::{Outcome, ReportListener, TestReport, TestResult};
pub use runner::{error_chain, FailedInvocation, RunSummary, SuiteRunner, TestClass, TestPlan};
pub use suite::{
    ActionSuite, HookGate, ResolutionPath, SuiteRegistry, SuiteResolution, TestSuite,
};
pub use test_case::{
    Action, ActionTestCase, PlaceholderTestCase, Status, TestAction, TestCase, TestCaseMetaInfo,
    TestIdentity,
};
