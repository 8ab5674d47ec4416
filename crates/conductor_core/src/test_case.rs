//! Test case model: identity, metadata, actions, and the runnable unit.

use crate::context::{display_value, TestContext};
use crate::error::ExecutionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle status of a test definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// Work in progress.
    #[default]
    Draft,
    /// Waiting for a reviewer.
    ReadyForReview,
    /// Reviewed and stable.
    Final,
    /// Never executed, only reported as skipped.
    Disabled,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::ReadyForReview => write!(f, "ready-for-review"),
            Self::Final => write!(f, "final"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

/// Descriptive metadata attached to a test case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseMetaInfo {
    /// Who wrote the test.
    #[serde(default)]
    pub author: Option<String>,

    /// Lifecycle status.
    #[serde(default)]
    pub status: Status,

    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Name and package uniquely identifying a test definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestIdentity {
    /// Test name, unique within its package.
    pub name: String,
    /// Dotted package name (may be empty).
    pub package: String,
}

impl TestIdentity {
    /// Creates an identity.
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
        }
    }

    /// Parses `com.acme.LoginTest` into package `com.acme` and name `LoginTest`.
    pub fn parse(qualified: &str) -> Self {
        match qualified.rsplit_once('.') {
            Some((package, name)) => Self::new(package, name),
            None => Self::new("", qualified),
        }
    }

    /// `package.name`, or just the name for the root package.
    pub fn qualified_name(&self) -> String {
        qualified(&self.package, &self.name)
    }
}

impl fmt::Display for TestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

fn qualified(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", package, name)
    }
}

/// A runnable test.
///
/// `execute` is called at most once per instance. `finish` is always
/// called exactly once afterwards, whatever `execute` did.
pub trait TestCase: Send {
    /// Test name.
    fn name(&self) -> &str;

    /// Package the test belongs to.
    fn package_name(&self) -> &str;

    /// Metadata, including the status checked before execution.
    fn meta_info(&self) -> &TestCaseMetaInfo;

    /// Display form of the bound parameters, for reporting.
    fn parameters(&self) -> &[String];

    /// Records the display form of the bound parameters.
    fn set_parameters(&mut self, parameters: Vec<String>);

    /// Runs the test against a prepared context.
    fn execute(&mut self, context: &mut TestContext) -> Result<(), ExecutionError>;

    /// Releases whatever the test holds. Never fails.
    fn finish(&mut self);

    /// `package.name` for logs and reports.
    fn qualified_name(&self) -> String {
        qualified(self.package_name(), self.name())
    }
}

/// A single step inside a test case or suite hook.
pub trait TestAction: Send + Sync {
    /// Short name used in failure messages.
    fn name(&self) -> &str;

    /// Runs the step.
    fn execute(&self, context: &mut TestContext) -> Result<(), ExecutionError>;
}

/// Built-in actions available to declarative definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    /// Logs a message after variable substitution.
    Echo {
        /// Message text, may contain `${var}` references.
        message: String,
    },
    /// Sets variables; string values get variable substitution.
    CreateVariables {
        /// Variables to set.
        variables: BTreeMap<String, Value>,
    },
    /// Blocks the current thread.
    Sleep {
        /// Sleep time in milliseconds.
        millis: u64,
    },
    /// Fails unconditionally.
    Fail {
        /// Failure message, may contain `${var}` references.
        message: String,
    },
    /// Checks that a variable holds the expected value.
    AssertVariable {
        /// Variable to check.
        name: String,
        /// Expected value; strings get variable substitution.
        expected: Value,
    },
}

impl Action {
    fn resolve(&self, value: &Value, context: &TestContext) -> Result<Value, ExecutionError> {
        match value {
            Value::String(s) => Ok(Value::String(context.replace_dynamic_content(s)?)),
            other => Ok(other.clone()),
        }
    }
}

impl TestAction for Action {
    fn name(&self) -> &str {
        match self {
            Self::Echo { .. } => "echo",
            Self::CreateVariables { .. } => "create-variables",
            Self::Sleep { .. } => "sleep",
            Self::Fail { .. } => "fail",
            Self::AssertVariable { .. } => "assert-variable",
        }
    }

    fn execute(&self, context: &mut TestContext) -> Result<(), ExecutionError> {
        match self {
            Self::Echo { message } => {
                let message = context.replace_dynamic_content(message)?;
                info!(context = %context.id(), "{}", message);
                Ok(())
            }
            Self::CreateVariables { variables } => {
                for (name, value) in variables {
                    let value = self.resolve(value, context)?;
                    debug!(variable = %name, value = %display_value(&value), "setting variable");
                    context.set_variable(name.clone(), value);
                }
                Ok(())
            }
            Self::Sleep { millis } => {
                std::thread::sleep(Duration::from_millis(*millis));
                Ok(())
            }
            Self::Fail { message } => {
                let message = context.replace_dynamic_content(message)?;
                Err(ExecutionError::action(self.name(), message))
            }
            Self::AssertVariable { name, expected } => {
                let expected = self.resolve(expected, context)?;
                let actual = context
                    .variable(name)
                    .ok_or_else(|| ExecutionError::UnknownVariable(name.clone()))?;
                if *actual != expected {
                    return Err(ExecutionError::ValidationFailed {
                        variable: name.clone(),
                        expected: display_value(&expected),
                        actual: display_value(actual),
                    });
                }
                Ok(())
            }
        }
    }
}

/// Test case made of an ordered list of actions.
///
/// Actions run in order and stop at the first failure. `finally` actions
/// run from [`TestCase::finish`] against the context the test ran with;
/// their failures are logged, never raised.
pub struct ActionTestCase {
    identity: TestIdentity,
    meta_info: TestCaseMetaInfo,
    actions: Vec<Box<dyn TestAction>>,
    finally: Vec<Box<dyn TestAction>>,
    parameters: Vec<String>,
    last_context: Option<TestContext>,
    executed: bool,
}

impl ActionTestCase {
    /// Creates an empty test case.
    pub fn new(identity: TestIdentity) -> Self {
        Self {
            identity,
            meta_info: TestCaseMetaInfo::default(),
            actions: Vec::new(),
            finally: Vec::new(),
            parameters: Vec::new(),
            last_context: None,
            executed: false,
        }
    }

    /// Sets the metadata.
    pub fn with_meta_info(mut self, meta_info: TestCaseMetaInfo) -> Self {
        self.meta_info = meta_info;
        self
    }

    /// Appends an action.
    pub fn with_action(mut self, action: impl TestAction + 'static) -> Self {
        self.actions.push(Box::new(action));
        self
    }

    /// Appends a finally action.
    pub fn with_finally(mut self, action: impl TestAction + 'static) -> Self {
        self.finally.push(Box::new(action));
        self
    }
}

impl TestCase for ActionTestCase {
    fn name(&self) -> &str {
        &self.identity.name
    }

    fn package_name(&self) -> &str {
        &self.identity.package
    }

    fn meta_info(&self) -> &TestCaseMetaInfo {
        &self.meta_info
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn set_parameters(&mut self, parameters: Vec<String>) {
        self.parameters = parameters;
    }

    fn execute(&mut self, context: &mut TestContext) -> Result<(), ExecutionError> {
        if self.executed {
            return Err(ExecutionError::AlreadyExecuted(self.qualified_name()));
        }
        self.executed = true;

        let result = self
            .actions
            .iter()
            .try_for_each(|action| action.execute(context));
        self.last_context = Some(context.clone());
        result
    }

    fn finish(&mut self) {
        let Some(mut context) = self.last_context.take() else {
            return;
        };
        for action in &self.finally {
            if let Err(e) = action.execute(&mut context) {
                warn!(
                    test = %self.identity,
                    action = action.name(),
                    "finally action failed: {}",
                    e
                );
            }
        }
    }
}

/// Stand-in for a test whose definition could not be loaded.
///
/// Carries only identity so the failure can still be reported.
#[derive(Debug, Clone)]
pub struct PlaceholderTestCase {
    identity: TestIdentity,
    meta_info: TestCaseMetaInfo,
    parameters: Vec<String>,
}

impl PlaceholderTestCase {
    /// Creates a placeholder for the given identity.
    pub fn new(identity: TestIdentity) -> Self {
        Self {
            identity,
            meta_info: TestCaseMetaInfo::default(),
            parameters: Vec::new(),
        }
    }
}

impl TestCase for PlaceholderTestCase {
    fn name(&self) -> &str {
        &self.identity.name
    }

    fn package_name(&self) -> &str {
        &self.identity.package
    }

    fn meta_info(&self) -> &TestCaseMetaInfo {
        &self.meta_info
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn set_parameters(&mut self, parameters: Vec<String>) {
        self.parameters = parameters;
    }

    fn execute(&mut self, _context: &mut TestContext) -> Result<(), ExecutionError> {
        Err(ExecutionError::action(
            "load",
            format!("no definition loaded for '{}'", self.identity),
        ))
    }

    fn finish(&mut self) {}
}
