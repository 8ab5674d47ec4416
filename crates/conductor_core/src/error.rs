//! Error types for conductor_core operations.

use std::path::PathBuf;
use thiserror::Error;

/// Failure raised by a test action or by `TestCase::execute`.
///
/// This is the "test ran and failed" class of error. It never describes a
/// configuration problem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// A test action reported a failure.
    #[error("action '{action}' failed: {message}")]
    ActionFailed {
        /// Name of the failing action
        action: String,
        /// Failure description
        message: String,
    },

    /// A variable assertion did not hold.
    #[error("validation failed for variable '{variable}': expected {expected}, got {actual}")]
    ValidationFailed {
        /// Variable that was checked
        variable: String,
        /// Expected rendering
        expected: String,
        /// Actual rendering
        actual: String,
    },

    /// Dynamic content referenced a variable that was never set.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// The test case was executed more than once.
    #[error("test case '{0}' has already been executed")]
    AlreadyExecuted(String),

    /// The test body panicked; the payload is kept as text.
    #[error("test panicked: {0}")]
    Panicked(String),
}

impl ExecutionError {
    /// Convenience constructor for action failures.
    pub fn action(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ActionFailed {
            action: action.into(),
            message: message.into(),
        }
    }
}

/// Classification of a [`ConductorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing definitions, bad parameters, malformed files.
    Configuration,
    /// The test ran and failed.
    Execution,
    /// A suite-level hook reported failure.
    SuiteHook,
    /// Filesystem access failed.
    Io,
}

/// Suite lifecycle hook that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuitePhase {
    /// `before_suite`
    BeforeSuite,
    /// `after_suite`
    AfterSuite,
}

impl std::fmt::Display for SuitePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BeforeSuite => write!(f, "before suite"),
            Self::AfterSuite => write!(f, "after suite"),
        }
    }
}

/// Core error type for conductor_core operations.
#[derive(Error, Debug)]
pub enum ConductorError {
    /// No suite with the given name, and no default suite either.
    #[error("test suite not found: {0}")]
    SuiteNotFound(String),

    /// The loader has no definition for the requested test.
    #[error("test case not found: {0}")]
    TestCaseNotFound(String),

    /// A parameter set was supplied without parameter names.
    #[error("missing parameter names for '{0}', declare names when supplying a parameter set")]
    MissingParameterNames(String),

    /// Parameter names were declared but no values were supplied.
    #[error("parameter names declared for '{0}' but no parameter set was provided")]
    MissingParameterValues(String),

    /// The invocation's value count differs from the declared name count.
    #[error("parameter mismatch: {names} parameter names defined with {values} parameter values available")]
    ParameterMismatch {
        /// Number of declared names
        names: usize,
        /// Number of supplied values
        values: usize,
    },

    /// The parameter set has no row for the current invocation.
    #[error("no parameter values for invocation {index} ({available} available)")]
    InvocationOutOfRange {
        /// Requested invocation index
        index: usize,
        /// Number of rows in the parameter set
        available: usize,
    },

    /// A suite hook returned a failure indicator.
    #[error("{phase} failed with errors for suite '{suite}'")]
    SuiteHookFailed {
        /// Suite that failed
        suite: String,
        /// Which hook failed
        phase: SuitePhase,
    },

    /// The test ran and failed. Wraps the original cause.
    #[error("test case '{test}' failed")]
    TestFailed {
        /// Qualified test name
        test: String,
        /// Original execution failure
        #[source]
        source: ExecutionError,
    },

    /// The test started but could not run to completion for a
    /// configuration reason (e.g. parameter mismatch).
    #[error("test case '{test}' aborted")]
    TestAborted {
        /// Qualified test name
        test: String,
        /// Original configuration failure
        #[source]
        source: Box<ConductorError>,
    },

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A definition file could not be parsed.
    #[error("invalid definition at {}: {}", path.display(), reason)]
    InvalidDefinition {
        /// Path to the definition file
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConductorError {
    /// Returns the taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TestFailed { .. } => ErrorKind::Execution,
            Self::SuiteHookFailed { .. } => ErrorKind::SuiteHook,
            Self::Io(_) => ErrorKind::Io,
            Self::TestAborted { source, .. } => source.kind(),
            _ => ErrorKind::Configuration,
        }
    }

    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::SuiteNotFound(_) => {
                Some("Declare the suite in conductor.toml or configure [suites].default_suite.")
            }
            Self::TestCaseNotFound(_) => {
                Some("Check that tests/<package path>/<Name>.toml exists. Run 'conductor list'.")
            }
            Self::MissingParameterNames(_) => {
                Some("Add a `names` array next to `values` in the [parameters] table.")
            }
            Self::ParameterMismatch { .. } => {
                Some("Every row in [parameters].values needs one value per declared name.")
            }
            Self::InvalidDefinition { .. } => Some("Fix the TOML syntax and re-run."),
            _ => None,
        }
    }
}

/// Convenience Result type for conductor_core operations.
pub type Result<T> = std::result::Result<T, ConductorError>;
