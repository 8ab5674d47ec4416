//! Binding externally supplied parameter values into a test context.

use crate::context::{display_value, TestContext};
use crate::error::{ConductorError, Result};
use crate::test_case::TestCase;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Two-dimensional parameter set: one row of values per invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    rows: Vec<Vec<Value>>,
}

impl ParameterSet {
    /// Creates a set from rows; row `i` feeds invocation `i`.
    pub fn new(rows: Vec<Vec<Value>>) -> Self {
        Self { rows }
    }

    /// Number of invocations this set drives.
    pub fn invocation_count(&self) -> usize {
        self.rows.len()
    }

    /// Values for the given invocation.
    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }
}

/// Policy for names declared without any parameter set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnprovidedParameters {
    /// Treat the test as parameterless.
    #[default]
    Ignore,
    /// Fail with a configuration error.
    Error,
}

/// Parameters for one invocation of a test, declared at the call boundary.
#[derive(Debug, Clone, Copy, Default)]
pub struct Invocation<'a> {
    /// Declared parameter names, if any.
    pub names: Option<&'a [String]>,
    /// Parameter set supplied by the runner, if any.
    pub set: Option<&'a ParameterSet>,
    /// Current invocation count.
    pub index: usize,
}

impl<'a> Invocation<'a> {
    /// An invocation without parameters.
    pub fn none() -> Self {
        Self::default()
    }

    /// Invocation `index` of a parameterized test.
    pub fn with(names: &'a [String], set: &'a ParameterSet, index: usize) -> Self {
        Self {
            names: Some(names),
            set: Some(set),
            index,
        }
    }
}

/// Binds one invocation's parameters into `context`.
///
/// Sets `context[name] = value` for each declared name in order and records
/// the quoted display form on the test case. Both checks run before any
/// variable is set, so a failed binding leaves the context untouched.
/// Without a parameter set this does nothing (subject to `policy`).
pub fn bind_parameters(
    test_case: &mut dyn TestCase,
    context: &mut TestContext,
    invocation: &Invocation<'_>,
    policy: UnprovidedParameters,
) -> Result<()> {
    let Some(set) = invocation.set else {
        return match (invocation.names, policy) {
            (Some(names), UnprovidedParameters::Error) if !names.is_empty() => Err(
                ConductorError::MissingParameterValues(test_case.qualified_name()),
            ),
            _ => Ok(()),
        };
    };

    let names = invocation
        .names
        .ok_or_else(|| ConductorError::MissingParameterNames(test_case.qualified_name()))?;

    let values = set
        .row(invocation.index)
        .ok_or(ConductorError::InvocationOutOfRange {
            index: invocation.index,
            available: set.invocation_count(),
        })?;

    if values.len() != names.len() {
        return Err(ConductorError::ParameterMismatch {
            names: names.len(),
            values: values.len(),
        });
    }

    let mut display = Vec::with_capacity(values.len());
    for (name, value) in names.iter().zip(values) {
        context.set_variable(name.clone(), value.clone());
        display.push(format!("'{}'", display_value(value)));
    }
    test_case.set_parameters(display);

    Ok(())
}
