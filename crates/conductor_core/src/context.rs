//! Per-execution variable scope.

use crate::error::{ExecutionError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Mutable bag of variables handed to a single test execution.
///
/// A context is created fresh for every execution and dropped afterwards;
/// nothing in it outlives the test that used it.
#[derive(Debug, Clone, PartialEq)]
pub struct TestContext {
    id: Uuid,
    variables: BTreeMap<String, Value>,
}

impl TestContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::with_variables(BTreeMap::new())
    }

    /// Creates a context seeded with the given variables.
    pub fn with_variables(variables: BTreeMap<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            variables,
        }
    }

    /// Unique id of this context, for diagnostics.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Sets a variable, replacing any previous value.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Returns a variable's value.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Returns true if the variable is set.
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Removes a variable and returns its previous value.
    pub fn remove_variable(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(name)
    }

    /// All variables in name order.
    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    /// Replaces `${name}` references with the variables' display form.
    ///
    /// A reference without a closing brace is kept as literal text.
    pub fn replace_dynamic_content(
        &self,
        input: &str,
    ) -> std::result::Result<String, ExecutionError> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let name = &after[..end];
                    let value = self
                        .variables
                        .get(name)
                        .ok_or_else(|| ExecutionError::UnknownVariable(name.to_string()))?;
                    out.push_str(&display_value(value));
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);

        Ok(out)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders a value the way it appears in reports and substituted content.
///
/// Strings render without JSON quotes; everything else uses its JSON form.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Produces fresh test contexts.
///
/// Implementations must never hand out a context carrying state from a
/// previous execution.
pub trait TestContextFactory: Send + Sync {
    /// Creates a new context.
    fn create(&self) -> Result<TestContext>;
}

/// Factory seeding every context with a fixed set of global variables.
#[derive(Debug, Clone, Default)]
pub struct DefaultContextFactory {
    globals: BTreeMap<String, Value>,
}

impl DefaultContextFactory {
    /// Creates a factory with no global variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory that copies `globals` into each new context.
    pub fn with_globals(globals: BTreeMap<String, Value>) -> Self {
        Self { globals }
    }
}

impl TestContextFactory for DefaultContextFactory {
    fn create(&self) -> Result<TestContext> {
        Ok(TestContext::with_variables(self.globals.clone()))
    }
}

impl<F> TestContextFactory for F
where
    F: Fn() -> Result<TestContext> + Send + Sync,
{
    fn create(&self) -> Result<TestContext> {
        self()
    }
}
