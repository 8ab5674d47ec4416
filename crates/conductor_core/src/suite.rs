//! Suites: shared before/after hooks and lookup by name.

use crate::config::{SuiteDefinition, SuitesConfig};
use crate::context::TestContext;
use crate::test_case::{Action, TestAction};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Collection-level lifecycle object shared by every test in a suite.
///
/// Instances are shared across threads; implementations synchronize their
/// own hook state.
pub trait TestSuite: Send + Sync {
    /// Name the suite is registered under.
    fn name(&self) -> &str;

    /// Runs once before any test of the suite. Returns false on failure.
    fn before_suite(&self) -> bool;

    /// Runs before each test class.
    fn before_test(&self);

    /// Runs once after all tests of the suite. Returns false on failure.
    fn after_suite(&self) -> bool;
}

/// Single-entry gate: the first caller runs the hook, every other caller
/// (concurrent or later) waits for and receives that first outcome.
#[derive(Debug, Default)]
pub struct HookGate {
    outcome: OnceLock<bool>,
}

impl HookGate {
    /// Creates a gate that has not fired yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `hook` if this is the first call, otherwise returns the stored outcome.
    pub fn run(&self, hook: impl FnOnce() -> bool) -> bool {
        *self.outcome.get_or_init(hook)
    }

    /// True once the hook has completed.
    pub fn has_fired(&self) -> bool {
        self.outcome.get().is_some()
    }
}

/// Suite whose hooks run lists of actions.
pub struct ActionSuite {
    name: String,
    globals: BTreeMap<String, Value>,
    before_suite: Vec<Box<dyn TestAction>>,
    before_test: Vec<Box<dyn TestAction>>,
    after_suite: Vec<Box<dyn TestAction>>,
    before_gate: HookGate,
    after_gate: HookGate,
}

impl ActionSuite {
    /// Creates a suite with no hook actions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            globals: BTreeMap::new(),
            before_suite: Vec::new(),
            before_test: Vec::new(),
            after_suite: Vec::new(),
            before_gate: HookGate::new(),
            after_gate: HookGate::new(),
        }
    }

    /// Builds a suite from its declarative definition.
    pub fn from_definition(
        definition: &SuiteDefinition,
        globals: BTreeMap<String, Value>,
    ) -> Self {
        fn boxed(actions: &[Action]) -> Vec<Box<dyn TestAction>> {
            actions
                .iter()
                .cloned()
                .map(|a| Box::new(a) as Box<dyn TestAction>)
                .collect()
        }

        Self {
            globals,
            before_suite: boxed(&definition.before_suite),
            before_test: boxed(&definition.before_test),
            after_suite: boxed(&definition.after_suite),
            ..Self::new(definition.name.clone())
        }
    }

    /// Appends a before-suite action.
    pub fn with_before_suite(mut self, action: impl TestAction + 'static) -> Self {
        self.before_suite.push(Box::new(action));
        self
    }

    /// Appends a before-test action.
    pub fn with_before_test(mut self, action: impl TestAction + 'static) -> Self {
        self.before_test.push(Box::new(action));
        self
    }

    /// Appends an after-suite action.
    pub fn with_after_suite(mut self, action: impl TestAction + 'static) -> Self {
        self.after_suite.push(Box::new(action));
        self
    }

    fn run_actions(&self, phase: &str, actions: &[Box<dyn TestAction>]) -> bool {
        let mut context = TestContext::with_variables(self.globals.clone());
        for action in actions {
            if let Err(e) = action.execute(&mut context) {
                warn!(
                    suite = %self.name,
                    phase,
                    action = action.name(),
                    "suite action failed: {}",
                    e
                );
                return false;
            }
        }
        debug!(suite = %self.name, phase, "suite hook completed");
        true
    }
}

impl TestSuite for ActionSuite {
    fn name(&self) -> &str {
        &self.name
    }

    fn before_suite(&self) -> bool {
        self.before_gate
            .run(|| self.run_actions("before-suite", &self.before_suite))
    }

    fn before_test(&self) {
        self.run_actions("before-test", &self.before_test);
    }

    fn after_suite(&self) -> bool {
        self.after_gate
            .run(|| self.run_actions("after-suite", &self.after_suite))
    }
}

/// Which lookup path produced a suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPath {
    /// Registered under the requested (normalized) name.
    Exact,
    /// Requested name missing; the default suite was used.
    Default,
}

/// Outcome of looking up a suite by name.
#[derive(Clone)]
pub enum SuiteResolution {
    /// Found under the requested name.
    Exact(Arc<dyn TestSuite>),
    /// Fell back to the default suite.
    Default(Arc<dyn TestSuite>),
    /// Neither the requested nor the default suite exists.
    NotFound,
}

impl SuiteResolution {
    /// The resolved suite, if any.
    pub fn suite(&self) -> Option<&Arc<dyn TestSuite>> {
        match self {
            Self::Exact(s) | Self::Default(s) => Some(s),
            Self::NotFound => None,
        }
    }

    /// The path taken, if a suite was found.
    pub fn path(&self) -> Option<ResolutionPath> {
        match self {
            Self::Exact(_) => Some(ResolutionPath::Exact),
            Self::Default(_) => Some(ResolutionPath::Default),
            Self::NotFound => None,
        }
    }
}

impl fmt::Debug for SuiteResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) => write!(f, "Exact({:?})", s.name()),
            Self::Default(s) => write!(f, "Default({:?})", s.name()),
            Self::NotFound => write!(f, "NotFound"),
        }
    }
}

/// Suites keyed by name, with a default for unmatched lookups.
pub struct SuiteRegistry {
    suites: HashMap<String, Arc<dyn TestSuite>>,
    default_name: String,
    strip_suffixes: Vec<String>,
}

impl SuiteRegistry {
    /// Creates an empty registry using the given resolution settings.
    pub fn new(config: &SuitesConfig) -> Self {
        Self {
            suites: HashMap::new(),
            default_name: config.default_suite.clone(),
            strip_suffixes: config.strip_suffixes.clone(),
        }
    }

    /// Builds a registry from declared suites.
    ///
    /// An empty default suite is registered when none is declared.
    pub fn from_definitions(
        config: &SuitesConfig,
        definitions: &[SuiteDefinition],
        globals: &BTreeMap<String, Value>,
    ) -> Self {
        let mut registry = Self::new(config);
        for definition in definitions {
            registry.register(ActionSuite::from_definition(definition, globals.clone()));
        }
        if !registry.contains(&registry.default_name) {
            let name = registry.default_name.clone();
            registry.register(ActionSuite::new(name));
        }
        registry
    }

    /// Registers a suite under its own name, replacing any previous one.
    pub fn register(&mut self, suite: impl TestSuite + 'static) {
        self.register_shared(Arc::new(suite));
    }

    /// Registers an already shared suite.
    pub fn register_shared(&mut self, suite: Arc<dyn TestSuite>) {
        self.suites.insert(suite.name().to_string(), suite);
    }

    /// True if a suite is registered under exactly this name.
    pub fn contains(&self, name: &str) -> bool {
        self.suites.contains_key(name)
    }

    /// Name of the fallback suite.
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Registered suite names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.suites.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Removes the first matching runner-generated suffix.
    pub fn normalize<'a>(&self, name: &'a str) -> &'a str {
        self.strip_suffixes
            .iter()
            .find_map(|suffix| name.strip_suffix(suffix.as_str()))
            .unwrap_or(name)
    }

    /// Looks a suite up by name, falling back to the default suite.
    pub fn resolve(&self, name: &str) -> SuiteResolution {
        let name = self.normalize(name);
        if let Some(suite) = self.suites.get(name) {
            return SuiteResolution::Exact(Arc::clone(suite));
        }

        match self.suites.get(&self.default_name) {
            Some(suite) => {
                warn!(
                    "Could not find test suite with name '{}' using default test suite '{}'",
                    name, self.default_name
                );
                SuiteResolution::Default(Arc::clone(suite))
            }
            None => {
                warn!(
                    "Could not find test suite with name '{}' and no default test suite '{}' is registered",
                    name, self.default_name
                );
                SuiteResolution::NotFound
            }
        }
    }
}
