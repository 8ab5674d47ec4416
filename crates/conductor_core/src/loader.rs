//! Loading test cases from declarative definitions.
//!
//! A project keeps one TOML file per test under `tests/`, laid out by
//! package: `com.acme.LoginTest` lives at `tests/com/acme/LoginTest.toml`.
//!
//! ```toml
//! [meta]
//! author = "qa"
//! status = "final"
//!
//! [[actions]]
//! type = "echo"
//! message = "logging in as ${user}"
//!
//! [[finally]]
//! type = "echo"
//! message = "done"
//!
//! [parameters]
//! names = ["user"]
//! values = [["alice"], ["bob"]]
//! ```

use crate::error::{ConductorError, Result};
use crate::parameters::ParameterSet;
use crate::test_case::{Action, ActionTestCase, TestCase, TestCaseMetaInfo, TestIdentity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory holding test definitions, relative to the project root.
pub const TESTS_DIR: &str = "tests";

/// Extension of test definition files.
pub const DEFINITION_EXTENSION: &str = "toml";

/// Source of test cases.
pub trait TestLoader: Send + Sync {
    /// Produces a fresh test case for `identity`.
    ///
    /// Fails with [`ConductorError::TestCaseNotFound`] when nothing is
    /// defined under that identity.
    fn load_test_case(&self, identity: &TestIdentity) -> Result<Box<dyn TestCase>>;

    /// Lists every test identity this loader can produce, sorted by
    /// package, then name.
    fn discover(&self) -> Result<Vec<TestIdentity>>;
}

/// Data provider table of a definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterTable {
    /// Declared parameter names.
    #[serde(default)]
    pub names: Option<Vec<String>>,
    /// One row of values per invocation.
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

/// Parsed content of one test definition file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestDefinition {
    /// Metadata, including status.
    #[serde(default)]
    pub meta: TestCaseMetaInfo,
    /// Actions executed in order.
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Actions executed when the test finishes.
    #[serde(default)]
    pub finally: Vec<Action>,
    /// Optional data provider.
    #[serde(default)]
    pub parameters: Option<ParameterTable>,
}

impl TestDefinition {
    /// Parses a definition from TOML text.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConductorError::InvalidDefinition {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Declared parameter names, if any.
    pub fn parameter_names(&self) -> Option<&[String]> {
        self.parameters
            .as_ref()
            .and_then(|p| p.names.as_deref())
    }

    /// The parameter set, if the definition has a data provider.
    ///
    /// A table with names but no value rows declares names only.
    pub fn parameter_set(&self) -> Option<ParameterSet> {
        self.parameters
            .as_ref()
            .filter(|p| !p.values.is_empty())
            .map(|p| ParameterSet::new(p.values.clone()))
    }

    /// Builds a runnable test case.
    pub fn to_test_case(&self, identity: TestIdentity) -> ActionTestCase {
        let test = self
            .actions
            .iter()
            .cloned()
            .fold(ActionTestCase::new(identity), |test, action| test.with_action(action));
        self.finally
            .iter()
            .cloned()
            .fold(test, |test, action| test.with_finally(action))
            .with_meta_info(self.meta.clone())
    }
}

/// Loads definitions from `<root>/tests`.
#[derive(Debug, Clone)]
pub struct DeclarativeLoader {
    root: PathBuf,
}

impl DeclarativeLoader {
    /// Creates a loader for the project at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding definitions.
    pub fn tests_dir(&self) -> PathBuf {
        self.root.join(TESTS_DIR)
    }

    /// File a test identity maps to.
    pub fn definition_path(&self, identity: &TestIdentity) -> PathBuf {
        let mut path = self.tests_dir();
        for part in identity.package.split('.').filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path.push(format!("{}.{}", identity.name, DEFINITION_EXTENSION));
        path
    }

    /// Reads and parses the definition for `identity`.
    pub fn load_definition(&self, identity: &TestIdentity) -> Result<TestDefinition> {
        let path = self.definition_path(identity);
        if !path.exists() {
            return Err(ConductorError::TestCaseNotFound(identity.qualified_name()));
        }
        debug!(test = %identity, path = %path.display(), "loading test definition");
        let content = fs::read_to_string(&path)?;
        TestDefinition::parse(&content, &path)
    }

    /// Writes a definition for `identity`, creating package directories.
    pub fn save_definition(
        &self,
        identity: &TestIdentity,
        definition: &TestDefinition,
    ) -> Result<PathBuf> {
        let path = self.definition_path(identity);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(definition).map_err(|e| {
            ConductorError::ConfigError(format!("failed to serialize definition: {}", e))
        })?;
        fs::write(&path, content)?;
        Ok(path)
    }
}

impl TestLoader for DeclarativeLoader {
    fn load_test_case(&self, identity: &TestIdentity) -> Result<Box<dyn TestCase>> {
        let definition = self.load_definition(identity)?;
        Ok(Box::new(definition.to_test_case(identity.clone())))
    }

    fn discover(&self) -> Result<Vec<TestIdentity>> {
        let dir = self.tests_dir();
        let mut found = Vec::new();
        if dir.is_dir() {
            collect_definitions(&dir, &mut Vec::new(), &mut found)?;
        }
        found.sort_by(|a, b| (&a.package, &a.name).cmp(&(&b.package, &b.name)));
        Ok(found)
    }
}

/// Recursively collect definition files, tracking the package path.
fn collect_definitions(
    dir: &Path,
    package: &mut Vec<String>,
    found: &mut Vec<TestIdentity>,
) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            package.push(entry.file_name().to_string_lossy().into_owned());
            collect_definitions(&path, package, found)?;
            package.pop();
        } else if path.extension().and_then(|e| e.to_str()) == Some(DEFINITION_EXTENSION) {
            if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                found.push(TestIdentity::new(package.join("."), name));
            }
        }
    }
    Ok(())
}
