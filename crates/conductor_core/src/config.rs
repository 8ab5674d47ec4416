//! Configuration types for a conductor project.

use crate::error::{ConductorError, Result};
use crate::parameters::UnprovidedParameters;
use crate::test_case::Action;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// File name of the project configuration, relative to the project root.
pub const CONFIG_FILE: &str = "conductor.toml";

/// Suite name used when a lookup misses and nothing else is configured.
pub const DEFAULT_SUITE_NAME: &str = "default";

/// Comprehensive configuration for a conductor project.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Suite resolution settings.
    #[serde(default)]
    pub suites: SuitesConfig,

    /// Parameter binding settings.
    #[serde(default)]
    pub parameters: ParametersConfig,

    /// Runner settings.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Global variables copied into every new test context.
    #[serde(default)]
    pub variables: BTreeMap<String, serde_json::Value>,

    /// Declared suites.
    #[serde(default)]
    pub suite: Vec<SuiteDefinition>,
}

impl Config {
    /// Load configuration from a project root.
    ///
    /// A missing `conductor.toml` yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| ConductorError::ConfigError(format!("failed to read config: {}", e)))?;
            Self::parse(&content)
        } else {
            Ok(Config::default())
        }
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ConductorError::ConfigError(format!("failed to parse config: {}", e)))
    }

    /// Save configuration to a project root.
    pub fn save(&self, root: &Path) -> Result<()> {
        let path = root.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConductorError::ConfigError(format!("failed to serialize config: {}", e)))?;
        fs::write(&path, content)
            .map_err(|e| ConductorError::ConfigError(format!("failed to write config: {}", e)))?;
        Ok(())
    }

    /// Global variables seeded into every new context.
    pub fn global_variables(&self) -> BTreeMap<String, serde_json::Value> {
        self.variables.clone()
    }
}

/// Suite resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuitesConfig {
    /// Suite used when a lookup by name misses (default: "default").
    pub default_suite: String,

    /// Runner-generated qualifiers removed from incoming suite names
    /// before lookup (default: [" by packages"]).
    pub strip_suffixes: Vec<String>,
}

impl Default for SuitesConfig {
    fn default() -> Self {
        Self {
            default_suite: DEFAULT_SUITE_NAME.to_string(),
            strip_suffixes: vec![" by packages".to_string()],
        }
    }
}

/// Parameter binding settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParametersConfig {
    /// What to do when names are declared but no values were supplied
    /// (default: ignore).
    pub unprovided: UnprovidedParameters,
}

/// Runner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Number of test classes executed concurrently (default: 1).
    pub workers: usize,

    /// Stop scheduling new test classes after the first failure (default: false).
    pub fail_fast: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            fail_fast: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is unset (default: "warn").
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// A declaratively configured suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteDefinition {
    /// Suite name used for lookup.
    pub name: String,

    /// Actions run once before the suite.
    #[serde(default)]
    pub before_suite: Vec<Action>,

    /// Actions run before each test class.
    #[serde(default)]
    pub before_test: Vec<Action>,

    /// Actions run once after the suite.
    #[serde(default)]
    pub after_suite: Vec<Action>,
}
