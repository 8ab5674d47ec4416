//! Initialize a new conductor project.

use anyhow::{Context, Result};
use conductor_core::{
    Action, Config, DeclarativeLoader, ParameterTable, TestCaseMetaInfo, TestDefinition,
    TestIdentity, CONFIG_FILE,
};
use console::style;
use serde_json::json;
use std::path::Path;

/// Write a default `conductor.toml` and an example test under `dir`.
pub fn run(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE);
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite it.",
            config_path.display()
        );
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let config = Config::default();
    config
        .save(dir)
        .context("Failed to write configuration")?;

    let loader = DeclarativeLoader::new(dir);
    let identity = TestIdentity::new("example", "HelloTest");
    let test_path = loader
        .save_definition(&identity, &example_definition())
        .context("Failed to write example test")?;

    println!(
        "{} Initialized conductor project in {}",
        style("✓").green(),
        dir.display()
    );
    println!();
    println!("  {:<28} - Project configuration", CONFIG_FILE);
    println!(
        "  {:<28} - Example parameterized test",
        test_path
            .strip_prefix(dir)
            .unwrap_or(&test_path)
            .display()
    );
    println!();
    println!("Run it with {}", style("conductor run").cyan());

    Ok(())
}

fn example_definition() -> TestDefinition {
    TestDefinition {
        meta: TestCaseMetaInfo {
            author: Some("conductor".to_string()),
            description: Some("Greets every user from the parameter table".to_string()),
            ..TestCaseMetaInfo::default()
        },
        actions: vec![
            Action::CreateVariables {
                variables: [("greeting".to_string(), json!("Hello ${user}"))].into(),
            },
            Action::Echo {
                message: "${greeting}".to_string(),
            },
            Action::AssertVariable {
                name: "greeting".to_string(),
                expected: json!("Hello ${user}"),
            },
        ],
        finally: vec![Action::Echo {
            message: "done greeting ${user}".to_string(),
        }],
        parameters: Some(ParameterTable {
            names: Some(vec!["user".to_string()]),
            values: vec![vec![json!("alice")], vec![json!("bob")]],
        }),
    }
}
