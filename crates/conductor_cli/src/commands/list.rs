//! List discovered tests.

use anyhow::{Context, Result};
use conductor_core::{DeclarativeLoader, Status, TestLoader};
use console::style;
use std::path::Path;

/// Print every test under `dir/tests` with its status and invocation count.
pub fn run(dir: &Path) -> Result<()> {
    let loader = DeclarativeLoader::new(dir);
    let identities = loader.discover().context("Failed to discover tests")?;

    if identities.is_empty() {
        println!(
            "No tests found under {}",
            loader.tests_dir().display()
        );
        return Ok(());
    }

    println!("{}", style("Tests:").bold());
    for identity in &identities {
        match loader.load_definition(identity) {
            Ok(definition) => {
                let status = definition.meta.status;
                let status = match status {
                    Status::Final => style(status.to_string()).green(),
                    Status::Disabled => style(status.to_string()).dim(),
                    _ => style(status.to_string()).yellow(),
                };
                let invocations = definition
                    .parameter_set()
                    .map_or(1, |set| set.invocation_count());
                println!(
                    "  {:<40} {:<18} {} invocation(s)",
                    identity.qualified_name(),
                    status,
                    invocations
                );
            }
            Err(e) => {
                println!(
                    "  {:<40} {} {}",
                    identity.qualified_name(),
                    style("invalid").red(),
                    e
                );
            }
        }
    }
    println!();
    println!("{} test(s)", identities.len());

    Ok(())
}
