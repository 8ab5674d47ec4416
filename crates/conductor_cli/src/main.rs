//! Conductor CLI - run declarative integration test suites.

use anyhow::Result;
use clap::{Parser, Subcommand};
use conductor_core::Config;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "conductor")]
#[command(about = "Lifecycle orchestration for integration tests", long_about = None)]
#[command(version)]
struct Cli {
    /// Project directory
    #[arg(long, global = true, default_value = ".")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create conductor.toml and an example test
    Init {
        /// Overwrite an existing conductor.toml
        #[arg(long)]
        force: bool,
    },
    /// List discovered tests
    List,
    /// Run a suite
    Run {
        /// Suite to run (defaults to [suites].default_suite)
        #[arg(short, long)]
        suite: Option<String>,
        /// Only run tests whose qualified name contains this text
        #[arg(short, long)]
        filter: Option<String>,
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Concurrent test classes (overrides [runner].workers)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Stop after the first failing test class
        #[arg(long)]
        fail_fast: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over [logging].level
    let level = Config::load(&cli.dir)
        .map(|config| config.logging.level)
        .unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { force } => commands::init::run(&cli.dir, force),
        Commands::List => commands::list::run(&cli.dir),
        Commands::Run {
            suite,
            filter,
            format,
            workers,
            fail_fast,
        } => commands::run::run(
            &cli.dir,
            &commands::run::RunOptions {
                suite: suite.as_deref(),
                filter: filter.as_deref(),
                format: &format,
                workers,
                fail_fast,
            },
        ),
    }
}
