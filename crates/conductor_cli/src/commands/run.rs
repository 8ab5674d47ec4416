//! Run command - execute a suite and report results.

use anyhow::{Context, Result};
use chrono::Local;
use conductor_core::{
    error_chain, Config, DeclarativeLoader, ListenerResult, LoggingListener, Orchestrator,
    Outcome, ReportListener, RunSummary, SuiteRunner, TestCase, TestListener, TestListeners,
    TestPlan, TestReport,
};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;

/// Options for `conductor run`.
pub struct RunOptions<'a> {
    pub suite: Option<&'a str>,
    pub filter: Option<&'a str>,
    pub format: &'a str,
    pub workers: Option<usize>,
    pub fail_fast: bool,
}

/// Advances a progress bar as tests complete.
struct ProgressListener {
    bar: ProgressBar,
}

impl TestListener for ProgressListener {
    fn on_test_start(&self, test: &dyn TestCase) -> ListenerResult {
        self.bar.set_message(test.qualified_name());
        Ok(())
    }

    fn on_test_skipped(&self, _test: &dyn TestCase) -> ListenerResult {
        self.bar.inc(1);
        Ok(())
    }

    fn on_test_finish(&self, _test: &dyn TestCase) -> ListenerResult {
        self.bar.inc(1);
        Ok(())
    }
}

/// Run the tests under `dir` and print a summary or JSON report.
pub fn run(dir: &Path, options: &RunOptions<'_>) -> Result<()> {
    if !matches!(options.format, "text" | "json") {
        anyhow::bail!("Unsupported format: {}. Use 'text' or 'json'.", options.format);
    }

    let config = Config::load(dir).context("Failed to load configuration")?;
    let loader = DeclarativeLoader::new(dir);
    let suite = options
        .suite
        .unwrap_or(&config.suites.default_suite)
        .to_string();
    let plan = TestPlan::discover(&loader, suite, options.filter)
        .context("Failed to discover tests")?;

    let started_at = Local::now();
    let text = options.format == "text";
    if text {
        println!(
            "{} Running {} test(s) in suite '{}' ({})",
            style("→").cyan(),
            plan.classes.len(),
            plan.suite,
            started_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    let bar = if text {
        ProgressBar::new(plan.invocation_count() as u64)
    } else {
        ProgressBar::hidden()
    };
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:40} [{bar:40.cyan/blue}] {pos}/{len}")
            .context("Invalid progress bar template")?
            .progress_chars("█▓▒░  "),
    );

    let report = Arc::new(ReportListener::new());
    let mut listeners = TestListeners::new();
    listeners.register(LoggingListener);
    listeners.register_shared(report.clone());
    listeners.register(ProgressListener { bar: bar.clone() });

    let orchestrator = Orchestrator::from_config(&config, listeners);
    let mut runner = SuiteRunner::new(&orchestrator, &loader)
        .with_config(&config.runner)
        .fail_fast(config.runner.fail_fast || options.fail_fast);
    if let Some(workers) = options.workers {
        runner = runner.workers(workers);
    }

    let result = runner.run(&plan);
    bar.finish_and_clear();

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            if let Some(hint) = e.recovery_suggestion() {
                eprintln!("{} {}", style("Hint:").cyan(), hint);
            }
            return Err(e).context(format!("Suite '{}' aborted", plan.suite));
        }
    };

    let report = report.report();
    if text {
        print_summary(&report, &summary);
    } else {
        let json = serde_json::json!({
            "suite": plan.suite,
            "started_at": started_at.to_rfc3339(),
            "report": report,
            "after_suite_error": summary.after_suite_error.as_ref().map(|e| error_chain(e)),
        });
        let json = serde_json::to_string_pretty(&json).context("Failed to serialize to JSON")?;
        println!("{}", json);
    }

    if let Some(e) = &summary.after_suite_error {
        anyhow::bail!("{}", error_chain(e));
    }
    if summary.failed > 0 {
        anyhow::bail!("{} test invocation(s) failed", summary.failed);
    }
    Ok(())
}

fn print_summary(report: &TestReport, summary: &RunSummary) {
    println!();
    for result in &report.results {
        let marker = match result.outcome {
            Outcome::Passed => style("✓").green(),
            Outcome::Failed => style("×").red(),
            Outcome::Skipped => style("-").dim(),
        };
        let parameters = if result.parameters.is_empty() {
            String::new()
        } else {
            format!(" [{}]", result.parameters.join(", "))
        };
        let name = if result.package.is_empty() {
            result.test.clone()
        } else {
            format!("{}.{}", result.package, result.test)
        };
        println!(
            "  {} {}{} ({} ms)",
            marker, name, parameters, result.duration_ms
        );
    }

    if !summary.failures.is_empty() {
        println!();
        println!("{}", style("Failures:").red().bold());
        for failure in &summary.failures {
            println!(
                "  {} {} #{}: {}",
                style("×").red(),
                failure.test,
                failure.invocation,
                failure.message
            );
        }
    }

    println!();
    println!("{}", style("Summary:").bold());
    println!("  Passed:  {}", style(summary.passed).green());
    println!(
        "  Failed:  {}",
        if summary.failed > 0 {
            style(summary.failed).red()
        } else {
            style(summary.failed).green()
        }
    );
    println!("  Skipped: {}", style(summary.skipped).yellow());
    println!("  Total:   {}", summary.total());

    if let Some(e) = &summary.after_suite_error {
        println!();
        println!("{} {}", style("after suite:").red().bold(), error_chain(e));
    }
}
