use super::assertions::Assertion;
use super::recorder::{Event, EventRecorder, RecordingSuite};
use super::steps::ScenarioStep;
use super::workspace::TestWorkspace;
use anyhow::{anyhow, Context, Result};
use conductor_core::{
    error_chain, ActionSuite, ConductorError, DefaultContextFactory, Invocation, Orchestrator,
    Outcome, ReportListener, ResolutionPath, RunSummary, SuiteRegistry, SuiteRunner, TestClass,
    TestIdentity, TestPlan,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Result of the most recent orchestration step
#[derive(Debug)]
enum StepResult {
    Outcome(Outcome),
    Resolution(ResolutionPath),
    Summary(RunSummary),
    Error(ConductorError),
}

/// Executes scenarios against a real orchestrator
pub struct ScenarioRunner {
    workspace: TestWorkspace,
    recorder: Arc<EventRecorder>,
    report: Arc<ReportListener>,
    orchestrator: Option<Orchestrator>,
    last: Option<StepResult>,
    current_step: usize,
}

impl ScenarioRunner {
    /// Create a new runner with initial project files
    pub fn new(initial_files: HashMap<String, Vec<u8>>) -> Result<Self> {
        Ok(Self {
            workspace: TestWorkspace::with_files(initial_files)?,
            recorder: EventRecorder::new(),
            report: Arc::new(ReportListener::new()),
            orchestrator: None,
            last: None,
            current_step: 0,
        })
    }

    /// Get current step number
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Execute all steps in sequence
    pub fn execute(&mut self, steps: &[ScenarioStep]) -> Result<()> {
        for (i, step) in steps.iter().enumerate() {
            self.current_step = i;
            self.execute_step(step)
                .with_context(|| format!("Step {}: {:?}", i, step))?;
        }
        Ok(())
    }

    fn execute_step(&mut self, step: &ScenarioStep) -> Result<()> {
        match step {
            ScenarioStep::WriteFile { path, content } => {
                self.orchestrator = None;
                self.workspace.write_file(path, content)
            }
            ScenarioStep::WriteDefinition { test, content } => {
                self.workspace.write_definition(test, content)
            }
            ScenarioStep::CopyFixture { name } => {
                self.orchestrator = None;
                self.workspace.copy_fixture(name)
            }

            ScenarioStep::BeforeSuite { suite } => {
                let result = self.orchestrator()?.before_suite(suite);
                self.last = Some(result.map_or_else(StepResult::Error, StepResult::Resolution));
                Ok(())
            }
            ScenarioStep::BeforeTest { suite } => {
                let result = self.orchestrator()?.before_test(suite);
                self.last = Some(result.map_or_else(StepResult::Error, StepResult::Resolution));
                Ok(())
            }
            ScenarioStep::AfterSuite { suite } => {
                let result = self.orchestrator()?.after_suite(suite);
                self.last = Some(result.map_or_else(StepResult::Error, StepResult::Resolution));
                Ok(())
            }

            ScenarioStep::Execute { test, invocation } => self.handle_execute(test, Some(*invocation)),
            ScenarioStep::ExecuteAll { test } => self.handle_execute(test, None),
            ScenarioStep::RunSuite {
                suite,
                filter,
                workers,
                fail_fast,
            } => self.handle_run_suite(suite, filter.as_deref(), *workers, *fail_fast),

            ScenarioStep::Assert { assertion } => self.handle_assertion(assertion),
        }
    }

    /// The orchestrator for the current project state, built on first use
    fn orchestrator(&mut self) -> Result<&Orchestrator> {
        if self.orchestrator.is_none() {
            let config = self.workspace.config()?;
            let globals = config.global_variables();

            let mut suites = SuiteRegistry::new(&config.suites);
            for definition in &config.suite {
                suites.register(RecordingSuite::new(
                    ActionSuite::from_definition(definition, globals.clone()),
                    self.recorder.clone(),
                ));
            }
            if !suites.contains(suites.default_name()) {
                let name = suites.default_name().to_string();
                suites.register(RecordingSuite::new(
                    ActionSuite::new(name),
                    self.recorder.clone(),
                ));
            }

            self.orchestrator = Some(
                Orchestrator::builder()
                    .suites(suites)
                    .shared_listener(self.recorder.clone())
                    .shared_listener(self.report.clone())
                    .context_factory(DefaultContextFactory::with_globals(globals))
                    .unprovided_parameters(config.parameters.unprovided)
                    .build(),
            );
        }
        self.orchestrator
            .as_ref()
            .ok_or_else(|| anyhow!("Orchestrator not available"))
    }

    // ===== Execution handlers =====

    fn handle_execute(&mut self, test: &str, invocation: Option<usize>) -> Result<()> {
        let loader = self.workspace.loader();
        let identity = TestIdentity::parse(test);
        let class = match loader.load_definition(&identity) {
            Ok(definition) => TestClass::new(identity.clone()).with_parameters(
                definition.parameter_names().map(<[String]>::to_vec),
                definition.parameter_set(),
            ),
            Err(_) => TestClass::new(identity.clone()),
        };

        let indices: Vec<usize> = match invocation {
            Some(index) => vec![index],
            None => (0..class.invocation_count()).collect(),
        };

        let orchestrator = self.orchestrator()?;
        let mut last = None;
        for index in indices {
            let invocation = Invocation {
                names: class.parameter_names.as_deref(),
                set: class.parameters.as_ref(),
                index,
            };
            last = Some(
                orchestrator
                    .load_and_execute(&loader, &identity, &invocation)
                    .map_or_else(StepResult::Error, StepResult::Outcome),
            );
        }
        self.last = last;
        Ok(())
    }

    fn handle_run_suite(
        &mut self,
        suite: &str,
        filter: Option<&str>,
        workers: usize,
        fail_fast: bool,
    ) -> Result<()> {
        let loader = self.workspace.loader();
        let plan = TestPlan::discover(&loader, suite, filter)?;
        let result = SuiteRunner::new(self.orchestrator()?, &loader)
            .workers(workers)
            .fail_fast(fail_fast)
            .run(&plan);
        self.last = Some(result.map_or_else(StepResult::Error, StepResult::Summary));
        Ok(())
    }

    // ===== Assertion handlers =====

    fn handle_assertion(&mut self, assertion: &Assertion) -> Result<()> {
        match assertion {
            Assertion::Events(expected) => {
                let actual = self.recorder.rendered();
                if &actual != expected {
                    return Err(anyhow!(
                        "Event mismatch:\n  expected: {:?}\n  actual:   {:?}",
                        expected,
                        actual
                    ));
                }
            }

            Assertion::EventsContain(event) => {
                let actual = self.recorder.rendered();
                if !actual.contains(event) {
                    return Err(anyhow!("Event {:?} not recorded in {:?}", event, actual));
                }
            }

            Assertion::EventCount { event, count } => {
                let actual = self
                    .recorder
                    .rendered()
                    .iter()
                    .filter(|e| *e == event)
                    .count();
                if actual != *count {
                    return Err(anyhow!(
                        "Expected {} x {:?}, recorded {}",
                        count,
                        event,
                        actual
                    ));
                }
            }

            Assertion::FailureCauseContains { test, text } => {
                let found = self.recorder.events().into_iter().any(|e| match e {
                    Event::Failure { test: t, cause } => &t == test && cause.contains(text.as_str()),
                    _ => false,
                });
                if !found {
                    return Err(anyhow!(
                        "No failure of {:?} with cause containing {:?}: {:?}",
                        test,
                        text,
                        self.recorder.events()
                    ));
                }
            }

            Assertion::EveryStartFinished => {
                let mut open: HashMap<String, i64> = HashMap::new();
                for event in self.recorder.events() {
                    match &event {
                        Event::Start(t) => *open.entry(t.clone()).or_default() += 1,
                        Event::Finish(t) => {
                            let count = open.entry(t.clone()).or_default();
                            *count -= 1;
                            if *count < 0 {
                                return Err(anyhow!("finish:{} without a matching start", t));
                            }
                        }
                        _ => {}
                    }
                }
                if let Some((test, n)) = open.iter().find(|(_, n)| **n != 0) {
                    return Err(anyhow!("{} start(s) of {} never finished", n, test));
                }
            }

            Assertion::Outcome(expected) => match &self.last {
                Some(StepResult::Outcome(actual)) if actual == expected => {}
                other => return Err(anyhow!("Expected outcome {:?}, got {:?}", expected, other)),
            },

            Assertion::ErrorKind(expected) => match &self.last {
                Some(StepResult::Error(e)) if e.kind() == *expected => {}
                other => return Err(anyhow!("Expected {:?} error, got {:?}", expected, other)),
            },

            Assertion::ErrorContains(text) => match &self.last {
                Some(StepResult::Error(e)) if error_chain(e).contains(text.as_str()) => {}
                Some(StepResult::Error(e)) => {
                    return Err(anyhow!(
                        "Error {:?} does not contain {:?}",
                        error_chain(e),
                        text
                    ))
                }
                other => return Err(anyhow!("Expected an error, got {:?}", other)),
            },

            Assertion::NoError => {
                if let Some(StepResult::Error(e)) = &self.last {
                    return Err(anyhow!("Unexpected error: {}", error_chain(e)));
                }
            }

            Assertion::Resolution(expected) => match &self.last {
                Some(StepResult::Resolution(actual)) if actual == expected => {}
                other => {
                    return Err(anyhow!("Expected resolution {:?}, got {:?}", expected, other))
                }
            },

            Assertion::Summary {
                passed,
                failed,
                skipped,
            } => match &self.last {
                Some(StepResult::Summary(s))
                    if s.passed == *passed && s.failed == *failed && s.skipped == *skipped => {}
                other => {
                    return Err(anyhow!(
                        "Expected summary {}/{}/{} (passed/failed/skipped), got {:?}",
                        passed,
                        failed,
                        skipped,
                        other
                    ))
                }
            },

            Assertion::Report {
                passed,
                failed,
                skipped,
            } => {
                let report = self.report.report();
                if report.passed() != *passed
                    || report.failed() != *failed
                    || report.skipped() != *skipped
                {
                    return Err(anyhow!(
                        "Expected report {}/{}/{} (passed/failed/skipped), got {}/{}/{}",
                        passed,
                        failed,
                        skipped,
                        report.passed(),
                        report.failed(),
                        report.skipped()
                    ));
                }
            }

            Assertion::ReportParameters { test, parameters } => {
                let report = self.report.report();
                let found = report
                    .results
                    .iter()
                    .any(|r| &r.test == test && &r.parameters == parameters);
                if !found {
                    return Err(anyhow!(
                        "No result for {:?} with parameters {:?} in {:?}",
                        test,
                        parameters,
                        report.results
                    ));
                }
            }

            Assertion::Custom(check) => {
                check(&self.report.report())?;
            }
        }
        Ok(())
    }
}
