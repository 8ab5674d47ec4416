use crate::harness::Scenario;
use conductor_core::{ErrorKind, ResolutionPath};

const FAILING_BEFORE: &str = r#"
[[suite]]
name = "default"
before_suite = [{ type = "fail", message = "database unreachable" }]
"#;

const ECHO: &str = r#"
[[actions]]
type = "echo"
message = "hello"
"#;

#[test]
fn test_runner_qualifier_is_stripped() {
    Scenario::new("strip_by_packages")
        .before_suite("default by packages")
        .assert_resolution(ResolutionPath::Exact)
        .assert_events(&["before_suite:default"])
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_unknown_suite_falls_back_to_default() {
    Scenario::new("fallback_to_default")
        .before_suite("nightly")
        .assert_resolution(ResolutionPath::Default)
        .before_test("nightly")
        .assert_resolution(ResolutionPath::Default)
        .assert_events(&["before_suite:default", "before_test:default"])
        .run()
        .unwrap();
}

#[test]
fn test_declared_suite_resolves_exactly() {
    Scenario::new("declared_suite")
        .with_config(
            r#"
            [[suite]]
            name = "smoke"
            before_suite = [{ type = "echo", message = "smoke starting" }]
            "#,
        )
        .before_suite("smoke")
        .assert_resolution(ResolutionPath::Exact)
        .after_suite("smoke")
        .assert_no_error()
        .assert_events(&["before_suite:smoke", "after_suite:smoke"])
        .run()
        .unwrap();
}

#[test]
fn test_failing_before_suite_is_a_hook_error() {
    Scenario::new("failing_before_suite")
        .with_config(FAILING_BEFORE)
        .before_suite("default")
        .assert_error_kind(ErrorKind::SuiteHook)
        .assert_error_contains("before suite failed with errors for suite 'default'")
        .run()
        .unwrap();
}

#[test]
fn test_after_suite_requires_a_started_suite() {
    Scenario::new("after_suite_not_started")
        .after_suite("default")
        .assert_no_error()
        .assert_event_count("after_suite:default", 0)
        .run()
        .unwrap();
}

#[test]
fn test_after_suite_runs_once() {
    Scenario::new("after_suite_once")
        .before_suite("default")
        .after_suite("default")
        .after_suite("default")
        .assert_event_count("after_suite:default", 1)
        .run()
        .unwrap();
}

#[test]
fn test_failing_after_suite_is_reported() {
    Scenario::new("failing_after_suite")
        .with_config(
            r#"
            [[suite]]
            name = "default"
            after_suite = [{ type = "fail", message = "cleanup failed" }]
            "#,
        )
        .before_suite("default")
        .after_suite("default")
        .assert_error_kind(ErrorKind::SuiteHook)
        .assert_error_contains("after suite failed with errors for suite 'default'")
        .run()
        .unwrap();
}

#[test]
fn test_failing_before_suite_aborts_run() {
    Scenario::new("run_aborted_by_before_suite")
        .with_config(FAILING_BEFORE)
        .with_test("a.First", ECHO)
        .with_test("a.Second", ECHO)
        .run_suite("default")
        .assert_error_kind(ErrorKind::SuiteHook)
        .assert_event_count("start:First", 0)
        .assert_event_count("start:Second", 0)
        .assert_event_count("before_test:default", 0)
        .assert_event_count("after_suite:default", 1)
        .assert_report(0, 0, 0)
        .run()
        .unwrap();
}
