use crate::harness::Scenario;
use conductor_core::{Outcome, ResolutionPath};

const ECHO: &str = r#"
[[actions]]
type = "echo"
message = "hello"
"#;

#[test]
fn test_single_test_full_lifecycle() {
    Scenario::new("single_test_full_lifecycle")
        .with_test("shop.CheckoutTest", ECHO)
        .before_suite("default")
        .assert_resolution(ResolutionPath::Exact)
        .before_test("default")
        .execute("shop.CheckoutTest")
        .assert_outcome(Outcome::Passed)
        .after_suite("default")
        .assert_events(&[
            "before_suite:default",
            "before_test:default",
            "start:CheckoutTest",
            "success:CheckoutTest",
            "finish:CheckoutTest",
            "after_suite:default",
        ])
        .assert_report(1, 0, 0)
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_global_variables_reach_every_context() {
    Scenario::new("global_variables")
        .with_config(
            r#"
            [variables]
            host = "api.internal"
            "#,
        )
        .with_test(
            "api.PingTest",
            r#"
            [[actions]]
            type = "create-variables"
            variables = { url = "https://${host}/ping" }

            [[actions]]
            type = "assert-variable"
            name = "url"
            expected = "https://api.internal/ping"
            "#,
        )
        .execute("api.PingTest")
        .assert_outcome(Outcome::Passed)
        .execute("api.PingTest")
        .assert_outcome(Outcome::Passed)
        .assert_report(2, 0, 0)
        .run()
        .unwrap();
}

#[test]
fn test_contexts_do_not_leak_between_tests() {
    Scenario::new("isolated_contexts")
        .with_test(
            "iso.Writer",
            r#"
            [[actions]]
            type = "create-variables"
            variables = { token = "secret" }
            "#,
        )
        .with_test(
            "iso.Reader",
            r#"
            [[actions]]
            type = "echo"
            message = "token is ${token}"
            "#,
        )
        .execute("iso.Writer")
        .assert_outcome(Outcome::Passed)
        .execute("iso.Reader")
        .assert_failure_cause("Reader", "unknown variable 'token'")
        .assert_report(1, 1, 0)
        .run()
        .unwrap();
}

#[test]
fn test_run_suite_end_to_end() {
    Scenario::new("run_suite_end_to_end")
        .with_test("a.First", ECHO)
        .with_test("a.Second", ECHO)
        .run_suite("default")
        .assert_summary(2, 0, 0)
        .assert_event_count("before_suite:default", 1)
        .assert_event_count("before_test:default", 2)
        .assert_event_count("after_suite:default", 1)
        .assert_balanced()
        .run()
        .unwrap();
}
