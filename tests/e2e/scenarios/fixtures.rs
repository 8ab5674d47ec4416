use crate::harness::{Assertion, Scenario};
use anyhow::ensure;
use conductor_core::{Outcome, TestReport};

#[test]
fn test_default_fixture_runs_green() {
    Scenario::new("default_fixture")
        .from_fixture("default")
        .run_suite("default")
        .assert_no_error()
        .assert_summary(3, 0, 1)
        .assert_report(3, 0, 1)
        .assert_events(&[
            "before_suite:default",
            "before_test:default",
            "start:CheckoutTest",
            "success:CheckoutTest",
            "finish:CheckoutTest",
            "before_test:default",
            "skipped:LegacyPaymentTest",
            "before_test:default",
            "start:LoginTest",
            "success:LoginTest",
            "finish:LoginTest",
            "start:LoginTest",
            "success:LoginTest",
            "finish:LoginTest",
            "after_suite:default",
        ])
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_default_fixture_report_details() {
    Scenario::new("default_fixture_report")
        .from_fixture("default")
        .run_suite("default")
        .assert_reported_parameters("LoginTest", &["'alice'", "'admin'"])
        .assert(Assertion::Custom(Box::new(|report: &TestReport| {
            let skipped: Vec<&str> = report
                .results
                .iter()
                .filter(|r| r.outcome == Outcome::Skipped)
                .map(|r| r.test.as_str())
                .collect();
            ensure!(
                skipped == ["LegacyPaymentTest"],
                "unexpected skipped tests: {:?}",
                skipped
            );
            Ok(())
        })))
        .run()
        .unwrap();
}
