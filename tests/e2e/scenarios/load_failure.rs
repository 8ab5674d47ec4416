use crate::harness::Scenario;
use conductor_core::ErrorKind;

#[test]
fn test_missing_definition_still_reported() {
    Scenario::new("missing_definition")
        .execute("shop.Ghost")
        .assert_error_kind(ErrorKind::Configuration)
        .assert_error_contains("test case not found: shop.Ghost")
        .assert_events(&["start:Ghost", "failure:Ghost", "finish:Ghost"])
        .assert_failure_cause("Ghost", "test case not found")
        .assert_report(0, 1, 0)
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_malformed_definition_is_invalid() {
    Scenario::new("malformed_definition")
        .with_test(
            "shop.Broken",
            r#"
            [[actions]]
            type = "teleport"
            "#,
        )
        .execute("shop.Broken")
        .assert_error_kind(ErrorKind::Configuration)
        .assert_error_contains("invalid definition")
        .assert_events(&["start:Broken", "failure:Broken", "finish:Broken"])
        .run()
        .unwrap();
}

#[test]
fn test_runner_counts_load_failures() {
    Scenario::new("runner_load_failure")
        .with_test("shop.Broken", "this is = not [toml")
        .with_test(
            "shop.Fine",
            r#"
            [[actions]]
            type = "echo"
            message = "fine"
            "#,
        )
        .run_suite("default")
        .assert_summary(1, 1, 0)
        .assert_balanced()
        .run()
        .unwrap();
}

#[test]
fn test_fixed_definition_is_picked_up() {
    Scenario::new("fixed_definition")
        .with_test("shop.Flaky", "[[actions]]\ntype = \"teleport\"\n")
        .execute("shop.Flaky")
        .assert_error_contains("invalid definition")
        .writes_file(
            "tests/shop/Flaky.toml",
            b"[[actions]]\ntype = \"echo\"\nmessage = \"fixed\"\n",
        )
        .execute("shop.Flaky")
        .assert_no_error()
        .assert_report(1, 1, 0)
        .run()
        .unwrap();
}
