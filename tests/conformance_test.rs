//! End-to-end suite runs against the in-memory cloud.

mod common;

use common::{
    client_for, client_with_config, fake_config, FakeCloud, DEFAULT_GROUP_ID, NETWORK_URL,
    STORAGE_URL, TOKEN,
};
use openstack_conformance::config::ConformanceConfig;
use openstack_conformance::transport::Method;
use openstack_conformance::{
    all_suites, run_suite, AccountSuite, ConformanceSuite, Format, SecurityGroupSuite, TestOutcome,
};
use std::sync::Arc;
use test_case::test_case;

#[test_case(Format::Json ; "json")]
#[test_case(Format::Xml ; "xml")]
#[tokio::test]
async fn test_security_group_suite_passes(format: Format) {
    let cloud = Arc::new(FakeCloud::new());
    let suite = SecurityGroupSuite::new(client_for(cloud.clone(), format));

    let report = run_suite(&suite, None).await;

    for case in &report.cases {
        assert_eq!(case.outcome, TestOutcome::Passed, "{} in {}", case.name, format);
    }
    assert_eq!(report.passed(), 6);
    assert_eq!(report.format, format);

    // Every created resource was cleaned up.
    assert_eq!(cloud.group_ids(), vec![DEFAULT_GROUP_ID.to_string()]);
    assert!(cloud.rule_ids().is_empty());
}

#[test_case(Format::Json ; "json")]
#[test_case(Format::Xml ; "xml")]
#[tokio::test]
async fn test_network_requests_use_interface_mode(format: Format) {
    let cloud = Arc::new(FakeCloud::new());
    let suite = SecurityGroupSuite::new(client_for(cloud.clone(), format));

    run_suite(&suite, Some("test_create_show_delete_security_group_rule")).await;

    let posts: Vec<_> = cloud
        .requests()
        .into_iter()
        .filter(|r| r.method == Method::Post)
        .collect();
    assert!(!posts.is_empty());
    for request in posts {
        assert_eq!(request.get_header("Content-Type"), Some(format.content_type()));
        assert_eq!(request.get_header("Accept"), Some(format.content_type()));
    }
}

#[tokio::test]
async fn test_account_suite_passes() {
    let cloud = Arc::new(FakeCloud::new());
    let suite = AccountSuite::new(client_for(cloud.clone(), Format::Xml));

    let report = run_suite(&suite, None).await;

    assert!(report.is_success(), "{:?}", report.cases);
    assert_eq!(report.passed(), 3);
    assert!(cloud.account_metadata().is_empty());

    // Listings stay JSON in XML mode.
    assert!(cloud
        .requests()
        .iter()
        .any(|r| r.method == Method::Get && r.url == format!("{}?format=json", STORAGE_URL)));
}

#[tokio::test]
async fn test_cleanup_runs_after_failed_assertion() {
    let cloud = Arc::new(FakeCloud::new().with_rule_direction("egress"));
    let suite = SecurityGroupSuite::new(client_for(cloud.clone(), Format::Json));

    let report = run_suite(&suite, Some("with_additional_args")).await;

    let case = report
        .case("test_create_security_group_rule_with_additional_args")
        .unwrap();
    match &case.outcome {
        TestOutcome::Failed { reason } => assert!(reason.contains("direction"), "{}", reason),
        other => panic!("expected failure, got {:?}", other),
    }

    assert_eq!(cloud.group_ids(), vec![DEFAULT_GROUP_ID.to_string()]);
    assert!(cloud.rule_ids().is_empty());
}

#[tokio::test]
async fn test_failed_cleanup_fails_passing_test() {
    let cloud = Arc::new(FakeCloud::new().with_failing_group_deletes(409));
    let suite = SecurityGroupSuite::new(client_for(cloud.clone(), Format::Json));

    let report = run_suite(&suite, Some("test_create_show_delete_security_group")).await;

    let case = report.case("test_create_show_delete_security_group").unwrap();
    match &case.outcome {
        TestOutcome::Failed { reason } => {
            assert!(reason.contains("cleanup failed"), "{}", reason);
            assert!(reason.contains("409"), "{}", reason);
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_disabled_extension_skips_suite() {
    let cloud = Arc::new(FakeCloud::new());
    let config = ConformanceConfig::builder()
        .token(TOKEN)
        .network_endpoint(NETWORK_URL)
        .object_storage_endpoint(STORAGE_URL)
        .network_extensions(["router", "quotas"])
        .build()
        .unwrap();
    let suite = SecurityGroupSuite::new(client_with_config(cloud.clone(), Format::Json, config));

    let report = run_suite(&suite, None).await;

    assert_eq!(report.skipped(), 6);
    assert!(report.is_success());
    assert!(cloud.requests().is_empty());
}

#[tokio::test]
async fn test_disabled_service_skips_suite() {
    let cloud = Arc::new(FakeCloud::new());
    let config = ConformanceConfig::builder()
        .token(TOKEN)
        .network_endpoint(NETWORK_URL)
        .object_storage_endpoint(STORAGE_URL)
        .object_storage_enabled(false)
        .build()
        .unwrap();
    let suite = AccountSuite::new(client_with_config(cloud.clone(), Format::Json, config));

    let report = run_suite(&suite, None).await;

    assert_eq!(report.skipped(), 3);
    assert!(cloud.requests().is_empty());
}

#[tokio::test]
async fn test_listing_is_idempotent() {
    let cloud = Arc::new(FakeCloud::new());
    let suite = SecurityGroupSuite::new(client_for(cloud.clone(), Format::Xml));

    let report = run_suite(&suite, Some("is_stable")).await;

    assert_eq!(report.passed(), 1);
    assert_eq!(cloud.count(Method::Get, "/v2.0/security-groups"), 2);
    assert_eq!(cloud.group_ids(), vec![DEFAULT_GROUP_ID.to_string()]);
}

#[tokio::test]
async fn test_lifecycle_cleanup_tolerates_deleted_resources() {
    let cloud = Arc::new(FakeCloud::new());
    let suite = SecurityGroupSuite::new(client_for(cloud.clone(), Format::Json));

    let report = run_suite(&suite, Some("lifecycle")).await;

    assert_eq!(report.passed(), 1);
    // Explicit deletes plus the registered cleanups that find nothing left.
    assert_eq!(cloud.count(Method::Delete, "/v2.0/security-groups/"), 2);
    assert_eq!(cloud.count(Method::Delete, "/v2.0/security-group-rules/"), 2);
}

#[test_case(Format::Json ; "json")]
#[test_case(Format::Xml ; "xml")]
#[tokio::test]
async fn test_lifecycle_checks_shown_rule_fields(format: Format) {
    let cloud = Arc::new(FakeCloud::new().with_rule_direction("egress"));
    let suite = SecurityGroupSuite::new(client_for(cloud.clone(), format));

    let report = run_suite(&suite, Some("lifecycle")).await;

    let case = report.case("test_security_group_lifecycle").unwrap();
    match &case.outcome {
        TestOutcome::Failed { reason } => {
            assert!(reason.contains("direction"), "{}", reason);
            assert!(reason.contains("egress"), "{}", reason);
        }
        other => panic!("expected failure, got {:?}", other),
    }

    let rule_post = cloud
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Post && r.url.ends_with("/v2.0/security-group-rules"))
        .unwrap();
    let sent = String::from_utf8(rule_post.body.unwrap().to_vec()).unwrap();
    assert!(sent.contains("ingress"), "{}", sent);
    assert!(sent.contains("77"), "{}", sent);

    assert_eq!(cloud.group_ids(), vec![DEFAULT_GROUP_ID.to_string()]);
    assert!(cloud.rule_ids().is_empty());
}

#[tokio::test]
async fn test_all_suites_in_both_modes() {
    let cloud = Arc::new(FakeCloud::new());
    let config = Arc::new(fake_config());

    for format in config.interfaces.clone() {
        let suites: Vec<Box<dyn ConformanceSuite>> = all_suites(client_for(cloud.clone(), format));
        assert_eq!(suites.len(), 2);
        for suite in suites {
            let report = run_suite(suite.as_ref(), None).await;
            assert!(report.is_success(), "{} [{}]: {:?}", report.suite, format, report.cases);
        }
    }
}

#[tokio::test]
async fn test_wrong_token_fails_with_unauthorized() {
    let cloud = Arc::new(FakeCloud::new());
    let config = ConformanceConfig::builder()
        .token("stale-token")
        .network_endpoint(NETWORK_URL)
        .object_storage_endpoint(STORAGE_URL)
        .build()
        .unwrap();
    let suite = SecurityGroupSuite::new(client_with_config(cloud, Format::Json, config));

    let report = run_suite(&suite, Some("test_list_security_groups")).await;

    for case in &report.cases {
        match &case.outcome {
            TestOutcome::Failed { reason } => assert!(reason.contains("401"), "{}", reason),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
