//! Security group conformance tests.

use super::{deleted_or_missing, string_field};
use crate::client::CloudClient;
use crate::harness::assertions::{
    assert_contains, assert_field_eq, assert_not_contains, assert_some, assert_status,
};
use crate::harness::{
    rand_name, AssertionError, ConformanceSuite, TestContext, TestError, TestResult,
};
use crate::services::SecurityGroupsClient;
use crate::types::{Format, SecurityGroup, SecurityGroupRule, SecurityGroupRuleRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

const EXTENSION: &str = "security-group";

const TESTS: &[&str] = &[
    "test_list_security_groups",
    "test_create_show_delete_security_group",
    "test_create_show_delete_security_group_rule",
    "test_create_security_group_rule_with_additional_args",
    "test_list_security_groups_is_stable",
    "test_security_group_lifecycle",
];

/// Security group and rule behaviour of the network service.
pub struct SecurityGroupSuite {
    client: Arc<dyn CloudClient>,
}

impl SecurityGroupSuite {
    /// Create the suite for `client`'s interface mode.
    pub fn new(client: Arc<dyn CloudClient>) -> Self {
        Self { client }
    }

    fn groups(&self) -> &SecurityGroupsClient {
        self.client.security_groups()
    }

    /// Create a uniquely named group and register its deletion.
    async fn create_security_group(&self, ctx: &TestContext) -> TestResult<(Value, String)> {
        let name = rand_name("secgroup");
        let response = self
            .groups()
            .create_security_group(&name, Some("created by the conformance suite"))
            .await?;
        assert_status(&response, 201)?;

        let group = assert_some(
            response.body.get("security_group").cloned(),
            "create response carries security_group",
        )?;
        let id = string_field(&group, "id")?;

        let client = self.groups().clone();
        ctx.add_cleanup(format!("delete security group {}", id), move || async move {
            deleted_or_missing(client.delete_security_group(&id).await, "security group")
        });

        Ok((group, name))
    }

    async fn create_rule(
        &self,
        ctx: &TestContext,
        group_id: &str,
        rule: &SecurityGroupRuleRequest,
    ) -> TestResult<Value> {
        let response = self
            .groups()
            .create_security_group_rule(group_id, rule)
            .await?;
        assert_status(&response, 201)?;

        let rule = assert_some(
            response.body.get("security_group_rule").cloned(),
            "create response carries security_group_rule",
        )?;
        let id = string_field(&rule, "id")?;

        let client = self.groups().clone();
        ctx.add_cleanup(format!("delete security group rule {}", id), move || async move {
            deleted_or_missing(
                client.delete_security_group_rule(&id).await,
                "security group rule",
            )
        });

        Ok(rule)
    }

    async fn list_group_ids(&self) -> TestResult<Vec<String>> {
        let response = self.groups().list_security_groups().await?;
        assert_status(&response, 200)?;
        let groups: Vec<SecurityGroup> = response.body.decode_list("security_groups")?;
        Ok(groups.into_iter().map(|g| g.id).collect())
    }

    async fn test_list_security_groups(&self) -> TestResult {
        let response = self.groups().list_security_groups().await?;
        assert_status(&response, 200)?;

        let groups: Vec<SecurityGroup> = response.body.decode_list("security_groups")?;
        assert_some(
            groups.iter().find(|g| g.name == "default"),
            "security group list contains the default group",
        )?;
        Ok(())
    }

    async fn test_create_show_delete_security_group(&self, ctx: &TestContext) -> TestResult {
        let (group, name) = self.create_security_group(ctx).await?;
        let id = string_field(&group, "id")?;

        let response = self.groups().show_security_group(&id).await?;
        assert_status(&response, 200)?;
        let shown: SecurityGroup = response.body.decode("security_group")?;
        if shown.name != name {
            return Err(AssertionError::new("shown group name", name, shown.name).into());
        }

        let ids = self.list_group_ids().await?;
        let listed = ids.iter().filter(|listed| **listed == id).count();
        if listed != 1 {
            return Err(AssertionError::new(
                "created group is listed once",
                "1",
                listed.to_string(),
            )
            .into());
        }
        Ok(())
    }

    async fn test_create_show_delete_security_group_rule(&self, ctx: &TestContext) -> TestResult {
        let (group, _) = self.create_security_group(ctx).await?;
        let group_id = string_field(&group, "id")?;

        let mut last_rule_id = None;
        for protocol in ["tcp", "udp", "icmp"] {
            let rule = self
                .create_rule(ctx, &group_id, &SecurityGroupRuleRequest::new().protocol(protocol))
                .await?;
            last_rule_id = Some(string_field(&rule, "id")?);
        }
        let rule_id = assert_some(last_rule_id, "a rule was created")?;

        let response = self.groups().show_security_group_rule(&rule_id).await?;
        assert_status(&response, 200)?;

        let response = self.groups().list_security_group_rules().await?;
        assert_status(&response, 200)?;
        let rules: Vec<SecurityGroupRule> = response.body.decode_list("security_group_rules")?;
        let ids: Vec<String> = rules.into_iter().map(|r| r.id).collect();
        assert_contains(&ids, &rule_id, "created rule is listed")?;
        Ok(())
    }

    async fn test_create_security_group_rule_with_additional_args(
        &self,
        ctx: &TestContext,
    ) -> TestResult {
        let (group, _) = self.create_security_group(ctx).await?;
        let group_id = string_field(&group, "id")?;

        let request = SecurityGroupRuleRequest::new()
            .direction("ingress")
            .protocol("tcp")
            .port_range(77, 77);
        let rule = self.create_rule(ctx, &group_id, &request).await?;

        assert_field_eq(&rule, "direction", "ingress")?;
        assert_field_eq(&rule, "protocol", "tcp")?;
        assert_field_eq(&rule, "port_range_min", 77)?;
        assert_field_eq(&rule, "port_range_max", 77)?;
        Ok(())
    }

    async fn test_list_security_groups_is_stable(&self) -> TestResult {
        let first: BTreeSet<String> = self.list_group_ids().await?.into_iter().collect();
        let second: BTreeSet<String> = self.list_group_ids().await?.into_iter().collect();

        if first != second {
            return Err(AssertionError::new(
                "listing without changes is stable",
                format!("{:?}", first),
                format!("{:?}", second),
            )
            .into());
        }
        Ok(())
    }

    async fn test_security_group_lifecycle(&self, ctx: &TestContext) -> TestResult {
        let (group, name) = self.create_security_group(ctx).await?;
        let group_id = string_field(&group, "id")?;

        let response = self.groups().show_security_group(&group_id).await?;
        assert_status(&response, 200)?;
        let shown = assert_some(
            response.body.get("security_group"),
            "show carries security_group",
        )?;
        assert_field_eq(shown, "name", name.as_str())?;

        let request = SecurityGroupRuleRequest::new()
            .direction("ingress")
            .protocol("tcp")
            .port_range(77, 77);
        let rule = self.create_rule(ctx, &group_id, &request).await?;
        let rule_id = string_field(&rule, "id")?;
        assert_field_eq(&rule, "security_group_id", group_id.as_str())?;

        let response = self.groups().show_security_group_rule(&rule_id).await?;
        assert_status(&response, 200)?;
        let shown_rule: SecurityGroupRule = response.body.decode("security_group_rule")?;
        expect_rule_field("direction", Some("ingress"), shown_rule.direction.as_deref())?;
        expect_rule_field("protocol", Some("tcp"), shown_rule.protocol.as_deref())?;
        expect_rule_field("port_range_min", Some(77), shown_rule.port_range_min)?;
        expect_rule_field("port_range_max", Some(77), shown_rule.port_range_max)?;

        let response = self.groups().delete_security_group_rule(&rule_id).await?;
        assert_status(&response, 204)?;

        let response = self.groups().delete_security_group(&group_id).await?;
        assert_status(&response, 204)?;

        let ids = self.list_group_ids().await?;
        assert_not_contains(&ids, &group_id, "deleted group is no longer listed")?;
        Ok(())
    }
}

fn expect_rule_field<T>(field: &str, expected: T, actual: T) -> Result<(), AssertionError>
where
    T: PartialEq + fmt::Debug,
{
    if expected == actual {
        return Ok(());
    }
    Err(AssertionError::new(
        format!("shown rule {}", field),
        format!("{:?}", expected),
        format!("{:?}", actual),
    ))
}

#[async_trait]
impl ConformanceSuite for SecurityGroupSuite {
    fn name(&self) -> &str {
        "security_groups"
    }

    fn format(&self) -> Format {
        self.client.format()
    }

    fn check_preconditions(&self) -> Option<String> {
        let network = &self.client.config().network;
        if !network.enabled {
            return Some("network service is not enabled".to_string());
        }
        if !network.is_extension_enabled(EXTENSION) {
            return Some(format!("{} extension not enabled", EXTENSION));
        }
        None
    }

    fn test_names(&self) -> Vec<&'static str> {
        TESTS.to_vec()
    }

    async fn run_test(&self, name: &str, ctx: TestContext) -> TestResult {
        match name {
            "test_list_security_groups" => self.test_list_security_groups().await,
            "test_create_show_delete_security_group" => {
                self.test_create_show_delete_security_group(&ctx).await
            }
            "test_create_show_delete_security_group_rule" => {
                self.test_create_show_delete_security_group_rule(&ctx).await
            }
            "test_create_security_group_rule_with_additional_args" => {
                self.test_create_security_group_rule_with_additional_args(&ctx)
                    .await
            }
            "test_list_security_groups_is_stable" => {
                self.test_list_security_groups_is_stable().await
            }
            "test_security_group_lifecycle" => self.test_security_group_lifecycle(&ctx).await,
            other => Err(TestError::UnknownTest {
                name: other.to_string(),
            }),
        }
    }
}
