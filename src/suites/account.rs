//! Object-storage account conformance tests.

use crate::client::CloudClient;
use crate::error::{ConformanceError, ResponseError};
use crate::harness::assertions::{assert_some, assert_status, assert_status_in};
use crate::harness::{
    rand_name, AssertionError, ConformanceSuite, TestContext, TestError, TestResult,
};
use crate::services::AccountClient;
use crate::types::{Format, Metadata, QueryParams, ACCOUNT_META_PREFIX, REMOVE_ACCOUNT_META_PREFIX};
use async_trait::async_trait;
use std::sync::Arc;

const TESTS: &[&str] = &[
    "test_list_account_containers",
    "test_create_and_delete_account_metadata",
    "test_list_extensions",
];

/// Account behaviour of the object-storage service.
pub struct AccountSuite {
    client: Arc<dyn CloudClient>,
}

impl AccountSuite {
    /// Create the suite for `client`.
    pub fn new(client: Arc<dyn CloudClient>) -> Self {
        Self { client }
    }

    fn account(&self) -> &AccountClient {
        self.client.account()
    }

    async fn test_list_account_containers(&self) -> TestResult {
        let response = self
            .account()
            .list_account_containers(&QueryParams::new())
            .await?;
        assert_status_in(&response, &[200, 204])?;
        Ok(())
    }

    async fn test_create_and_delete_account_metadata(&self, ctx: &TestContext) -> TestResult {
        let key = rand_name("conformance");
        let value = "conformance-value";

        let mut metadata = Metadata::new();
        metadata.insert(key.clone(), value.to_string());

        let response = self
            .account()
            .create_account_metadata(&metadata, ACCOUNT_META_PREFIX)
            .await?;
        assert_status(&response, 204)?;

        let client = self.account().clone();
        let cleanup_key = key.clone();
        ctx.add_cleanup(format!("remove account metadata {}", key), move || async move {
            let response = client
                .delete_account_metadata([cleanup_key.as_str()], REMOVE_ACCOUNT_META_PREFIX)
                .await?;
            if response.is_success() {
                Ok(())
            } else {
                Err::<(), ConformanceError>(
                    ResponseError::UnexpectedStatus {
                        status: response.status,
                        message: "removing account metadata".to_string(),
                    }
                    .into(),
                )
            }
        });

        let response = self.account().list_account_metadata().await?;
        assert_status_in(&response, &[200, 204])?;
        let stored = response.metadata(ACCOUNT_META_PREFIX);
        let actual = assert_some(stored.get(&key), "metadata is visible after POST")?;
        if actual != value {
            return Err(AssertionError::new("metadata value", value, actual).into());
        }

        let response = self
            .account()
            .delete_account_metadata([key.as_str()], REMOVE_ACCOUNT_META_PREFIX)
            .await?;
        assert_status(&response, 204)?;

        let response = self.account().list_account_metadata().await?;
        assert_status_in(&response, &[200, 204])?;
        if response.metadata(ACCOUNT_META_PREFIX).contains_key(&key) {
            return Err(AssertionError::new(
                "metadata is gone after removal",
                "absent",
                format!("{} present", key),
            )
            .into());
        }
        Ok(())
    }

    async fn test_list_extensions(&self) -> TestResult {
        let response = self.account().list_extensions().await?;
        assert_status(&response, 200)?;

        match response.body.as_value() {
            Some(value) if value.is_object() => Ok(()),
            _ => Err(AssertionError::new(
                "capability document",
                "a JSON object",
                format!("{:?}", response.body),
            )
            .into()),
        }
    }
}

#[async_trait]
impl ConformanceSuite for AccountSuite {
    fn name(&self) -> &str {
        "account"
    }

    fn format(&self) -> Format {
        self.client.format()
    }

    fn check_preconditions(&self) -> Option<String> {
        if self.client.config().object_storage.enabled {
            None
        } else {
            Some("object storage service is not enabled".to_string())
        }
    }

    fn test_names(&self) -> Vec<&'static str> {
        TESTS.to_vec()
    }

    async fn run_test(&self, name: &str, ctx: TestContext) -> TestResult {
        match name {
            "test_list_account_containers" => self.test_list_account_containers().await,
            "test_create_and_delete_account_metadata" => {
                self.test_create_and_delete_account_metadata(&ctx).await
            }
            "test_list_extensions" => self.test_list_extensions().await,
            other => Err(TestError::UnknownTest {
                name: other.to_string(),
            }),
        }
    }
}
