//! Network security group client.

use super::{encode_path_segment, ApiResponse};
use crate::error::{ConformanceError, RequestError};
use crate::rest::RestClient;
use crate::transport::HttpResponse;
use crate::types::{Format, ResponseBody, SecurityGroupRuleRequest, SecurityGroupUpdate};
use crate::xml;
use bytes::Bytes;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

const SECURITY_GROUPS_PATH: &str = "v2.0/security-groups";
const SECURITY_GROUP_RULES_PATH: &str = "v2.0/security-group-rules";

/// Client for security groups and security group rules.
///
/// Request and response bodies use the client's format. XML responses are
/// converted to the JSON shape, so callers read `body["security_group"]`
/// the same way in both modes.
#[derive(Debug, Clone)]
pub struct SecurityGroupsClient {
    rest: RestClient,
}

impl SecurityGroupsClient {
    /// Create a client; the format comes from `rest`.
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// Interface mode of this client.
    pub fn format(&self) -> Format {
        self.rest.format()
    }

    /// List the tenant's security groups.
    pub async fn list_security_groups(&self) -> Result<ApiResponse, ConformanceError> {
        let response = self.rest.get(SECURITY_GROUPS_PATH, HashMap::new()).await?;
        self.decode(&response)
    }

    /// Create a security group.
    pub async fn create_security_group(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<ApiResponse, ConformanceError> {
        let mut group = Map::new();
        group.insert("name".to_string(), Value::from(name));
        if let Some(description) = description {
            group.insert("description".to_string(), Value::from(description));
        }

        let body = self.encode("security_group", Value::Object(group))?;
        let response = self
            .rest
            .post(SECURITY_GROUPS_PATH, Some(body), HashMap::new())
            .await?;
        self.decode(&response)
    }

    /// Show one security group.
    pub async fn show_security_group(&self, id: &str) -> Result<ApiResponse, ConformanceError> {
        let response = self.rest.get(&group_path(id), HashMap::new()).await?;
        self.decode(&response)
    }

    /// Update a security group's name or description.
    pub async fn update_security_group(
        &self,
        id: &str,
        update: &SecurityGroupUpdate,
    ) -> Result<ApiResponse, ConformanceError> {
        let body = self.encode("security_group", to_value(update)?)?;
        let response = self
            .rest
            .put(&group_path(id), Some(body), HashMap::new())
            .await?;
        self.decode(&response)
    }

    /// Delete a security group.
    pub async fn delete_security_group(&self, id: &str) -> Result<ApiResponse, ConformanceError> {
        let response = self
            .rest
            .delete(&group_path(id), HashMap::new(), None)
            .await?;
        self.decode(&response)
    }

    /// Create a rule in `group_id`. Only the attributes set on `rule` are sent.
    pub async fn create_security_group_rule(
        &self,
        group_id: &str,
        rule: &SecurityGroupRuleRequest,
    ) -> Result<ApiResponse, ConformanceError> {
        let mut value = to_value(rule)?;
        if let Value::Object(map) = &mut value {
            map.insert("security_group_id".to_string(), json!(group_id));
        }

        let body = self.encode("security_group_rule", value)?;
        let response = self
            .rest
            .post(SECURITY_GROUP_RULES_PATH, Some(body), HashMap::new())
            .await?;
        self.decode(&response)
    }

    /// Show one rule.
    pub async fn show_security_group_rule(
        &self,
        id: &str,
    ) -> Result<ApiResponse, ConformanceError> {
        let response = self.rest.get(&rule_path(id), HashMap::new()).await?;
        self.decode(&response)
    }

    /// List all rules visible to the tenant.
    pub async fn list_security_group_rules(&self) -> Result<ApiResponse, ConformanceError> {
        let response = self
            .rest
            .get(SECURITY_GROUP_RULES_PATH, HashMap::new())
            .await?;
        self.decode(&response)
    }

    /// Delete a rule.
    pub async fn delete_security_group_rule(
        &self,
        id: &str,
    ) -> Result<ApiResponse, ConformanceError> {
        let response = self
            .rest
            .delete(&rule_path(id), HashMap::new(), None)
            .await?;
        self.decode(&response)
    }

    fn encode(&self, root: &str, value: Value) -> Result<Bytes, ConformanceError> {
        match self.format() {
            Format::Json => {
                let mut document = Map::new();
                document.insert(root.to_string(), value);
                let encoded = serde_json::to_vec(&Value::Object(document)).map_err(|e| {
                    RequestError::Encoding {
                        message: e.to_string(),
                    }
                })?;
                Ok(Bytes::from(encoded))
            }
            Format::Xml => Ok(Bytes::from(xml::to_xml_document(root, &value)?)),
        }
    }

    fn decode(&self, response: &HttpResponse) -> Result<ApiResponse, ConformanceError> {
        let body = ResponseBody::decode_as(response, self.format())?;
        Ok(ApiResponse::new(response, body))
    }
}

fn group_path(id: &str) -> String {
    format!("{}/{}", SECURITY_GROUPS_PATH, encode_path_segment(id))
}

fn rule_path(id: &str) -> String {
    format!("{}/{}", SECURITY_GROUP_RULES_PATH, encode_path_segment(id))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, RequestError> {
    serde_json::to_value(value).map_err(|e| RequestError::Encoding {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use crate::mocks::{MockResponse, MockTransport, TestFixtures};
    use crate::transport::Method;
    use std::sync::Arc;
    use url::Url;

    fn client(format: Format, transport: Arc<MockTransport>) -> SecurityGroupsClient {
        let auth = StaticTokenProvider::new("tok")
            .with_endpoint("network", Url::parse("http://neutron:9696").unwrap());
        let rest = RestClient::new("network", Arc::new(auth), transport).with_format(format);
        SecurityGroupsClient::new(rest)
    }

    #[tokio::test]
    async fn test_create_rule_json_body() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_response(MockResponse::json(
            201,
            TestFixtures::security_group_rule_json("r1", "g1", "tcp"),
        ));
        let client = client(Format::Json, transport.clone());

        let response = client
            .create_security_group_rule("g1", &SecurityGroupRuleRequest::new().protocol("tcp"))
            .await
            .unwrap();
        assert_eq!(response.status, 201);

        let sent = transport.last_request().unwrap();
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.url, "http://neutron:9696/v2.0/security-group-rules");
        let body: Value = serde_json::from_slice(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"security_group_rule": {"protocol": "tcp", "security_group_id": "g1"}})
        );
    }

    #[tokio::test]
    async fn test_create_group_xml_body() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_response(MockResponse::xml(
            201,
            TestFixtures::security_group_xml("g1", "sg1"),
        ));
        let client = client(Format::Xml, transport.clone());

        let response = client.create_security_group("sg1", None).await.unwrap();
        assert_eq!(response.body.get("security_group").unwrap()["id"], json!("g1"));

        let sent = transport.last_request().unwrap();
        let text = String::from_utf8(sent.body.as_ref().unwrap().to_vec()).unwrap();
        assert!(text.contains("<security_group xmlns="));
        assert!(text.contains("<name>sg1</name>"));
        assert_eq!(sent.get_header("content-type"), Some("application/xml"));
    }

    #[tokio::test]
    async fn test_ids_are_path_encoded() {
        let transport = Arc::new(MockTransport::with_default(MockResponse::no_content()));
        let client = client(Format::Json, transport.clone());

        let response = client.delete_security_group("a b/c").await.unwrap();
        assert!(response.body.is_empty());
        assert_eq!(
            transport.last_request().unwrap().url,
            "http://neutron:9696/v2.0/security-groups/a%20b%2Fc"
        );
    }

    #[tokio::test]
    async fn test_undecodable_error_body_stays_raw() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_response(MockResponse::status(404).with_body("404 Not Found"));
        let client = client(Format::Xml, transport);

        let response = client.show_security_group("missing").await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.body.as_raw(), Some("404 Not Found"));
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_fields() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_response(MockResponse::json(
            200,
            TestFixtures::security_group_json("g1", "renamed"),
        ));
        let client = client(Format::Json, transport.clone());

        let update = SecurityGroupUpdate {
            name: Some("renamed".to_string()),
            description: None,
        };
        let response = client.update_security_group("g1", &update).await.unwrap();
        assert_eq!(response.status, 200);

        let sent = transport.last_request().unwrap();
        assert_eq!(sent.method, Method::Put);
        let body: Value = serde_json::from_slice(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"security_group": {"name": "renamed"}}));
    }
}
