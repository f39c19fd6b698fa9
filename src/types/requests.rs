//! Request payload types.

use super::{Metadata, QueryParams};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Header prefix for setting account metadata.
pub const ACCOUNT_META_PREFIX: &str = "X-Account-Meta-";

/// Header prefix for removing account metadata.
pub const REMOVE_ACCOUNT_META_PREFIX: &str = "X-Remove-Account-Meta-";

/// Request for `PUT` on an account.
#[derive(Debug, Clone)]
pub struct CreateAccountRequest {
    /// Raw request body.
    pub data: Option<Bytes>,
    /// Query string parameters.
    pub params: QueryParams,
    /// Metadata to set.
    pub metadata: Metadata,
    /// Metadata to signal for removal.
    pub remove_metadata: Metadata,
    /// Prefix for `metadata` headers.
    pub metadata_prefix: String,
    /// Prefix for `remove_metadata` headers.
    pub remove_metadata_prefix: String,
}

impl CreateAccountRequest {
    /// Create an empty request using the standard account prefixes.
    pub fn new() -> Self {
        Self {
            data: None,
            params: QueryParams::new(),
            metadata: Metadata::new(),
            remove_metadata: Metadata::new(),
            metadata_prefix: ACCOUNT_META_PREFIX.to_string(),
            remove_metadata_prefix: REMOVE_ACCOUNT_META_PREFIX.to_string(),
        }
    }

    /// Set the raw body.
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Add a query parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a metadata entry to set.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add a metadata entry to remove.
    pub fn with_remove_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.remove_metadata.insert(key.into(), value.into());
        self
    }

    /// Override the prefix used for metadata to set.
    pub fn with_metadata_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.metadata_prefix = prefix.into();
        self
    }

    /// Override the prefix used for metadata to remove.
    pub fn with_remove_metadata_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.remove_metadata_prefix = prefix.into();
        self
    }
}

impl Default for CreateAccountRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Attributes of a new security group rule.
///
/// Every attribute is optional; attributes left unset are omitted from the
/// request and take the server's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SecurityGroupRuleRequest {
    /// `ingress` or `egress`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// IP protocol, e.g. `tcp`, `udp`, `icmp`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// `IPv4` or `IPv6`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethertype: Option<String>,
    /// Lower port bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_range_min: Option<u16>,
    /// Upper port bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_range_max: Option<u16>,
    /// Remote CIDR.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_ip_prefix: Option<String>,
    /// Remote security group id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_group_id: Option<String>,
    /// Any other attribute the service accepts.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SecurityGroupRuleRequest {
    /// Create a request with no attributes set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the direction.
    pub fn direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }

    /// Set the protocol.
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// Set the ethertype.
    pub fn ethertype(mut self, ethertype: impl Into<String>) -> Self {
        self.ethertype = Some(ethertype.into());
        self
    }

    /// Set the lower port bound.
    pub fn port_range_min(mut self, port: u16) -> Self {
        self.port_range_min = Some(port);
        self
    }

    /// Set the upper port bound.
    pub fn port_range_max(mut self, port: u16) -> Self {
        self.port_range_max = Some(port);
        self
    }

    /// Set both port bounds.
    pub fn port_range(self, min: u16, max: u16) -> Self {
        self.port_range_min(min).port_range_max(max)
    }

    /// Set the remote CIDR.
    pub fn remote_ip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.remote_ip_prefix = Some(prefix.into());
        self
    }

    /// Set the remote security group.
    pub fn remote_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.remote_group_id = Some(group_id.into());
        self
    }

    /// Set an attribute that has no dedicated field.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Changes to an existing security group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SecurityGroupUpdate {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_account_request_defaults() {
        let request = CreateAccountRequest::new()
            .with_metadata("color", "blue")
            .with_remove_metadata("size", "x");

        assert_eq!(request.metadata_prefix, "X-Account-Meta-");
        assert_eq!(request.remove_metadata_prefix, "X-Remove-Account-Meta-");
        assert_eq!(request.metadata.get("color").map(String::as_str), Some("blue"));
        assert!(request.data.is_none());
    }

    #[test]
    fn test_rule_request_serializes_only_supplied_attributes() {
        let request = SecurityGroupRuleRequest::new().protocol("tcp");
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({"protocol": "tcp"}));

        let request = SecurityGroupRuleRequest::new()
            .direction("ingress")
            .protocol("tcp")
            .port_range(77, 77)
            .attribute("description", "web");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "direction": "ingress",
                "protocol": "tcp",
                "port_range_min": 77,
                "port_range_max": 77,
                "description": "web",
            })
        );
    }

    #[test]
    fn test_update_skips_unset_fields() {
        let update = SecurityGroupUpdate {
            name: Some("renamed".to_string()),
            description: None,
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"name": "renamed"}));
    }
}
