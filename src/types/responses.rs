//! Typed views of response bodies.
//!
//! XML responses carry every scalar as text, so numeric fields accept either
//! numbers or numeric strings and empty values decode as `None`.

use super::common::value_to_list;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// A security group.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SecurityGroup {
    /// Opaque id.
    pub id: String,
    /// Group name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Owning tenant.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Rules belonging to the group.
    #[serde(default, deserialize_with = "lenient_list")]
    pub security_group_rules: Vec<SecurityGroupRule>,
}

/// A security group rule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SecurityGroupRule {
    /// Opaque id.
    pub id: String,
    /// Parent group id.
    pub security_group_id: String,
    /// `ingress` or `egress`.
    #[serde(default)]
    pub direction: Option<String>,
    /// IP protocol; `None` means any.
    #[serde(default)]
    pub protocol: Option<String>,
    /// `IPv4` or `IPv6`.
    #[serde(default)]
    pub ethertype: Option<String>,
    /// Lower port bound.
    #[serde(default, deserialize_with = "lenient_port")]
    pub port_range_min: Option<u16>,
    /// Upper port bound.
    #[serde(default, deserialize_with = "lenient_port")]
    pub port_range_max: Option<u16>,
    /// Remote CIDR.
    #[serde(default)]
    pub remote_ip_prefix: Option<String>,
    /// Remote security group id.
    #[serde(default)]
    pub remote_group_id: Option<String>,
    /// Owning tenant.
    #[serde(default)]
    pub tenant_id: Option<String>,
}

fn lenient_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("port out of range: {}", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid port '{}': {}", s, e))),
        Some(other) => Err(D::Error::custom(format!("invalid port: {}", other))),
    }
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    value_to_list(&value).map_err(D::Error::custom)
}

/// Coerce a JSON scalar to an integer; numeric strings are accepted.
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Account metadata decoded from response headers.
///
/// Keys are stored lower-cased with the prefix removed, so lookups ignore the
/// case the server chose for header names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountMetadata {
    entries: BTreeMap<String, String>,
}

impl AccountMetadata {
    /// Collect every header starting with `prefix` (case-insensitive).
    pub fn from_headers(headers: &HashMap<String, String>, prefix: &str) -> Self {
        let prefix = prefix.to_ascii_lowercase();
        let entries = headers
            .iter()
            .filter_map(|(name, value)| {
                let name = name.to_ascii_lowercase();
                name.strip_prefix(&prefix)
                    .map(|key| (key.to_string(), value.clone()))
            })
            .collect();
        Self { entries }
    }

    /// Value for `key`, ignoring case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns true if `key` is present, ignoring case.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over lower-cased keys and values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
