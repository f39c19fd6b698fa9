//! In-memory network and object-storage service for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use openstack_conformance::config::ConformanceConfig;
use openstack_conformance::transport::{HttpRequest, HttpResponse, HttpTransport, Method};
use openstack_conformance::xml::{to_xml_document, xml_to_json};
use openstack_conformance::{CloudClient, CloudClientBuilder, ConformanceError, Format};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use url::Url;

pub const TOKEN: &str = "fake-token";
pub const NETWORK_URL: &str = "http://network.fake.test:9696";
pub const STORAGE_URL: &str = "http://swift.fake.test:8080/v1/AUTH_demo";
pub const DEFAULT_GROUP_ID: &str = "default-id";

#[derive(Default)]
struct State {
    groups: BTreeMap<String, Value>,
    rules: BTreeMap<String, Value>,
    account_meta: BTreeMap<String, String>,
    next_id: u64,
}

impl State {
    fn new_id(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", kind, self.next_id)
    }
}

/// A stateful fake cloud answering on [`NETWORK_URL`] and [`STORAGE_URL`].
pub struct FakeCloud {
    state: Mutex<State>,
    requests: Mutex<Vec<HttpRequest>>,
    rule_direction_override: Mutex<Option<String>>,
    fail_group_deletes: Mutex<Option<u16>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        let mut state = State::default();
        state.groups.insert(
            DEFAULT_GROUP_ID.to_string(),
            json!({
                "id": DEFAULT_GROUP_ID,
                "name": "default",
                "description": "default",
                "tenant_id": "tenant-1",
            }),
        );
        Self {
            state: Mutex::new(state),
            requests: Mutex::new(Vec::new()),
            rule_direction_override: Mutex::new(None),
            fail_group_deletes: Mutex::new(None),
        }
    }

    /// Report every created rule with this direction, whatever was asked.
    pub fn with_rule_direction(self, direction: &str) -> Self {
        *self.rule_direction_override.lock() = Some(direction.to_string());
        self
    }

    /// Answer every group DELETE with `status`.
    pub fn with_failing_group_deletes(self, status: u16) -> Self {
        *self.fail_group_deletes.lock() = Some(status);
        self
    }

    pub fn group_ids(&self) -> Vec<String> {
        self.state.lock().groups.keys().cloned().collect()
    }

    pub fn rule_ids(&self) -> Vec<String> {
        self.state.lock().rules.keys().cloned().collect()
    }

    pub fn account_metadata(&self) -> BTreeMap<String, String> {
        self.state.lock().account_meta.clone()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn count(&self, method: Method, path_fragment: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.url.contains(path_fragment))
            .count()
    }

    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        if request.get_header("X-Auth-Token") != Some(TOKEN) {
            return text(401, "Authentication required");
        }

        let url = request.url.as_str();
        if let Some(rest) = url.strip_prefix(NETWORK_URL) {
            let format = if request
                .get_header("Accept")
                .map_or(false, |accept| accept.contains("xml"))
            {
                Format::Xml
            } else {
                Format::Json
            };
            return self.network(request, rest, format);
        }
        if let Some(rest) = url.strip_prefix(STORAGE_URL) {
            return self.account(request, rest);
        }
        if url == "http://swift.fake.test:8080/info" {
            return json_response(
                200,
                &json!({"swift": {"version": "1.10.0"}, "bulk_delete": {"max_deletes_per_request": 10000}}),
            );
        }
        text(404, "Not Found")
    }

    fn network(&self, request: &HttpRequest, path: &str, format: Format) -> HttpResponse {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match (request.method, segments.as_slice()) {
            (Method::Get, ["v2.0", "security-groups"]) => {
                let state = self.state.lock();
                let groups = state
                    .groups
                    .values()
                    .map(|g| with_rules(g, &state.rules))
                    .collect();
                render(format, 200, "security_groups", Value::Array(groups))
            }
            (Method::Post, ["v2.0", "security-groups"]) => {
                let Some(body) = parse_body(request, format, "security_group") else {
                    return text(400, "Malformed request body");
                };
                let mut state = self.state.lock();
                let id = state.new_id("sg");
                let group = json!({
                    "id": id,
                    "name": body.get("name").cloned().unwrap_or(Value::Null),
                    "description": body.get("description").cloned().unwrap_or(Value::Null),
                    "tenant_id": "tenant-1",
                });
                state.groups.insert(id, group.clone());
                render(format, 201, "security_group", with_rules(&group, &state.rules))
            }
            (Method::Get, ["v2.0", "security-groups", id]) => {
                let state = self.state.lock();
                match state.groups.get(*id) {
                    Some(group) => {
                        render(format, 200, "security_group", with_rules(group, &state.rules))
                    }
                    None => text(404, "Security group could not be found"),
                }
            }
            (Method::Delete, ["v2.0", "security-groups", id]) => {
                if let Some(status) = *self.fail_group_deletes.lock() {
                    return text(status, "Delete refused");
                }
                let mut state = self.state.lock();
                if state.groups.remove(*id).is_none() {
                    return text(404, "Security group could not be found");
                }
                state
                    .rules
                    .retain(|_, rule| rule["security_group_id"] != json!(id));
                empty(204)
            }
            (Method::Get, ["v2.0", "security-group-rules"]) => {
                let rules = self.state.lock().rules.values().cloned().collect();
                render(format, 200, "security_group_rules", Value::Array(rules))
            }
            (Method::Post, ["v2.0", "security-group-rules"]) => {
                let Some(body) = parse_body(request, format, "security_group_rule") else {
                    return text(400, "Malformed request body");
                };
                let mut state = self.state.lock();
                let group_id = body
                    .get("security_group_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if !state.groups.contains_key(&group_id) {
                    return text(404, "Security group could not be found");
                }

                let id = state.new_id("rule");
                let field = |name: &str| body.get(name).cloned().unwrap_or(Value::Null);
                let direction = match self.rule_direction_override.lock().clone() {
                    Some(direction) => json!(direction),
                    None => body.get("direction").cloned().unwrap_or(json!("ingress")),
                };
                let rule = json!({
                    "id": id,
                    "security_group_id": group_id,
                    "direction": direction,
                    "protocol": field("protocol"),
                    "ethertype": body.get("ethertype").cloned().unwrap_or(json!("IPv4")),
                    "port_range_min": port(field("port_range_min")),
                    "port_range_max": port(field("port_range_max")),
                    "remote_ip_prefix": field("remote_ip_prefix"),
                    "remote_group_id": field("remote_group_id"),
                    "tenant_id": "tenant-1",
                });
                state.rules.insert(id, rule.clone());
                render(format, 201, "security_group_rule", rule)
            }
            (Method::Get, ["v2.0", "security-group-rules", id]) => {
                match self.state.lock().rules.get(*id) {
                    Some(rule) => render(format, 200, "security_group_rule", rule.clone()),
                    None => text(404, "Security group rule could not be found"),
                }
            }
            (Method::Delete, ["v2.0", "security-group-rules", id]) => {
                match self.state.lock().rules.remove(*id) {
                    Some(_) => empty(204),
                    None => text(404, "Security group rule could not be found"),
                }
            }
            _ => text(404, "Not Found"),
        }
    }

    fn account(&self, request: &HttpRequest, rest: &str) -> HttpResponse {
        let query: HashMap<String, String> = Url::parse(&format!("http://fake{}", rest))
            .map(|u| u.query_pairs().into_owned().collect())
            .unwrap_or_default();

        match request.method {
            Method::Head => {
                let state = self.state.lock();
                let mut response = empty(204);
                response
                    .headers
                    .insert("X-Account-Container-Count".to_string(), "0".to_string());
                for (key, value) in &state.account_meta {
                    response
                        .headers
                        .insert(format!("X-Account-Meta-{}", key), value.clone());
                }
                response
            }
            Method::Post => {
                let mut state = self.state.lock();
                for (name, value) in &request.headers {
                    let lower = name.to_ascii_lowercase();
                    if let Some(key) = lower.strip_prefix("x-remove-account-meta-") {
                        state.account_meta.remove(key);
                    } else if let Some(key) = lower.strip_prefix("x-account-meta-") {
                        if value.is_empty() {
                            state.account_meta.remove(key);
                        } else {
                            state.account_meta.insert(key.to_string(), value.clone());
                        }
                    }
                }
                empty(204)
            }
            Method::Get => match query.get("format").map(String::as_str) {
                Some("json") => json_response(200, &json!([])),
                _ => empty(204),
            },
            Method::Put | Method::Delete => text(403, "Forbidden"),
        }
    }
}

impl Default for FakeCloud {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for FakeCloud {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ConformanceError> {
        let response = self.handle(&request);
        self.requests.lock().push(request);
        Ok(response)
    }
}

fn with_rules(group: &Value, rules: &BTreeMap<String, Value>) -> Value {
    let mut group = group.clone();
    let owned: Vec<Value> = rules
        .values()
        .filter(|rule| rule["security_group_id"] == group["id"])
        .cloned()
        .collect();
    if let Value::Object(map) = &mut group {
        map.insert("security_group_rules".to_string(), Value::Array(owned));
    }
    group
}

fn port(value: Value) -> Value {
    match value {
        Value::String(s) => s.parse::<u64>().map(Value::from).unwrap_or(Value::Null),
        other => other,
    }
}

fn parse_body(request: &HttpRequest, format: Format, root: &str) -> Option<Map<String, Value>> {
    let body = request.body.as_ref()?;
    let text = std::str::from_utf8(body).ok()?;
    let document = match format {
        Format::Json => serde_json::from_str::<Value>(text).ok()?,
        Format::Xml => xml_to_json(text).ok()?,
    };
    document.get(root)?.as_object().cloned()
}

fn render(format: Format, status: u16, root: &str, value: Value) -> HttpResponse {
    match format {
        Format::Json => {
            let mut document = Map::new();
            document.insert(root.to_string(), value);
            json_response(status, &Value::Object(document))
        }
        Format::Xml => {
            let body = to_xml_document(root, &value).unwrap();
            response(status, "application/xml", Bytes::from(body))
        }
    }
}

fn json_response(status: u16, value: &Value) -> HttpResponse {
    response(status, "application/json", Bytes::from(value.to_string()))
}

fn text(status: u16, message: &str) -> HttpResponse {
    response(status, "text/plain", Bytes::from(message.to_string()))
}

fn empty(status: u16) -> HttpResponse {
    HttpResponse {
        status,
        headers: HashMap::new(),
        body: Bytes::new(),
    }
}

fn response(status: u16, content_type: &str, body: Bytes) -> HttpResponse {
    let mut headers = HashMap::new();
    headers.insert("Content-Type".to_string(), content_type.to_string());
    HttpResponse {
        status,
        headers,
        body,
    }
}

/// Configuration pointing both services at the fake with a static token.
pub fn fake_config() -> ConformanceConfig {
    ConformanceConfig::builder()
        .token(TOKEN)
        .network_endpoint(NETWORK_URL)
        .object_storage_endpoint(STORAGE_URL)
        .build()
        .unwrap()
}

/// A client for one interface mode talking to `cloud`.
pub fn client_for(cloud: Arc<FakeCloud>, format: Format) -> Arc<dyn CloudClient> {
    client_with_config(cloud, format, fake_config())
}

pub fn client_with_config(
    cloud: Arc<FakeCloud>,
    format: Format,
    config: ConformanceConfig,
) -> Arc<dyn CloudClient> {
    let client = CloudClientBuilder::new()
        .config(config)
        .format(format)
        .transport(cloud)
        .build()
        .unwrap();
    Arc::new(client)
}
