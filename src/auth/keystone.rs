//! Keystone v3 password authentication.

use super::{endpoint_base, AuthFilters, AuthProvider, AUTH_TOKEN_HEADER};
use crate::error::{AuthError, ConfigurationError, ConformanceError, ResponseError};
use crate::transport::{HttpRequest, HttpTransport, Method};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Header in which Keystone returns the issued token.
pub const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    expires_at: String,
    #[serde(default)]
    catalog: Vec<CatalogService>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogService {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogEndpoint {
    interface: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    region_id: Option<String>,
    url: String,
}

struct CachedToken {
    token: SecretString,
    expires_at: DateTime<Utc>,
    catalog: Vec<CatalogService>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Authenticates with a user name and password against Keystone v3 and
/// resolves endpoints from the returned service catalog.
///
/// The token is cached and reused until shortly before it expires.
pub struct KeystoneAuthProvider {
    auth_url: Url,
    username: String,
    password: SecretString,
    project_name: String,
    user_domain_name: String,
    project_domain_name: String,
    endpoint_overrides: HashMap<String, Url>,
    transport: Arc<dyn HttpTransport>,
    cached: RwLock<Option<CachedToken>>,
}

impl KeystoneAuthProvider {
    /// Create a builder.
    pub fn builder() -> KeystoneAuthProviderBuilder {
        KeystoneAuthProviderBuilder::default()
    }

    fn tokens_url(&self) -> String {
        format!("{}/auth/tokens", self.auth_url.as_str().trim_end_matches('/'))
    }

    fn token_request_body(&self) -> serde_json::Value {
        json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": self.username,
                            "domain": {"name": self.user_domain_name},
                            "password": self.password.expose_secret(),
                        }
                    }
                },
                "scope": {
                    "project": {
                        "name": self.project_name,
                        "domain": {"name": self.project_domain_name},
                    }
                }
            }
        })
    }

    /// Issue a new token, replacing any cached one.
    async fn authenticate(&self) -> Result<(), ConformanceError> {
        let url = self.tokens_url();
        debug!(
            url = %url,
            user = %self.username,
            project = %self.project_name,
            "Requesting Keystone token"
        );

        let body = serde_json::to_vec(&self.token_request_body()).map_err(ResponseError::from)?;
        let request = HttpRequest::new(Method::Post, url)
            .with_header("Content-Type", "application/json")
            .with_header("Accept", "application/json")
            .with_body(body);

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            let text = response.text();
            return Err(AuthError::TokenRequestFailed {
                status: response.status,
                message: text.chars().take(200).collect(),
            }
            .into());
        }

        let token = response
            .get_header(SUBJECT_TOKEN_HEADER)
            .map(str::to_string)
            .ok_or(AuthError::MissingSubjectToken)?;

        let parsed: TokenResponse =
            serde_json::from_slice(&response.body).map_err(ResponseError::from)?;
        let expires_at = DateTime::parse_from_rfc3339(&parsed.token.expires_at)
            .map_err(|_| AuthError::InvalidExpiry {
                value: parsed.token.expires_at.clone(),
            })?
            .with_timezone(&Utc);

        debug!(
            expires_at = %expires_at,
            services = parsed.token.catalog.len(),
            "Keystone token issued"
        );

        *self.cached.write() = Some(CachedToken {
            token: SecretString::new(token),
            expires_at,
            catalog: parsed.token.catalog,
        });
        Ok(())
    }

    async fn ensure_token(&self) -> Result<(), ConformanceError> {
        let fresh = self.cached.read().as_ref().map_or(false, CachedToken::is_fresh);
        if !fresh {
            self.authenticate().await?;
        }
        Ok(())
    }

    /// Current token, fetching a new one if needed.
    pub async fn token(&self) -> Result<SecretString, ConformanceError> {
        self.ensure_token().await?;
        self.cached
            .read()
            .as_ref()
            .map(|cached| cached.token.clone())
            .ok_or_else(|| AuthError::MissingSubjectToken.into())
    }

    /// Drop the cached token so the next request authenticates again.
    pub fn invalidate(&self) {
        *self.cached.write() = None;
    }

    fn lookup_endpoint(&self, filters: &AuthFilters) -> Result<Url, ConformanceError> {
        let not_found = || AuthError::EndpointNotFound {
            service: filters.service.clone(),
            interface: filters.endpoint_type.as_str().to_string(),
            region: filters.region.clone(),
        };

        let cached = self.cached.read();
        let catalog = cached.as_ref().map(|c| c.catalog.as_slice()).unwrap_or(&[]);

        let endpoint = catalog
            .iter()
            .filter(|service| service.service_type == filters.service)
            .flat_map(|service| service.endpoints.iter())
            .find(|endpoint| {
                endpoint.interface == filters.endpoint_type.as_str()
                    && filters.region.as_ref().map_or(true, |region| {
                        endpoint.region.as_ref() == Some(region)
                            || endpoint.region_id.as_ref() == Some(region)
                    })
            })
            .ok_or_else(not_found)?;

        Url::parse(&endpoint.url).map_err(|e| {
            ConfigurationError::InvalidEndpoint {
                url: endpoint.url.clone(),
                details: e.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl AuthProvider for KeystoneAuthProvider {
    async fn base_url(&self, filters: &AuthFilters) -> Result<String, ConformanceError> {
        if let Some(endpoint) = self.endpoint_overrides.get(&filters.service) {
            return Ok(endpoint_base(endpoint, filters.skip_path));
        }

        self.ensure_token().await?;
        let endpoint = self.lookup_endpoint(filters)?;
        Ok(endpoint_base(&endpoint, filters.skip_path))
    }

    async fn auth_request(
        &self,
        request: HttpRequest,
        _filters: &AuthFilters,
    ) -> Result<HttpRequest, ConformanceError> {
        let token = self.token().await?;
        Ok(request.with_header(AUTH_TOKEN_HEADER, token.expose_secret().as_str()))
    }

    fn name(&self) -> &'static str {
        "keystone"
    }
}

impl fmt::Debug for KeystoneAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeystoneAuthProvider")
            .field("auth_url", &self.auth_url.as_str())
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("project_name", &self.project_name)
            .field("endpoint_overrides", &self.endpoint_overrides)
            .finish_non_exhaustive()
    }
}

/// Builder for [`KeystoneAuthProvider`].
#[derive(Default)]
pub struct KeystoneAuthProviderBuilder {
    auth_url: Option<Url>,
    username: Option<String>,
    password: Option<SecretString>,
    project_name: Option<String>,
    user_domain_name: Option<String>,
    project_domain_name: Option<String>,
    endpoint_overrides: HashMap<String, Url>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl KeystoneAuthProviderBuilder {
    /// Set the Keystone v3 URL.
    pub fn auth_url(mut self, auth_url: Url) -> Self {
        self.auth_url = Some(auth_url);
        self
    }

    /// Set the user name.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password.
    pub fn password(mut self, password: SecretString) -> Self {
        self.password = Some(password);
        self
    }

    /// Set the project to scope to.
    pub fn project_name(mut self, project_name: impl Into<String>) -> Self {
        self.project_name = Some(project_name.into());
        self
    }

    /// Set the user domain (default `Default`).
    pub fn user_domain_name(mut self, domain: impl Into<String>) -> Self {
        self.user_domain_name = Some(domain.into());
        self
    }

    /// Set the project domain (default `Default`).
    pub fn project_domain_name(mut self, domain: impl Into<String>) -> Self {
        self.project_domain_name = Some(domain.into());
        self
    }

    /// Use `endpoint` for `service` instead of the catalog.
    pub fn endpoint_override(mut self, service: impl Into<String>, endpoint: Url) -> Self {
        self.endpoint_overrides.insert(service.into(), endpoint);
        self
    }

    /// Transport used for token requests.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the provider.
    pub fn build(self) -> Result<KeystoneAuthProvider, ConformanceError> {
        let missing = |field: &str| ConfigurationError::InvalidConfiguration {
            field: field.to_string(),
            message: "required for Keystone authentication".to_string(),
        };

        Ok(KeystoneAuthProvider {
            auth_url: self.auth_url.ok_or_else(|| missing("auth_url"))?,
            username: self.username.ok_or_else(|| missing("username"))?,
            password: self.password.ok_or_else(|| missing("password"))?,
            project_name: self.project_name.ok_or_else(|| missing("project_name"))?,
            user_domain_name: self
                .user_domain_name
                .unwrap_or_else(|| "Default".to_string()),
            project_domain_name: self
                .project_domain_name
                .unwrap_or_else(|| "Default".to_string()),
            endpoint_overrides: self.endpoint_overrides,
            transport: self.transport.ok_or_else(|| missing("transport"))?,
            cached: RwLock::new(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointType;
    use crate::mocks::{MockResponse, MockTransport};

    fn token_body(expires_at: &str) -> String {
        json!({
            "token": {
                "expires_at": expires_at,
                "catalog": [
                    {
                        "type": "network",
                        "name": "neutron",
                        "endpoints": [
                            {"interface": "public", "region": "RegionOne", "region_id": "RegionOne", "url": "http://neutron:9696"},
                            {"interface": "internal", "region": "RegionOne", "region_id": "RegionOne", "url": "http://10.0.0.5:9696"}
                        ]
                    },
                    {
                        "type": "object-store",
                        "name": "swift",
                        "endpoints": [
                            {"interface": "public", "region": "RegionOne", "region_id": "RegionOne", "url": "http://swift:8080/v1/AUTH_demo"}
                        ]
                    }
                ]
            }
        })
        .to_string()
    }

    fn issued(token: &str, body: &str) -> MockResponse {
        MockResponse::json(201, body.to_string()).with_header("X-Subject-Token", token)
    }

    fn provider(transport: Arc<MockTransport>) -> KeystoneAuthProvider {
        KeystoneAuthProvider::builder()
            .auth_url(Url::parse("http://keystone:5000/v3").unwrap())
            .username("demo")
            .password(SecretString::new("secret".to_string()))
            .project_name("demo")
            .transport(transport)
            .build()
            .unwrap()
    }

    fn future_expiry() -> String {
        (Utc::now() + Duration::hours(1)).to_rfc3339()
    }

    #[tokio::test]
    async fn test_resolves_catalog_endpoints() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_response(issued("tok-abc", &token_body(&future_expiry())));
        let provider = provider(transport.clone());

        let network = provider.base_url(&AuthFilters::new("network")).await.unwrap();
        assert_eq!(network, "http://neutron:9696");

        let internal = provider
            .base_url(&AuthFilters::new("network").with_endpoint_type(EndpointType::Internal))
            .await
            .unwrap();
        assert_eq!(internal, "http://10.0.0.5:9696");

        let root = provider
            .base_url(&AuthFilters::new("object-store").with_skip_path(true))
            .await
            .unwrap();
        assert_eq!(root, "http://swift:8080");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://keystone:5000/v3/auth/tokens");
        assert_eq!(requests[0].method, Method::Post);
    }

    #[tokio::test]
    async fn test_token_is_cached() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_response(issued("tok-abc", &token_body(&future_expiry())));
        let provider = provider(transport.clone());

        for _ in 0..3 {
            let request = provider
                .auth_request(
                    HttpRequest::new(Method::Get, "http://neutron:9696"),
                    &AuthFilters::new("network"),
                )
                .await
                .unwrap();
            assert_eq!(request.get_header("X-Auth-Token"), Some("tok-abc"));
        }
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_token_near_expiry_is_refreshed() {
        let transport = Arc::new(MockTransport::new());
        let soon = (Utc::now() + Duration::seconds(30)).to_rfc3339();
        transport.queue_response(issued("old", &token_body(&soon)));
        transport.queue_response(issued("new", &token_body(&future_expiry())));
        let provider = provider(transport.clone());

        let first = provider.token().await.unwrap();
        assert_eq!(first.expose_secret(), "old");
        let second = provider.token().await.unwrap();
        assert_eq!(second.expose_secret(), "new");
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_response(MockResponse::json(
            401,
            r#"{"error": {"message": "bad password"}}"#,
        ));
        let provider = provider(transport);

        let result = provider.token().await;
        assert!(matches!(
            result,
            Err(ConformanceError::Auth(AuthError::TokenRequestFailed { status: 401, .. }))
        ));
    }

    #[tokio::test]
    async fn test_missing_subject_token() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_response(MockResponse::json(201, token_body(&future_expiry())));
        let provider = provider(transport);

        assert!(matches!(
            provider.token().await,
            Err(ConformanceError::Auth(AuthError::MissingSubjectToken))
        ));
    }

    #[tokio::test]
    async fn test_region_filter() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_response(issued("tok", &token_body(&future_expiry())));
        let provider = provider(transport);

        let result = provider
            .base_url(&AuthFilters::new("network").with_region(Some("RegionTwo".to_string())))
            .await;
        assert!(matches!(
            result,
            Err(ConformanceError::Auth(AuthError::EndpointNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_endpoint_override_skips_catalog() {
        let transport = Arc::new(MockTransport::new());
        let provider = KeystoneAuthProvider::builder()
            .auth_url(Url::parse("http://keystone:5000/v3").unwrap())
            .username("demo")
            .password(SecretString::new("secret".to_string()))
            .project_name("demo")
            .endpoint_override("network", Url::parse("http://localhost:9696").unwrap())
            .transport(transport.clone())
            .build()
            .unwrap();

        let url = provider.base_url(&AuthFilters::new("network")).await.unwrap();
        assert_eq!(url, "http://localhost:9696");
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_builder_requires_credentials() {
        let result = KeystoneAuthProvider::builder()
            .auth_url(Url::parse("http://keystone:5000/v3").unwrap())
            .build();
        assert!(matches!(result, Err(ConformanceError::Configuration(_))));
    }
}
