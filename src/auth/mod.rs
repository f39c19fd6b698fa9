//! Authentication providers.
//!
//! An [`AuthProvider`] resolves the base URL of a service from a set of
//! [`AuthFilters`] and decorates outgoing requests with credentials. The REST
//! layer never sees tokens directly.

mod keystone;

pub use keystone::{KeystoneAuthProvider, KeystoneAuthProviderBuilder};

use crate::config::EndpointType;
use crate::error::{AuthError, ConformanceError};
use crate::transport::HttpRequest;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::fmt;
use url::Url;

/// Header carrying the auth token on every request.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Hints passed to the auth provider when resolving a base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFilters {
    /// Service catalog type, e.g. `network` or `object-store`.
    pub service: String,
    /// Catalog interface.
    pub endpoint_type: EndpointType,
    /// Catalog region.
    pub region: Option<String>,
    /// Resolve the endpoint without its path component.
    pub skip_path: bool,
}

impl AuthFilters {
    /// Filters for the given service using the public interface.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            endpoint_type: EndpointType::Public,
            region: None,
            skip_path: false,
        }
    }

    /// Set the catalog interface.
    pub fn with_endpoint_type(mut self, endpoint_type: EndpointType) -> Self {
        self.endpoint_type = endpoint_type;
        self
    }

    /// Set the region.
    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    /// Drop the path component of the resolved endpoint.
    pub fn with_skip_path(mut self, skip_path: bool) -> Self {
        self.skip_path = skip_path;
        self
    }
}

/// Resolves endpoints and authorizes requests.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Base URL for the service selected by `filters`, without a trailing slash.
    async fn base_url(&self, filters: &AuthFilters) -> Result<String, ConformanceError>;

    /// Return `request` with credentials attached.
    async fn auth_request(
        &self,
        request: HttpRequest,
        filters: &AuthFilters,
    ) -> Result<HttpRequest, ConformanceError>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// Render an endpoint as a base URL, optionally without its path.
pub(crate) fn endpoint_base(endpoint: &Url, skip_path: bool) -> String {
    if skip_path {
        let mut root = endpoint.clone();
        root.set_path("");
        root.set_query(None);
        root.set_fragment(None);
        root.as_str().trim_end_matches('/').to_string()
    } else {
        endpoint.as_str().trim_end_matches('/').to_string()
    }
}

/// A pre-issued token with fixed endpoints.
pub struct StaticTokenProvider {
    token: SecretString,
    endpoints: HashMap<String, Url>,
}

impl StaticTokenProvider {
    /// Create a provider for `token` with no endpoints.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::new(token.into()),
            endpoints: HashMap::new(),
        }
    }

    /// Create a provider from an already wrapped token.
    pub fn from_secret(token: SecretString) -> Self {
        Self {
            token,
            endpoints: HashMap::new(),
        }
    }

    /// Register the endpoint for a service catalog type.
    pub fn with_endpoint(mut self, service: impl Into<String>, endpoint: Url) -> Self {
        self.endpoints.insert(service.into(), endpoint);
        self
    }

    /// Returns true if an endpoint is registered for `service`.
    pub fn has_endpoint(&self, service: &str) -> bool {
        self.endpoints.contains_key(service)
    }
}

#[async_trait]
impl AuthProvider for StaticTokenProvider {
    async fn base_url(&self, filters: &AuthFilters) -> Result<String, ConformanceError> {
        let endpoint = self.endpoints.get(&filters.service).ok_or_else(|| {
            AuthError::EndpointNotFound {
                service: filters.service.clone(),
                interface: filters.endpoint_type.as_str().to_string(),
                region: filters.region.clone(),
            }
        })?;
        Ok(endpoint_base(endpoint, filters.skip_path))
    }

    async fn auth_request(
        &self,
        request: HttpRequest,
        _filters: &AuthFilters,
    ) -> Result<HttpRequest, ConformanceError> {
        Ok(request.with_header(AUTH_TOKEN_HEADER, self.token.expose_secret().as_str()))
    }

    fn name(&self) -> &'static str {
        "static-token"
    }
}

impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"[REDACTED]")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}
