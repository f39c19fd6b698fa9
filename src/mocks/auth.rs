//! Mock auth provider for testing.

use crate::auth::{endpoint_base, AuthFilters, AuthProvider, AUTH_TOKEN_HEADER};
use crate::error::{AuthError, ConformanceError};
use crate::transport::HttpRequest;
use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

/// Auth provider that serves one fixed endpoint and records the filters it
/// was asked to resolve.
pub struct MockAuthProvider {
    endpoint: Url,
    token: String,
    fail: bool,
    filters: Mutex<Vec<AuthFilters>>,
}

impl MockAuthProvider {
    /// Resolve every service to `endpoint`.
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            token: "mock-token".to_string(),
            fail: false,
            filters: Mutex::new(Vec::new()),
        }
    }

    /// Use `token` in `X-Auth-Token`.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Provider whose endpoint lookups always fail.
    pub fn failing(endpoint: Url) -> Self {
        Self {
            fail: true,
            ..Self::new(endpoint)
        }
    }

    /// Filters passed to `base_url`, in call order.
    pub fn recorded_filters(&self) -> Vec<AuthFilters> {
        self.filters.lock().clone()
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn base_url(&self, filters: &AuthFilters) -> Result<String, ConformanceError> {
        self.filters.lock().push(filters.clone());
        if self.fail {
            return Err(AuthError::EndpointNotFound {
                service: filters.service.clone(),
                interface: filters.endpoint_type.as_str().to_string(),
                region: filters.region.clone(),
            }
            .into());
        }
        Ok(endpoint_base(&self.endpoint, filters.skip_path))
    }

    async fn auth_request(
        &self,
        request: HttpRequest,
        _filters: &AuthFilters,
    ) -> Result<HttpRequest, ConformanceError> {
        Ok(request.with_header(AUTH_TOKEN_HEADER, self.token.as_str()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

impl std::fmt::Debug for MockAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAuthProvider")
            .field("endpoint", &self.endpoint.as_str())
            .field("fail", &self.fail)
            .finish_non_exhaustive()
    }
}
