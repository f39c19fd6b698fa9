//! Generic REST client.
//!
//! `RestClient` sends one authorized request per call. It resolves the target
//! URL through the auth provider, applies default content negotiation headers
//! for its [`Format`], logs the exchange and turns 401/403 into
//! [`ConformanceError::Unauthorized`]. All other statuses are returned as-is
//! so callers can assert on them.

mod logging;

use crate::auth::{AuthFilters, AuthProvider};
use crate::config::{EndpointType, ServiceConfig};
use crate::error::{check_authorized, ConformanceError};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::types::Format;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Default number of body characters written to logs.
pub const DEFAULT_MAX_LOG_BODY_LENGTH: usize = 2048;

/// A request relative to the client's service endpoint.
#[derive(Debug, Clone)]
pub struct RestRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the base URL, a `?query`, or an absolute URL.
    pub path: String,
    /// Extra headers; they override the defaults.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<Bytes>,
    /// Per-call format override.
    pub format: Option<Format>,
}

impl RestRequest {
    /// Create a request without headers or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HashMap::new(),
            body: None,
            format: None,
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add several headers.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set an optional body.
    pub fn with_optional_body(mut self, body: Option<Bytes>) -> Self {
        self.body = body;
        self
    }

    /// Override the client's format for this call.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }
}

/// Join a base URL and a relative path.
///
/// An empty path yields the base itself, a path starting with `?` is appended
/// directly, and anything else is joined with exactly one `/`.
pub fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        base.to_string()
    } else if path.starts_with('?') {
        format!("{}{}", base, path)
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn is_absolute(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Authorized REST client bound to one service.
#[derive(Clone)]
pub struct RestClient {
    service: String,
    format: Format,
    endpoint_type: EndpointType,
    region: Option<String>,
    skip_path: bool,
    max_log_body_length: usize,
    auth: Arc<dyn AuthProvider>,
    transport: Arc<dyn HttpTransport>,
}

impl RestClient {
    /// Create a client for `service` (a catalog type) using JSON.
    pub fn new(
        service: impl Into<String>,
        auth: Arc<dyn AuthProvider>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            service: service.into(),
            format: Format::Json,
            endpoint_type: EndpointType::Public,
            region: None,
            skip_path: false,
            max_log_body_length: DEFAULT_MAX_LOG_BODY_LENGTH,
            auth,
            transport,
        }
    }

    /// Create a client for the service described by `config`.
    pub fn for_service(
        config: &ServiceConfig,
        format: Format,
        auth: Arc<dyn AuthProvider>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self::new(config.catalog_type.clone(), auth, transport)
            .with_format(format)
            .with_endpoint_type(config.endpoint_type)
            .with_region(config.region.clone())
    }

    /// Set the default format.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Set the catalog interface.
    pub fn with_endpoint_type(mut self, endpoint_type: EndpointType) -> Self {
        self.endpoint_type = endpoint_type;
        self
    }

    /// Set the catalog region.
    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    /// Set how much of each body is logged.
    pub fn with_max_log_body_length(mut self, length: usize) -> Self {
        self.max_log_body_length = length;
        self
    }

    /// A view of this client that resolves the endpoint without its path.
    ///
    /// Used for requests against the service root (e.g. `info`); `self` is
    /// left untouched.
    pub fn unscoped(&self) -> Self {
        Self {
            skip_path: true,
            ..self.clone()
        }
    }

    /// The client's default format.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Service catalog type.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Filters handed to the auth provider.
    pub fn filters(&self) -> AuthFilters {
        AuthFilters::new(self.service.clone())
            .with_endpoint_type(self.endpoint_type)
            .with_region(self.region.clone())
            .with_skip_path(self.skip_path)
    }

    /// Resolve `path` to a full URL.
    pub async fn resolve_url(&self, path: &str) -> Result<String, ConformanceError> {
        if is_absolute(path) {
            return Ok(path.to_string());
        }
        let base = self.auth.base_url(&self.filters()).await?;
        Ok(join_url(&base, path))
    }

    /// Send a request.
    pub async fn request(&self, request: RestRequest) -> Result<HttpResponse, ConformanceError> {
        let filters = self.filters();
        let format = request.format.unwrap_or(self.format);
        let url = self.resolve_url(&request.path).await?;

        let mut http_request = HttpRequest::new(request.method, url)
            .with_header("Content-Type", format.content_type())
            .with_header("Accept", format.content_type());

        for (name, value) in request.headers {
            http_request = http_request.with_header(name, value);
        }
        http_request.body = request.body;

        let http_request = self.auth.auth_request(http_request, &filters).await?;

        logging::log_request(&http_request, self.max_log_body_length);
        let response = self.transport.send(http_request.clone()).await?;
        logging::log_response(&http_request, &response, self.max_log_body_length);

        check_authorized(&response)?;
        Ok(response)
    }

    /// GET `path`.
    pub async fn get(
        &self,
        path: &str,
        headers: HashMap<String, String>,
    ) -> Result<HttpResponse, ConformanceError> {
        self.request(RestRequest::new(Method::Get, path).with_headers(headers))
            .await
    }

    /// HEAD `path`.
    pub async fn head(
        &self,
        path: &str,
        headers: HashMap<String, String>,
    ) -> Result<HttpResponse, ConformanceError> {
        self.request(RestRequest::new(Method::Head, path).with_headers(headers))
            .await
    }

    /// POST `body` to `path`.
    pub async fn post(
        &self,
        path: &str,
        body: Option<Bytes>,
        headers: HashMap<String, String>,
    ) -> Result<HttpResponse, ConformanceError> {
        self.request(
            RestRequest::new(Method::Post, path)
                .with_headers(headers)
                .with_optional_body(body),
        )
        .await
    }

    /// PUT `body` to `path`.
    pub async fn put(
        &self,
        path: &str,
        body: Option<Bytes>,
        headers: HashMap<String, String>,
    ) -> Result<HttpResponse, ConformanceError> {
        self.request(
            RestRequest::new(Method::Put, path)
                .with_headers(headers)
                .with_optional_body(body),
        )
        .await
    }

    /// DELETE `path`, optionally with a body.
    pub async fn delete(
        &self,
        path: &str,
        headers: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> Result<HttpResponse, ConformanceError> {
        self.request(
            RestRequest::new(Method::Delete, path)
                .with_headers(headers)
                .with_optional_body(body),
        )
        .await
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("service", &self.service)
            .field("format", &self.format)
            .field("endpoint_type", &self.endpoint_type)
            .field("region", &self.region)
            .field("skip_path", &self.skip_path)
            .field("auth", &self.auth.name())
            .finish_non_exhaustive()
    }
}
