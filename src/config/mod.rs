//! Configuration for the conformance harness.
//!
//! `ConformanceConfig` is built explicitly (or from environment variables) and
//! passed by `Arc` into the clients and suites. Nothing reads process-wide
//! state after construction.

use crate::error::{ConfigurationError, ConformanceError};
use crate::types::Format;
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

/// Which catalog interface to use when resolving endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EndpointType {
    /// Public endpoint.
    #[default]
    Public,
    /// Internal endpoint.
    Internal,
    /// Admin endpoint.
    Admin,
}

impl EndpointType {
    /// Catalog interface name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointType::Public => "public",
            EndpointType::Internal => "internal",
            EndpointType::Admin => "admin",
        }
    }
}

impl std::str::FromStr for EndpointType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().trim_end_matches("url") {
            "public" => Ok(EndpointType::Public),
            "internal" => Ok(EndpointType::Internal),
            "admin" => Ok(EndpointType::Admin),
            _ => Err(ConfigurationError::InvalidConfiguration {
                field: "endpoint_type".to_string(),
                message: format!("unknown endpoint type '{}'", s),
            }),
        }
    }
}

/// Identity (Keystone) settings.
#[derive(Clone, Default)]
pub struct IdentityConfig {
    /// Keystone v3 URL, e.g. `http://keystone:5000/v3`.
    pub auth_url: Option<Url>,
    /// User name.
    pub username: Option<String>,
    /// Password.
    pub password: Option<SecretString>,
    /// Project to scope the token to.
    pub project_name: Option<String>,
    /// Domain of the user.
    pub user_domain_name: String,
    /// Domain of the project.
    pub project_domain_name: String,
    /// Pre-issued token, used instead of a password.
    pub token: Option<SecretString>,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("project_name", &self.project_name)
            .field("user_domain_name", &self.user_domain_name)
            .field("project_domain_name", &self.project_domain_name)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Per-service settings.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Whether the service is deployed; suites for disabled services skip.
    pub enabled: bool,
    /// Service catalog type.
    pub catalog_type: String,
    /// Endpoint override; bypasses the catalog when set.
    pub endpoint: Option<Url>,
    /// Catalog interface.
    pub endpoint_type: EndpointType,
    /// Catalog region.
    pub region: Option<String>,
    /// Enabled API extensions; `all` enables every extension.
    pub api_extensions: Vec<String>,
}

impl ServiceConfig {
    /// Default settings for the given catalog type.
    pub fn new(catalog_type: impl Into<String>) -> Self {
        Self {
            enabled: true,
            catalog_type: catalog_type.into(),
            endpoint: None,
            endpoint_type: EndpointType::Public,
            region: None,
            api_extensions: vec!["all".to_string()],
        }
    }

    /// Returns true if `extension` is listed (or `all` is).
    pub fn is_extension_enabled(&self, extension: &str) -> bool {
        self.api_extensions
            .iter()
            .any(|e| e == "all" || e == extension)
    }
}

/// Top-level harness configuration.
#[derive(Debug, Clone)]
pub struct ConformanceConfig {
    /// Interface modes to exercise, in order.
    pub interfaces: Vec<Format>,
    /// Identity settings.
    pub identity: IdentityConfig,
    /// Network service settings.
    pub network: ServiceConfig,
    /// Object storage settings.
    pub object_storage: ServiceConfig,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Read timeout for individual requests.
    pub read_timeout: Duration,
    /// Verify TLS certificates.
    pub verify_ssl: bool,
    /// Maximum number of body characters written to request/response logs.
    pub max_log_body_length: usize,
}

impl Default for ConformanceConfig {
    fn default() -> Self {
        Self {
            interfaces: vec![Format::Json, Format::Xml],
            identity: IdentityConfig {
                user_domain_name: "Default".to_string(),
                project_domain_name: "Default".to_string(),
                ..IdentityConfig::default()
            },
            network: ServiceConfig::new("network"),
            object_storage: ServiceConfig::new("object-store"),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            verify_ssl: true,
            max_log_body_length: 2048,
        }
    }
}

impl ConformanceConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ConformanceConfigBuilder {
        ConformanceConfigBuilder::default()
    }
}

/// Builder for [`ConformanceConfig`].
#[derive(Debug, Default)]
pub struct ConformanceConfigBuilder {
    config: Option<ConformanceConfig>,
    errors: Vec<ConfigurationError>,
}

impl ConformanceConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    fn config(&mut self) -> &mut ConformanceConfig {
        self.config.get_or_insert_with(ConformanceConfig::default)
    }

    fn parse_url(&mut self, value: &str) -> Option<Url> {
        match Url::parse(value) {
            Ok(url) => Some(url),
            Err(e) => {
                self.errors.push(ConfigurationError::InvalidEndpoint {
                    url: value.to_string(),
                    details: e.to_string(),
                });
                None
            }
        }
    }

    /// Set the interface modes to run.
    pub fn interfaces(mut self, interfaces: impl IntoIterator<Item = Format>) -> Self {
        self.config().interfaces = interfaces.into_iter().collect();
        self
    }

    /// Set the Keystone v3 URL.
    pub fn auth_url(mut self, url: impl AsRef<str>) -> Self {
        let parsed = self.parse_url(url.as_ref());
        self.config().identity.auth_url = parsed;
        self
    }

    /// Set password credentials.
    pub fn password_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        project_name: impl Into<String>,
    ) -> Self {
        let identity = &mut self.config().identity;
        identity.username = Some(username.into());
        identity.password = Some(SecretString::new(password.into()));
        identity.project_name = Some(project_name.into());
        self
    }

    /// Set the user and project domain names.
    pub fn domains(
        mut self,
        user_domain: impl Into<String>,
        project_domain: impl Into<String>,
    ) -> Self {
        let identity = &mut self.config().identity;
        identity.user_domain_name = user_domain.into();
        identity.project_domain_name = project_domain.into();
        self
    }

    /// Use a pre-issued token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config().identity.token = Some(SecretString::new(token.into()));
        self
    }

    /// Override the network endpoint.
    pub fn network_endpoint(mut self, url: impl AsRef<str>) -> Self {
        let parsed = self.parse_url(url.as_ref());
        self.config().network.endpoint = parsed;
        self
    }

    /// Override the object storage endpoint (the account URL).
    pub fn object_storage_endpoint(mut self, url: impl AsRef<str>) -> Self {
        let parsed = self.parse_url(url.as_ref());
        self.config().object_storage.endpoint = parsed;
        self
    }

    /// Set the enabled network extensions.
    pub fn network_extensions(
        mut self,
        extensions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.config().network.api_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the enabled object storage extensions.
    pub fn object_storage_extensions(
        mut self,
        extensions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.config().object_storage.api_extensions =
            extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable the network suites.
    pub fn network_enabled(mut self, enabled: bool) -> Self {
        self.config().network.enabled = enabled;
        self
    }

    /// Enable or disable the object storage suites.
    pub fn object_storage_enabled(mut self, enabled: bool) -> Self {
        self.config().object_storage.enabled = enabled;
        self
    }

    /// Set the catalog region for every service.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        let region = region.into();
        let config = self.config();
        config.network.region = Some(region.clone());
        config.object_storage.region = Some(region);
        self
    }

    /// Set the catalog interface for every service.
    pub fn endpoint_type(mut self, endpoint_type: EndpointType) -> Self {
        let config = self.config();
        config.network.endpoint_type = endpoint_type;
        config.object_storage.endpoint_type = endpoint_type;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config().connect_timeout = timeout;
        self
    }

    /// Set the read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config().read_timeout = timeout;
        self
    }

    /// Enable or disable TLS verification.
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.config().verify_ssl = verify;
        self
    }

    /// Set the maximum logged body length.
    pub fn max_log_body_length(mut self, length: usize) -> Self {
        self.config().max_log_body_length = length;
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Self {
        if let Ok(url) = std::env::var("OS_AUTH_URL") {
            self = self.auth_url(url);
        }

        let identity = &mut self.config().identity;
        if let Ok(username) = std::env::var("OS_USERNAME") {
            identity.username = Some(username);
        }
        if let Ok(password) = std::env::var("OS_PASSWORD") {
            identity.password = Some(SecretString::new(password));
        }
        if let Ok(project) = std::env::var("OS_PROJECT_NAME") {
            identity.project_name = Some(project);
        }
        if let Ok(domain) = std::env::var("OS_USER_DOMAIN_NAME") {
            identity.user_domain_name = domain;
        }
        if let Ok(domain) = std::env::var("OS_PROJECT_DOMAIN_NAME") {
            identity.project_domain_name = domain;
        }
        if let Ok(token) = std::env::var("OS_TOKEN") {
            identity.token = Some(SecretString::new(token));
        }

        if let Ok(region) = std::env::var("OS_REGION_NAME") {
            self = self.region(region);
        }
        if let Ok(endpoint_type) = std::env::var("OS_INTERFACE") {
            match endpoint_type.parse() {
                Ok(endpoint_type) => self = self.endpoint_type(endpoint_type),
                Err(e) => self.errors.push(e),
            }
        }

        if let Ok(val) = std::env::var("CONFORMANCE_INTERFACES") {
            let parsed: Result<Vec<Format>, _> = split_list(&val).map(|s| s.parse()).collect();
            match parsed {
                Ok(interfaces) => self = self.interfaces(interfaces),
                Err(e) => self.errors.push(e),
            }
        }
        if let Ok(url) = std::env::var("CONFORMANCE_NETWORK_ENDPOINT") {
            self = self.network_endpoint(url);
        }
        if let Ok(url) = std::env::var("CONFORMANCE_OBJECT_STORAGE_ENDPOINT") {
            self = self.object_storage_endpoint(url);
        }
        if let Ok(val) = std::env::var("CONFORMANCE_NETWORK_EXTENSIONS") {
            self = self.network_extensions(split_list(&val).map(String::from).collect::<Vec<_>>());
        }
        if let Ok(val) = std::env::var("CONFORMANCE_OBJECT_STORAGE_EXTENSIONS") {
            self = self
                .object_storage_extensions(split_list(&val).map(String::from).collect::<Vec<_>>());
        }
        if let Ok(val) = std::env::var("CONFORMANCE_NETWORK_ENABLED") {
            self = self.network_enabled(parse_bool(&val));
        }
        if let Ok(val) = std::env::var("CONFORMANCE_OBJECT_STORAGE_ENABLED") {
            self = self.object_storage_enabled(parse_bool(&val));
        }
        if let Ok(val) = std::env::var("CONFORMANCE_VERIFY_SSL") {
            self = self.verify_ssl(parse_bool(&val));
        }
        if let Ok(val) = std::env::var("CONFORMANCE_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                self = self.read_timeout(Duration::from_millis(ms));
            }
        }

        self
    }

    /// Build the configuration.
    pub fn build(mut self) -> Result<ConformanceConfig, ConformanceError> {
        if let Some(error) = self.errors.drain(..).next() {
            return Err(error.into());
        }

        let config = self.config.unwrap_or_default();

        if config.interfaces.is_empty() {
            return Err(ConfigurationError::InvalidConfiguration {
                field: "interfaces".to_string(),
                message: "at least one interface format is required".to_string(),
            }
            .into());
        }

        if config.max_log_body_length == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                field: "max_log_body_length".to_string(),
                message: "must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(config)
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}
