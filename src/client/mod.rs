//! Cloud client implementation.
//!
//! This module wires configuration, transport and authentication into the
//! resource clients for one interface mode.

use crate::auth::{AuthProvider, KeystoneAuthProvider, StaticTokenProvider};
use crate::config::ConformanceConfig;
use crate::error::{ConfigurationError, ConformanceError};
use crate::rest::RestClient;
use crate::services::{AccountClient, SecurityGroupsClient};
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::Format;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::debug;

/// Cloud client trait.
pub trait CloudClient: Send + Sync {
    /// Get the object-storage account client.
    fn account(&self) -> &AccountClient;

    /// Get the network security groups client.
    fn security_groups(&self) -> &SecurityGroupsClient;

    /// Get the configuration.
    fn config(&self) -> &ConformanceConfig;

    /// Interface mode of this client.
    fn format(&self) -> Format;
}

/// Cloud client implementation.
pub struct CloudClientImpl {
    config: Arc<ConformanceConfig>,
    format: Format,
    auth: Arc<dyn AuthProvider>,
    transport: Arc<dyn HttpTransport>,

    account: OnceCell<AccountClient>,
    security_groups: OnceCell<SecurityGroupsClient>,
}

impl CloudClientImpl {
    /// Create a client for one interface mode.
    pub fn new(
        config: Arc<ConformanceConfig>,
        format: Format,
        auth: Arc<dyn AuthProvider>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            config,
            format,
            auth,
            transport,
            account: OnceCell::new(),
            security_groups: OnceCell::new(),
        }
    }

    /// A client for another interface mode sharing this client's auth and
    /// transport.
    pub fn with_format(&self, format: Format) -> Self {
        Self::new(
            self.config.clone(),
            format,
            self.auth.clone(),
            self.transport.clone(),
        )
    }

    /// The auth provider.
    pub fn auth(&self) -> &Arc<dyn AuthProvider> {
        &self.auth
    }
}

impl CloudClient for CloudClientImpl {
    fn account(&self) -> &AccountClient {
        self.account.get_or_init(|| {
            let rest = RestClient::for_service(
                &self.config.object_storage,
                Format::Json,
                self.auth.clone(),
                self.transport.clone(),
            )
            .with_max_log_body_length(self.config.max_log_body_length);
            AccountClient::new(rest)
        })
    }

    fn security_groups(&self) -> &SecurityGroupsClient {
        self.security_groups.get_or_init(|| {
            let rest = RestClient::for_service(
                &self.config.network,
                self.format,
                self.auth.clone(),
                self.transport.clone(),
            )
            .with_max_log_body_length(self.config.max_log_body_length);
            SecurityGroupsClient::new(rest)
        })
    }

    fn config(&self) -> &ConformanceConfig {
        &self.config
    }

    fn format(&self) -> Format {
        self.format
    }
}

impl std::fmt::Debug for CloudClientImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudClientImpl")
            .field("format", &self.format)
            .field("auth", &self.auth.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for the cloud client.
pub struct CloudClientBuilder {
    config: Option<ConformanceConfig>,
    from_env: bool,
    format: Option<Format>,
    transport: Option<Arc<dyn HttpTransport>>,
    auth: Option<Arc<dyn AuthProvider>>,
}

impl CloudClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            from_env: false,
            format: None,
            transport: None,
            auth: None,
        }
    }

    /// Use the provided configuration.
    pub fn config(mut self, config: ConformanceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Self {
        self.from_env = true;
        self
    }

    /// Interface mode; defaults to the first configured interface.
    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Use a custom HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom auth provider.
    pub fn auth_provider(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<CloudClientImpl, ConformanceError> {
        let config = if let Some(config) = self.config {
            config
        } else if self.from_env {
            ConformanceConfig::builder().from_env().build()?
        } else {
            ConformanceConfig::default()
        };

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                ReqwestTransport::builder()
                    .connect_timeout(config.connect_timeout)
                    .read_timeout(config.read_timeout)
                    .verify_ssl(config.verify_ssl)
                    .build()?,
            ),
        };

        let auth = match self.auth {
            Some(auth) => auth,
            None => select_auth_provider(&config, transport.clone())?,
        };
        debug!(provider = auth.name(), "Selected auth provider");

        let format = self
            .format
            .or_else(|| config.interfaces.first().copied())
            .unwrap_or_default();

        Ok(CloudClientImpl::new(Arc::new(config), format, auth, transport))
    }
}

impl Default for CloudClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick an auth provider: a token with endpoint overrides, then Keystone
/// password auth.
fn select_auth_provider(
    config: &ConformanceConfig,
    transport: Arc<dyn HttpTransport>,
) -> Result<Arc<dyn AuthProvider>, ConformanceError> {
    let identity = &config.identity;
    let overrides: Vec<_> = [&config.network, &config.object_storage]
        .into_iter()
        .filter_map(|service| {
            service
                .endpoint
                .clone()
                .map(|endpoint| (service.catalog_type.clone(), endpoint))
        })
        .collect();

    if let Some(token) = &identity.token {
        if !overrides.is_empty() {
            let provider = overrides
                .into_iter()
                .fold(StaticTokenProvider::from_secret(token.clone()), |p, (service, url)| {
                    p.with_endpoint(service, url)
                });
            return Ok(Arc::new(provider));
        }
    }

    if let (Some(auth_url), Some(username), Some(password)) =
        (&identity.auth_url, &identity.username, &identity.password)
    {
        let mut builder = KeystoneAuthProvider::builder()
            .auth_url(auth_url.clone())
            .username(username.clone())
            .password(password.clone())
            .project_name(identity.project_name.clone().unwrap_or_else(|| username.clone()))
            .user_domain_name(identity.user_domain_name.clone())
            .project_domain_name(identity.project_domain_name.clone())
            .transport(transport);
        for (service, url) in overrides {
            builder = builder.endpoint_override(service, url);
        }
        return Ok(Arc::new(builder.build()?));
    }

    Err(ConfigurationError::MissingCredentials.into())
}
