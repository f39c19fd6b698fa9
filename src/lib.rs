//! OpenStack API Conformance Harness
//!
//! Async clients and a test harness for checking that an OpenStack cloud's
//! network security groups and object-storage account behave as the public
//! APIs describe.
//!
//! # Features
//!
//! - **Identity**: Keystone v3 password auth with token caching and service
//!   catalog lookup, or a static token with explicit endpoints
//! - **Interface modes**: Every network test runs against JSON and XML
//! - **Harness**: Per-test cleanup stacks that always unwind, structured
//!   assertions and suite reports
//! - **Observability**: Structured request/response logging with secrets
//!   redacted
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use openstack_conformance::{run_suite, all_suites, CloudClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), openstack_conformance::ConformanceError> {
//!     let client: Arc<dyn CloudClient> = Arc::new(openstack_conformance::create_client_from_env()?);
//!
//!     for suite in all_suites(client) {
//!         let report = run_suite(suite.as_ref(), None).await;
//!         println!("{}: {} passed, {} failed", report.suite, report.passed(), report.failed());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod harness;
pub mod mocks;
pub mod rest;
pub mod services;
pub mod suites;
pub mod transport;
pub mod types;
pub mod xml;

// Re-export main types at crate root
pub use auth::{AuthFilters, AuthProvider, KeystoneAuthProvider, StaticTokenProvider};
pub use client::{CloudClient, CloudClientBuilder, CloudClientImpl};
pub use config::{ConformanceConfig, ConformanceConfigBuilder, EndpointType, ServiceConfig};
pub use error::{
    AuthError, ConfigurationError, ConformanceError, NetworkError, RequestError, ResponseError,
};
pub use harness::{
    rand_name, run_case, run_suite, AssertionError, CaseReport, ConformanceSuite, SuiteReport,
    TestContext, TestError, TestOutcome, TestResult,
};
pub use rest::{RestClient, RestRequest};
pub use services::{AccountClient, ApiResponse, SecurityGroupsClient};
pub use suites::{all_suites, AccountSuite, SecurityGroupSuite};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
pub use types::{
    // Request types
    CreateAccountRequest,
    SecurityGroupRuleRequest,
    SecurityGroupUpdate,
    // Response types
    AccountMetadata,
    ResponseBody,
    SecurityGroup,
    SecurityGroupRule,
    // Common types
    Format,
    Metadata,
    QueryParams,
    ACCOUNT_META_PREFIX,
    REMOVE_ACCOUNT_META_PREFIX,
};

/// Create a client from environment variables.
///
/// This reads identity settings from the usual `OS_*` variables:
/// - `OS_AUTH_URL`, `OS_USERNAME`, `OS_PASSWORD`, `OS_PROJECT_NAME` for
///   password auth
/// - `OS_TOKEN` together with `CONFORMANCE_NETWORK_ENDPOINT` /
///   `CONFORMANCE_OBJECT_STORAGE_ENDPOINT` for token auth
/// - `OS_REGION_NAME` and `OS_INTERFACE` for catalog filtering
///
/// # Example
///
/// ```rust,no_run
/// let client = openstack_conformance::create_client_from_env()?;
/// # Ok::<(), openstack_conformance::ConformanceError>(())
/// ```
pub fn create_client_from_env() -> Result<CloudClientImpl> {
    CloudClientBuilder::new().from_env().build()
}

/// Create a client with explicit configuration.
///
/// # Example
///
/// ```rust,no_run
/// use openstack_conformance::ConformanceConfig;
///
/// let config = ConformanceConfig::builder()
///     .auth_url("https://keystone.example.com/v3")
///     .password_credentials("demo", "secret", "demo")
///     .build()?;
///
/// let client = openstack_conformance::create_client(config)?;
/// # Ok::<(), openstack_conformance::ConformanceError>(())
/// ```
pub fn create_client(config: ConformanceConfig) -> Result<CloudClientImpl> {
    CloudClientBuilder::new().config(config).build()
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ConformanceError>;
