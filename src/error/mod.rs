//! Error types for the conformance harness.
//!
//! Errors are grouped by where they originate: configuration, authentication,
//! request construction, the network, or response decoding. Authorization
//! failures reported by the service (401/403) get their own variant because
//! they are the only HTTP statuses the REST layer interprets.

mod mapping;

pub use mapping::{check_authorized, is_unauthorized_status};

use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the harness and its clients.
#[derive(Debug, Error)]
pub enum ConformanceError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Authentication provider errors (token fetch, catalog lookup).
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// The service rejected the request with 401 or 403.
    #[error("Unauthorized (HTTP {status}): {message}")]
    Unauthorized {
        /// HTTP status code (401 or 403).
        status: u16,
        /// Excerpt of the response body.
        message: String,
    },

    /// Request construction errors.
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Network and transport errors.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Response decoding errors.
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),
}

impl ConformanceError {
    /// Returns true for 401/403 rejections.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ConformanceError::Unauthorized { .. })
    }

    /// Returns the HTTP status code if the error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ConformanceError::Unauthorized { status, .. } => Some(*status),
            ConformanceError::Auth(AuthError::TokenRequestFailed { status, .. }) => Some(*status),
            ConformanceError::Response(ResponseError::UnexpectedStatus { status, .. }) => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// No way to authenticate was configured.
    #[error("Missing credentials: set a token with endpoints, or an auth URL with a password")]
    MissingCredentials,

    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL: {url} ({details})")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Details about the validation error.
        details: String,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfiguration {
        /// The configuration field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// Unknown interface format name.
    #[error("Unknown interface format '{value}', expected 'json' or 'xml'")]
    UnknownFormat {
        /// The rejected value.
        value: String,
    },
}

/// Authentication provider errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity service refused to issue a token.
    #[error("Token request failed with HTTP {status}: {message}")]
    TokenRequestFailed {
        /// HTTP status returned by the identity service.
        status: u16,
        /// Excerpt of the response body.
        message: String,
    },

    /// The token response had no `X-Subject-Token` header.
    #[error("Identity response did not include a subject token")]
    MissingSubjectToken,

    /// The catalog has no endpoint for the requested service.
    #[error("No '{interface}' endpoint for service '{service}'{}", region_suffix(.region))]
    EndpointNotFound {
        /// Catalog service type.
        service: String,
        /// Endpoint interface (public, internal, admin).
        interface: String,
        /// Region filter, if any.
        region: Option<String>,
    },

    /// The token expiry could not be parsed.
    #[error("Invalid token expiry '{value}'")]
    InvalidExpiry {
        /// The raw `expires_at` value.
        value: String,
    },
}

fn region_suffix(region: &Option<String>) -> String {
    region
        .as_ref()
        .map(|r| format!(" in region '{}'", r))
        .unwrap_or_default()
}

/// Request construction errors.
#[derive(Debug, Error)]
pub enum RequestError {
    /// General validation error.
    #[error("Validation error: {message}")]
    Validation {
        /// Details about the validation error.
        message: String,
    },

    /// Two metadata maps produced the same header name.
    #[error("Metadata header '{header}' would be sent twice")]
    MetadataCollision {
        /// The colliding header name.
        header: String,
    },

    /// A request body could not be encoded.
    #[error("Failed to encode request body: {message}")]
    Encoding {
        /// Encoder error message.
        message: String,
    },
}

/// Network and transport errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection failed.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Error message.
        message: String,
    },

    /// Request timed out.
    #[error("Request timed out after {duration:?}")]
    Timeout {
        /// The timeout duration.
        duration: Duration,
    },

    /// TLS/client setup error.
    #[error("TLS error: {message}")]
    TlsError {
        /// Error message.
        message: String,
    },
}

/// Response decoding errors.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// Body was not valid JSON.
    #[error("JSON parse error: {message}")]
    JsonParseError {
        /// Parser error message.
        message: String,
    },

    /// Body was not valid XML.
    #[error("XML parse error: {message}")]
    XmlParseError {
        /// Parser error message.
        message: String,
    },

    /// An expected key was missing from a decoded body.
    #[error("Missing field '{field}' in response body")]
    MissingField {
        /// The missing key.
        field: String,
    },

    /// A field was present but had the wrong shape.
    #[error("Invalid field '{field}': {message}")]
    InvalidField {
        /// The offending key.
        field: String,
        /// Deserializer error message.
        message: String,
    },

    /// The service answered with a status the caller cannot accept.
    #[error("Unexpected HTTP status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// What was being attempted.
        message: String,
    },
}

impl From<serde_json::Error> for ResponseError {
    fn from(e: serde_json::Error) -> Self {
        ResponseError::JsonParseError {
            message: e.to_string(),
        }
    }
}

impl From<quick_xml::Error> for ResponseError {
    fn from(e: quick_xml::Error) -> Self {
        ResponseError::XmlParseError {
            message: e.to_string(),
        }
    }
}
