//! Resource clients.
//!
//! - Account: object-storage account create/delete, metadata, container
//!   listing and the capability document
//! - Security groups: network security groups and their rules

mod account;
mod security_groups;

pub use account::AccountClient;
pub use security_groups::SecurityGroupsClient;

use crate::error::RequestError;
use crate::transport::HttpResponse;
use crate::types::{AccountMetadata, Metadata, QueryParams, ResponseBody};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::HashMap;

/// Characters left as-is in a single path segment.
const PATH_SEGMENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode `value` for use as one path segment.
pub(crate) fn encode_path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT_SET).to_string()
}

/// Encode query parameters as `application/x-www-form-urlencoded`.
pub fn encode_query(params: &QueryParams) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
}

/// Insert one `prefix + key` header per metadata entry.
///
/// Fails if a header of the same name (ignoring case) is already present.
pub(crate) fn insert_metadata_headers(
    headers: &mut HashMap<String, String>,
    metadata: &Metadata,
    prefix: &str,
) -> Result<(), RequestError> {
    for (key, value) in metadata {
        let name = format!("{}{}", prefix, key);
        if headers.keys().any(|existing| existing.eq_ignore_ascii_case(&name)) {
            return Err(RequestError::MetadataCollision { header: name });
        }
        headers.insert(name, value.clone());
    }
    Ok(())
}

/// A response with its body decoded by the resource client.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Decoded body.
    pub body: ResponseBody,
}

impl ApiResponse {
    pub(crate) fn new(response: &HttpResponse, body: ResponseBody) -> Self {
        Self {
            status: response.status,
            headers: response.headers.clone(),
            body,
        }
    }

    /// The status as its decimal literal.
    pub fn status_literal(&self) -> String {
        self.status.to_string()
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Metadata headers carrying `prefix`, with the prefix stripped.
    pub fn metadata(&self, prefix: &str) -> AccountMetadata {
        AccountMetadata::from_headers(&self.headers, prefix)
    }
}
