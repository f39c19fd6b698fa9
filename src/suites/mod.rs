//! Conformance suites.

mod account;
mod security_groups;

pub use account::AccountSuite;
pub use security_groups::SecurityGroupSuite;

use crate::client::CloudClient;
use crate::error::{ConformanceError, ResponseError};
use crate::harness::{AssertionError, ConformanceSuite};
use crate::services::ApiResponse;
use serde_json::Value;
use std::sync::Arc;

/// Every suite, bound to `client`'s interface mode.
pub fn all_suites(client: Arc<dyn CloudClient>) -> Vec<Box<dyn ConformanceSuite>> {
    vec![
        Box::new(SecurityGroupSuite::new(client.clone())),
        Box::new(AccountSuite::new(client)),
    ]
}

/// Outcome check for cleanup deletes: a resource that is already gone is
/// not an error.
pub(crate) fn deleted_or_missing(
    result: Result<ApiResponse, ConformanceError>,
    what: &str,
) -> Result<(), ConformanceError> {
    let response = result?;
    match response.status {
        200 | 202 | 204 | 404 => Ok(()),
        status => Err(ResponseError::UnexpectedStatus {
            status,
            message: format!("deleting {}", what),
        }
        .into()),
    }
}

/// String value of `object[field]`.
pub(crate) fn string_field(object: &Value, field: &str) -> Result<String, AssertionError> {
    match object.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(AssertionError::new(
            format!("field '{}' is not a string", field),
            "a string",
            other.to_string(),
        )),
        None => Err(AssertionError::new(
            format!("field '{}' missing", field),
            "a value",
            object.to_string(),
        )),
    }
}
