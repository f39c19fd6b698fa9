//! Assertions returning structured failures instead of panicking.

use crate::services::ApiResponse;
use crate::types::coerce_int;
use serde_json::Value;
use std::fmt::Debug;
use thiserror::Error;

/// A failed expectation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}: expected {expected}, got {actual}")]
pub struct AssertionError {
    /// What was being checked.
    pub message: String,
    /// Expected value, rendered.
    pub expected: String,
    /// Actual value, rendered.
    pub actual: String,
}

impl AssertionError {
    /// Create an assertion error.
    pub fn new(
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// The response status equals `expected`.
pub fn assert_status(response: &ApiResponse, expected: u16) -> Result<(), AssertionError> {
    assert_status_in(response, &[expected])
}

/// The response status is one of `expected`.
pub fn assert_status_in(response: &ApiResponse, expected: &[u16]) -> Result<(), AssertionError> {
    if expected.contains(&response.status) {
        return Ok(());
    }
    let expected = expected
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(" or ");
    Err(AssertionError::new(
        "unexpected status",
        expected,
        format!("{} {}", response.status_literal(), body_excerpt(response)),
    ))
}

fn body_excerpt(response: &ApiResponse) -> String {
    let text = match &response.body {
        crate::types::ResponseBody::Empty => return String::new(),
        crate::types::ResponseBody::Raw(text) => text.clone(),
        crate::types::ResponseBody::Structured(value) => value.to_string(),
    };
    format!("({})", text.chars().take(200).collect::<String>())
}

/// `object[field]` equals `expected`.
///
/// A numeric expectation also matches a numeric string, since XML carries
/// every scalar as text.
pub fn assert_field_eq(
    object: &Value,
    field: &str,
    expected: impl Into<Value>,
) -> Result<(), AssertionError> {
    let expected = expected.into();
    let actual = object.get(field).unwrap_or(&Value::Null);

    let matches = actual == &expected
        || (expected.is_number()
            && coerce_int(actual).is_some()
            && coerce_int(actual) == coerce_int(&expected));

    if matches {
        Ok(())
    } else {
        Err(AssertionError::new(
            format!("field '{}' mismatch", field),
            expected.to_string(),
            actual.to_string(),
        ))
    }
}

/// `items` contains `item`.
pub fn assert_contains<T: PartialEq + Debug>(
    items: &[T],
    item: &T,
    message: &str,
) -> Result<(), AssertionError> {
    if items.contains(item) {
        Ok(())
    } else {
        Err(AssertionError::new(
            message,
            format!("{:?} to be present", item),
            format!("{:?}", items),
        ))
    }
}

/// `items` does not contain `item`.
pub fn assert_not_contains<T: PartialEq + Debug>(
    items: &[T],
    item: &T,
    message: &str,
) -> Result<(), AssertionError> {
    if items.contains(item) {
        Err(AssertionError::new(
            message,
            format!("{:?} to be absent", item),
            format!("{:?}", items),
        ))
    } else {
        Ok(())
    }
}

/// Unwrap `value` or fail with `message`.
pub fn assert_some<T>(value: Option<T>, message: &str) -> Result<T, AssertionError> {
    value.ok_or_else(|| AssertionError::new(message, "a value", "none"))
}
