//! Request/response log formatting.

use crate::transport::{HttpRequest, HttpResponse};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Headers whose values are never written to logs.
const SENSITIVE_HEADERS: &[&str] = &[
    "x-auth-token",
    "x-subject-token",
    "x-service-token",
    "authorization",
];

const OMITTED: &str = "<omitted>";

/// Copy of `headers` with token values replaced, sorted by name.
pub(crate) fn redact_headers(headers: &HashMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let sensitive = SENSITIVE_HEADERS
                .iter()
                .any(|s| name.eq_ignore_ascii_case(s));
            let value = if sensitive { OMITTED.to_string() } else { value.clone() };
            (name.clone(), value)
        })
        .collect()
}

/// Body as text, cut to `max_len` characters.
pub(crate) fn truncate_body(body: &[u8], max_len: usize) -> String {
    let text = String::from_utf8_lossy(body);
    let total = text.chars().count();
    if total <= max_len {
        text.into_owned()
    } else {
        let head: String = text.chars().take(max_len).collect();
        format!("{}... ({} more characters)", head, total - max_len)
    }
}

pub(crate) fn log_request(request: &HttpRequest, max_body: usize) {
    debug!(
        method = %request.method,
        url = %request.url,
        headers = ?redact_headers(&request.headers),
        body = %request.body.as_deref().map(|b| truncate_body(b, max_body)).unwrap_or_default(),
        "Request"
    );
}

pub(crate) fn log_response(request: &HttpRequest, response: &HttpResponse, max_body: usize) {
    debug!(
        method = %request.method,
        url = %request.url,
        status = response.status,
        headers = ?redact_headers(&response.headers),
        body = %truncate_body(&response.body, max_body),
        "Response"
    );
}
