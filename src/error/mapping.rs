//! HTTP status mapping.
//!
//! Only authorization failures are turned into errors; every other status is
//! handed back to the caller untouched.

use super::ConformanceError;
use crate::transport::HttpResponse;

/// Maximum number of body characters carried into an `Unauthorized` message.
const MESSAGE_EXCERPT_LEN: usize = 200;

/// Returns true for the statuses that signal an authorization failure.
pub fn is_unauthorized_status(status: u16) -> bool {
    status == 401 || status == 403
}

/// Fail with [`ConformanceError::Unauthorized`] on 401/403, pass otherwise.
pub fn check_authorized(response: &HttpResponse) -> Result<(), ConformanceError> {
    if is_unauthorized_status(response.status) {
        let body = String::from_utf8_lossy(&response.body);
        return Err(ConformanceError::Unauthorized {
            status: response.status,
            message: body.chars().take(MESSAGE_EXCERPT_LEN).collect(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::HashMap;

    fn response(status: u16, body: &'static str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body),
        }
    }

    #[test]
    fn test_unauthorized_statuses() {
        assert!(is_unauthorized_status(401));
        assert!(is_unauthorized_status(403));
        assert!(!is_unauthorized_status(404));
        assert!(!is_unauthorized_status(200));
    }

    #[test]
    fn test_check_authorized_maps_401_and_403() {
        match check_authorized(&response(401, "Authentication required")) {
            Err(ConformanceError::Unauthorized { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Authentication required");
            }
            other => panic!("Expected Unauthorized, got {:?}", other),
        }

        assert!(matches!(
            check_authorized(&response(403, "")),
            Err(ConformanceError::Unauthorized { status: 403, .. })
        ));
    }

    #[test]
    fn test_check_authorized_passes_other_statuses() {
        for status in [200, 201, 204, 400, 404, 409, 500] {
            assert!(check_authorized(&response(status, "")).is_ok());
        }
    }

    #[test]
    fn test_message_is_truncated() {
        let long = "x".repeat(1000);
        let resp = HttpResponse {
            status: 401,
            headers: HashMap::new(),
            body: Bytes::from(long),
        };
        match check_authorized(&resp) {
            Err(ConformanceError::Unauthorized { message, .. }) => {
                assert_eq!(message.len(), MESSAGE_EXCERPT_LEN);
            }
            other => panic!("Expected Unauthorized, got {:?}", other),
        }
    }
}
