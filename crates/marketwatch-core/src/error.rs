use thiserror::Error;

/// Error surface of the API access layer.
///
/// `Clone` is required so a settled result can be handed to every caller
/// waiting on the same deduplicated in-flight request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No HTTP response was received (DNS, connect, timeout, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with a non-success status that no pipeline
    /// stage translated away.
    #[error("http status {status}")]
    Status { status: u16, body: String },

    /// An operation required a session but none exists.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The refresh endpoint itself failed; the current operation is dead.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// The stored access token could not be decoded.
    #[error("malformed access token: {0}")]
    InvalidToken(String),

    /// A response body did not match the expected shape.
    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status of the final failure, when one exists.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_accessor_only_matches_http_failures() {
        let err = ApiError::Status {
            status: 503,
            body: String::new(),
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(ApiError::NotAuthenticated.status(), None);
    }

    #[test]
    fn not_found_helper() {
        let err = ApiError::Status {
            status: 404,
            body: String::from("null"),
        };
        assert!(err.is_not_found());
        assert!(!ApiError::Network(String::from("boom")).is_not_found());
    }
}
