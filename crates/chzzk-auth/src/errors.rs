//! Auth error types.

/// Errors that can occur while loading credentials or calling the REST API.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The API answered with a non-success status or envelope code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status or envelope code (0 if neither fits a status).
        status: u16,
        /// Error description.
        message: String,
    },

    /// The cookies do not belong to a logged-in user.
    #[error("not logged in: check NID_AUT and NID_SES")]
    NotLoggedIn,

    /// The streamer has no chat channel right now (unknown or restricted).
    #[error("chat channel unavailable for streamer: {0}")]
    ChannelUnavailable(String),

    /// A required cookie is absent from the credential source.
    #[error("missing cookie: {0}")]
    MissingCookie(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = AuthError::Api {
            status: 401,
            message: "Unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "API error (401): Unauthorized");
    }

    #[test]
    fn channel_unavailable_display() {
        let err = AuthError::ChannelUnavailable("abc123".to_string());
        assert_eq!(
            err.to_string(),
            "chat channel unavailable for streamer: abc123"
        );
    }

    #[test]
    fn missing_cookie_display() {
        let err = AuthError::MissingCookie("NID_SES".to_string());
        assert_eq!(err.to_string(), "missing cookie: NID_SES");
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let auth_err = AuthError::from(io_err);
        assert!(auth_err.to_string().contains("not found"));
    }
}
