//! Error types for the token lifecycle.

use ss3link_http::HttpError;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors from token operations.
///
/// `Clone` so a refresh that waited on another in-flight call can hand back
/// that call's outcome.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OAuthError {
    /// No status code obtained: connectivity, TLS, timeout.
    #[error("Network error: {0}")]
    Transport(String),

    /// Token endpoint returned a non-2xx status other than 401/403.
    #[error("Token endpoint returned status {status}")]
    Rejected { status: u16 },

    /// Refresh refused with 401/403; tokens were cleared.
    #[error("Authorization rejected (status {status}); sign in again")]
    AuthRejected { status: u16 },

    /// 2xx response missing or carrying empty token fields.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// Tokens obtained but the credential store could not be updated.
    #[error("Credential store error: {0}")]
    Persistence(String),

    /// Stored session could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No refresh token is held; only the interactive step can help.
    #[error("Not signed in")]
    NotAuthenticated,

    /// The interactive step produced no code.
    #[error("Authorization cancelled")]
    Cancelled,
}

impl OAuthError {
    /// Whether retrying later may succeed without user involvement.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OAuthError::Transport(_) | OAuthError::Rejected { .. } | OAuthError::Persistence(_)
        )
    }
}

impl From<HttpError> for OAuthError {
    fn from(e: HttpError) -> Self {
        OAuthError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for OAuthError {
    fn from(e: serde_json::Error) -> Self {
        OAuthError::Serialization(e.to_string())
    }
}
