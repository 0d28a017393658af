//! Error types for the alarm/lock API.

use ss3link_http::HttpError;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No response obtained.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The API refused the credential.
    #[error("Not authorized (status {status}); sign in again")]
    Auth { status: u16 },

    /// Any other non-2xx status.
    #[error("API returned status {status}")]
    Api { status: u16 },

    /// A 2xx body that could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// A 2xx body without the expected field.
    #[error("Response is missing {0}")]
    MissingField(&'static str),
}
