//! Error types for the request façade.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, HttpError>;

/// Failures that prevent a request from producing a status code.
///
/// Non-2xx statuses and undecodable bodies are not errors; they come back as
/// an [`ApiResponse`](crate::ApiResponse) with an empty document.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// No connectivity, TLS handshake failure, timeout.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request URL did not parse.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A trust anchor could not be loaded or the client could not be built.
    #[error("TLS setup error: {0}")]
    Tls(String),

    /// An authenticated request was made with no credential available.
    #[error("No credential available for an authenticated request")]
    MissingCredentials,

    /// A header name or value was not valid.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl HttpError {
    /// Whether the caller's own loop may simply retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, HttpError::Transport(_))
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        HttpError::Transport(e.to_string())
    }
}
