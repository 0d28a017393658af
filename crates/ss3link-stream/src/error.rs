//! Error types for the event stream.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Errors from stream operations.
///
/// Every error that ends a live connection also moves the client to
/// `Disconnected` and fires `on_disconnect`.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The socket could not be opened.
    #[error("Failed to connect to event stream: {0}")]
    Connect(String),

    /// The pinned anchor could not be loaded.
    #[error("TLS setup error: {0}")]
    Tls(String),

    /// A frame could not be written.
    #[error("Failed to send on event stream: {0}")]
    Send(String),

    /// The operation needs an open socket.
    #[error("Event stream is not connected")]
    NotConnected,
}
