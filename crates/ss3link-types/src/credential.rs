//! Read access to the current bearer credential.

use std::sync::Arc;

/// Something that can hand out the current access credential.
///
/// Implementations must only read in-memory state: callers include the
/// event-stream handshake, which must never block on the network.
pub trait CredentialSource: Send + Sync + std::fmt::Debug {
    /// Raw access token, if one is held.
    fn access_token(&self) -> Option<String>;

    /// Token type used in the `Authorization` header (normally `Bearer`).
    fn token_type(&self) -> String {
        "Bearer".to_string()
    }

    /// Full `Authorization` header value, `"<type> <token>"`.
    fn authorization(&self) -> Option<String> {
        self.access_token()
            .map(|token| format!("{} {}", self.token_type(), token))
    }
}

/// Shared credential source handle.
pub type SharedCredentialSource = Arc<dyn CredentialSource>;

/// A fixed credential, for tests and one-off tools.
#[derive(Debug, Clone)]
pub struct StaticCredential {
    token_type: String,
    access_token: Option<String>,
}

impl StaticCredential {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            token_type: "Bearer".to_string(),
            access_token: Some(access_token.into()),
        }
    }

    /// A source that holds no token.
    pub fn empty() -> Self {
        Self {
            token_type: "Bearer".to_string(),
            access_token: None,
        }
    }
}

impl CredentialSource for StaticCredential {
    fn access_token(&self) -> Option<String> {
        self.access_token.clone()
    }

    fn token_type(&self) -> String {
        self.token_type.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_header_value() {
        let source = StaticCredential::bearer("abc123");
        assert_eq!(source.authorization().as_deref(), Some("Bearer abc123"));
    }

    #[test]
    fn test_empty_source_has_no_header() {
        assert!(StaticCredential::empty().authorization().is_none());
    }
}
