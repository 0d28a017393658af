//! Certificate trust tiers.
//!
//! Requests are sorted into three tiers by target host:
//!
//! | tier       | hosts                | trust                                   |
//! |------------|----------------------|-----------------------------------------|
//! | `Auth`     | `https://auth.*`     | pinned auth anchor only                 |
//! | `Api`      | `https://api.*`      | pinned API anchor only                  |
//! | `Unpinned` | everything else      | platform roots, or none when disabled   |
//!
//! Pinned tiers disable the built-in root store, so a certificate chain that
//! does not lead to the pinned anchor is rejected even if it is publicly valid.

use reqwest::{Certificate, ClientBuilder};
use url::Url;

use crate::error::{HttpError, Result};

/// Anchor embedded for the vendor's auth host.
pub const DEFAULT_AUTH_CA_PEM: &str = include_str!("../certs/auth-ca.pem");

/// Anchor embedded for the vendor's API host.
pub const DEFAULT_API_CA_PEM: &str = include_str!("../certs/api-ca.pem");

/// Which trust anchor applies to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustTier {
    Auth,
    Api,
    Unpinned,
}

impl std::fmt::Display for TrustTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth => write!(f, "auth"),
            Self::Api => write!(f, "api"),
            Self::Unpinned => write!(f, "unpinned"),
        }
    }
}

/// Host patterns and the PEM anchors pinned to them.
#[derive(Debug, Clone)]
pub struct TrustAnchors {
    auth_host_prefix: String,
    api_host_prefix: String,
    auth_pem: String,
    api_pem: String,
    verify_unpinned: bool,
}

impl Default for TrustAnchors {
    fn default() -> Self {
        Self::simplisafe()
    }
}

impl TrustAnchors {
    /// Vendor host patterns with the embedded anchors.
    pub fn simplisafe() -> Self {
        Self {
            auth_host_prefix: "auth.".to_string(),
            api_host_prefix: "api.".to_string(),
            auth_pem: DEFAULT_AUTH_CA_PEM.to_string(),
            api_pem: DEFAULT_API_CA_PEM.to_string(),
            verify_unpinned: true,
        }
    }

    /// Replace the auth-tier anchor.
    pub fn with_auth_pem(mut self, pem: impl Into<String>) -> Self {
        self.auth_pem = pem.into();
        self
    }

    /// Replace the API-tier anchor.
    pub fn with_api_pem(mut self, pem: impl Into<String>) -> Self {
        self.api_pem = pem.into();
        self
    }

    /// Change the host prefixes that select the pinned tiers.
    pub fn with_host_prefixes(mut self, auth: impl Into<String>, api: impl Into<String>) -> Self {
        self.auth_host_prefix = auth.into();
        self.api_host_prefix = api.into();
        self
    }

    /// Whether unpinned hosts are verified against the platform roots.
    pub fn verify_unpinned(mut self, verify: bool) -> Self {
        self.verify_unpinned = verify;
        self
    }

    /// Pick the tier for a target URL. Only `https` URLs can be pinned.
    pub fn tier_for(&self, url: &Url) -> TrustTier {
        if url.scheme() != "https" {
            return TrustTier::Unpinned;
        }
        match url.host_str() {
            Some(host) if host.starts_with(&self.auth_host_prefix) => TrustTier::Auth,
            Some(host) if host.starts_with(&self.api_host_prefix) => TrustTier::Api,
            _ => TrustTier::Unpinned,
        }
    }

    /// A client builder carrying the trust settings for `tier`.
    pub fn client_builder(&self, tier: TrustTier) -> Result<ClientBuilder> {
        let builder = reqwest::Client::builder();
        match tier {
            TrustTier::Auth => pinned(builder, &self.auth_pem, tier),
            TrustTier::Api => pinned(builder, &self.api_pem, tier),
            TrustTier::Unpinned if self.verify_unpinned => Ok(builder),
            TrustTier::Unpinned => Ok(builder.danger_accept_invalid_certs(true)),
        }
    }
}

fn pinned(builder: ClientBuilder, pem: &str, tier: TrustTier) -> Result<ClientBuilder> {
    let cert = Certificate::from_pem(pem.as_bytes())
        .map_err(|e| HttpError::Tls(format!("invalid {} anchor: {}", tier, e)))?;
    Ok(builder
        .tls_built_in_root_certs(false)
        .add_root_certificate(cert))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_tier_selection() {
        let anchors = TrustAnchors::simplisafe();
        assert_eq!(
            anchors.tier_for(&url("https://auth.simplisafe.com/oauth/token")),
            TrustTier::Auth
        );
        assert_eq!(
            anchors.tier_for(&url("https://api.simplisafe.com/v1/api/authCheck")),
            TrustTier::Api
        );
        assert_eq!(
            anchors.tier_for(&url("https://socketlink.prd.aser.simplisafe.com")),
            TrustTier::Unpinned
        );
        assert_eq!(
            anchors.tier_for(&url("http://api.localhost:8080/v1")),
            TrustTier::Unpinned
        );
    }

    #[test]
    fn test_custom_prefixes() {
        let anchors = TrustAnchors::simplisafe().with_host_prefixes("login.", "rest.");
        assert_eq!(
            anchors.tier_for(&url("https://login.example.com/token")),
            TrustTier::Auth
        );
        assert_eq!(
            anchors.tier_for(&url("https://auth.example.com/token")),
            TrustTier::Unpinned
        );
    }

    #[test]
    fn test_embedded_anchors_parse() {
        let anchors = TrustAnchors::simplisafe();
        assert!(anchors.client_builder(TrustTier::Auth).is_ok());
        assert!(anchors.client_builder(TrustTier::Api).is_ok());
        assert!(anchors.client_builder(TrustTier::Unpinned).is_ok());
    }

    #[test]
    fn test_invalid_anchor_is_tls_error() {
        let anchors = TrustAnchors::simplisafe().with_api_pem("not a certificate");
        let err = anchors.client_builder(TrustTier::Api).unwrap_err();
        assert!(matches!(err, HttpError::Tls(_)));
    }
}
