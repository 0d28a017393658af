//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [oauth]      # client id, endpoints, scope overrides
//! [api]        # REST base URL
//! [stream]     # event-stream URL and poll cadence
//! [tls]        # trust anchors per host tier
//! [auth]       # refresh buffer and check interval
//! [storage]    # credential file location
//! [http]       # request timeout, user agent
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Ss3Config {
    /// OAuth client and endpoint overrides.
    pub oauth: Option<OAuthSection>,

    /// REST API settings.
    pub api: Option<ApiSection>,

    /// Event-stream settings.
    pub stream: Option<StreamSection>,

    /// Certificate trust anchors.
    pub tls: Option<TlsSection>,

    /// Token lifecycle timing.
    pub auth: Option<AuthSection>,

    /// Credential persistence.
    pub storage: Option<StorageSection>,

    /// HTTP transport settings.
    pub http: Option<HttpSection>,
}

impl Ss3Config {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not field by field.
    pub fn merge(&mut self, other: Ss3Config) {
        if other.oauth.is_some() {
            self.oauth = other.oauth;
        }
        if other.api.is_some() {
            self.api = other.api;
        }
        if other.stream.is_some() {
            self.stream = other.stream;
        }
        if other.tls.is_some() {
            self.tls = other.tls;
        }
        if other.auth.is_some() {
            self.auth = other.auth;
        }
        if other.storage.is_some() {
            self.storage = other.storage;
        }
        if other.http.is_some() {
            self.http = other.http;
        }
    }

    pub fn oauth(&self) -> OAuthSection {
        self.oauth.clone().unwrap_or_default()
    }

    pub fn api(&self) -> ApiSection {
        self.api.clone().unwrap_or_default()
    }

    pub fn stream(&self) -> StreamSection {
        self.stream.clone().unwrap_or_default()
    }

    pub fn tls(&self) -> TlsSection {
        self.tls.clone().unwrap_or_default()
    }

    pub fn auth(&self) -> AuthSection {
        self.auth.clone().unwrap_or_default()
    }

    pub fn storage(&self) -> StorageSection {
        self.storage.clone().unwrap_or_default()
    }

    pub fn http(&self) -> HttpSection {
        self.http.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OAuth
// ─────────────────────────────────────────────────────────────────────────────

/// OAuth overrides. Unset fields fall back to the vendor defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSection {
    pub client_id: Option<String>,
    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub audience: Option<String>,
    /// Value of the `Auth0-Client` header and `auth0Client` query parameter.
    pub auth0_client: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// API
// ─────────────────────────────────────────────────────────────────────────────

/// REST API settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Base URL, e.g. `https://api.simplisafe.com/v1`.
    pub base_url: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream
// ─────────────────────────────────────────────────────────────────────────────

/// Event-stream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSection {
    /// WebSocket URL (`wss://` or `ws://`).
    pub url: Option<String>,
    /// How often the driving loop drains buffered frames.
    pub poll_interval_ms: u64,
    /// Upper bound for the reconnect backoff.
    pub max_backoff_secs: u64,
    /// A connection not subscribed this long after opening is dropped.
    pub handshake_timeout_secs: u64,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            url: None,
            poll_interval_ms: 100,
            max_backoff_secs: 30,
            handshake_timeout_secs: 10,
        }
    }
}

impl StreamSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs.max(1))
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs.max(1))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TLS
// ─────────────────────────────────────────────────────────────────────────────

/// Trust anchor configuration.
///
/// ```toml
/// [tls]
/// auth_ca_cert = "~/.config/ss3link/certs/auth.pem"
/// verify_unpinned = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsSection {
    /// PEM file replacing the embedded anchor for the auth host.
    pub auth_ca_cert: Option<PathBuf>,
    /// PEM file replacing the embedded anchor for the API host.
    pub api_ca_cert: Option<PathBuf>,
    /// PEM file pinning the event-stream host. Platform roots when unset.
    pub stream_ca_cert: Option<PathBuf>,
    /// Verify certificates of hosts outside the pinned tiers against the
    /// platform roots. When false they are accepted unverified.
    pub verify_unpinned: bool,
}

impl Default for TlsSection {
    fn default() -> Self {
        Self {
            auth_ca_cert: None,
            api_ca_cert: None,
            stream_ca_cert: None,
            verify_unpinned: true,
        }
    }
}

/// Read a PEM file named in the config.
pub fn read_pem(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::Cert {
        path: path.display().to_string(),
        source: e,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth timing
// ─────────────────────────────────────────────────────────────────────────────

/// Token lifecycle timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Refresh this long before the provider expires the token.
    pub refresh_buffer_secs: u64,
    /// How often the driving loop checks token freshness.
    pub check_interval_secs: u64,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            refresh_buffer_secs: 5 * 60,
            check_interval_secs: 60,
        }
    }
}

impl AuthSection {
    pub fn refresh_buffer(&self) -> Duration {
        Duration::from_secs(self.refresh_buffer_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs.max(1))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage
// ─────────────────────────────────────────────────────────────────────────────

/// Default credential file name within the config directory.
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Credential persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Credential file path. Defaults to `<config dir>/credentials.json`.
    pub credentials: Option<PathBuf>,
}

impl StorageSection {
    /// Resolve the credential file path against a config directory.
    pub fn credentials_path(&self, config_dir: &Path) -> PathBuf {
        self.credentials
            .clone()
            .unwrap_or_else(|| config_dir.join(CREDENTIALS_FILE))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Custom user agent.
    pub user_agent: Option<String>,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl HttpSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
