//! CLI command handlers.

pub mod alarm;
pub mod auth;
pub mod config;
pub mod listen;
pub mod lock;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use ss3link_client::{DEFAULT_API_BASE, Ss3Client};
use ss3link_config::{LoadedConfig, Ss3Config, read_pem};
use ss3link_http::{HttpFacade, TrustAnchors};
use ss3link_oauth::{FileCredentialStore, OAuthConfig, TokenManager};
use ss3link_stream::{DEFAULT_STREAM_URL, StreamConfig};
use ss3link_types::{SharedClock, SharedCredentialSource, SystemClock};

use crate::prompt::StdinPrompt;

/// Shared context for all commands.
#[derive(Debug)]
pub struct Context {
    /// User config directory (credentials, logs).
    pub config_dir: PathBuf,
    /// Merged configuration and where it came from.
    pub loaded: LoadedConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

/// The wired-up runtime objects a command works with.
pub struct Services {
    pub tokens: Arc<TokenManager>,
    pub client: Ss3Client,
    pub clock: SharedClock,
}

impl Context {
    pub fn load(config_dir: PathBuf, json_output: bool, verbose: bool) -> Result<Self> {
        let loaded = ss3link_config::load_config_with_options(None, Some(&config_dir))?;
        for warning in &loaded.warnings {
            tracing::warn!("{}", warning);
        }
        Ok(Self {
            config_dir,
            loaded,
            json_output,
            verbose,
        })
    }

    pub fn config(&self) -> &Ss3Config {
        &self.loaded.config
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.config().storage().credentials_path(&self.config_dir)
    }

    /// Trust anchors with any PEM overrides from `[tls]` applied.
    pub fn trust_anchors(&self) -> Result<TrustAnchors> {
        let tls = self.config().tls();
        let mut trust = TrustAnchors::simplisafe().verify_unpinned(tls.verify_unpinned);
        if let Some(ref path) = tls.auth_ca_cert {
            trust = trust.with_auth_pem(read_pem(path)?);
        }
        if let Some(ref path) = tls.api_ca_cert {
            trust = trust.with_api_pem(read_pem(path)?);
        }
        Ok(trust)
    }

    pub fn oauth_config(&self) -> OAuthConfig {
        let section = self.config().oauth();
        let defaults = OAuthConfig::simplisafe();
        OAuthConfig {
            client_id: section.client_id.unwrap_or(defaults.client_id),
            authorize_url: section.authorize_url.unwrap_or(defaults.authorize_url),
            token_url: section.token_url.unwrap_or(defaults.token_url),
            redirect_uri: section.redirect_uri.unwrap_or(defaults.redirect_uri),
            scope: section.scope.unwrap_or(defaults.scope),
            audience: section.audience.unwrap_or(defaults.audience),
            auth0_client: section.auth0_client.unwrap_or(defaults.auth0_client),
        }
    }

    pub fn stream_config(&self) -> Result<StreamConfig> {
        let url = self
            .config()
            .stream()
            .url
            .unwrap_or_else(|| DEFAULT_STREAM_URL.to_string());
        let mut stream = StreamConfig::new(url);
        if let Some(ref path) = self.config().tls().stream_ca_cert {
            stream = stream.with_ca_pem(read_pem(path)?);
        }
        Ok(stream)
    }

    /// Build the token manager and API client.
    pub async fn services(&self) -> Result<Services> {
        let http_section = self.config().http();
        let mut builder = HttpFacade::builder()
            .trust(self.trust_anchors()?)
            .timeout(http_section.timeout());
        if let Some(agent) = http_section.user_agent {
            builder = builder.user_agent(agent);
        }
        let http = builder.build();

        let clock: SharedClock = Arc::new(SystemClock);
        let store = Arc::new(FileCredentialStore::new(self.credentials_path()));
        let tokens = TokenManager::load(self.oauth_config(), http.clone(), store, clock.clone())
            .await
            .with_refresh_buffer(self.config().auth().refresh_buffer());
        let tokens = Arc::new(tokens);

        let credentials: SharedCredentialSource = tokens.clone();
        let api_base = self
            .config()
            .api()
            .base_url
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let client = Ss3Client::new(http.with_credentials(credentials), api_base);

        Ok(Services {
            tokens,
            client,
            clock,
        })
    }
}

impl Services {
    /// Make sure a live token is held, refreshing or prompting as needed.
    pub async fn ensure_authorized(&self) -> Result<()> {
        if self.tokens.is_authorized() {
            return Ok(());
        }
        self.tokens
            .authorize(&StdinPrompt::new())
            .await
            .map_err(|e| anyhow::anyhow!("Authentication failed: {}", e))
    }
}
