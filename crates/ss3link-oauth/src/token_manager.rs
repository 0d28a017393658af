//! Token lifecycle.
//!
//! Handles the authorization-code exchange, refresh grants, expiry tracking
//! and persistence of the SimpliSafe token pair.
//!
//! Token-endpoint calls are serialized by a single async mutex. A refresh that
//! had to wait for another call returns that call's outcome instead of
//! issuing a second request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{Value, json};
use ss3link_http::{ApiRequest, HttpFacade};
use ss3link_types::{CredentialSource, SharedClock};

use crate::config::OAuthConfig;
use crate::error::{OAuthError, Result};
use crate::pkce::PkcePair;
use crate::store::{SharedCredentialStore, StoredSession};

/// Refresh this long before the provider expires the token.
pub const DEFAULT_REFRESH_BUFFER: Duration = Duration::from_secs(5 * 60);

// ============================================================================
// Credential
// ============================================================================

/// The live token pair.
///
/// Either empty or complete. A credential restored from the store has tokens
/// but no issuance time and is never authorized until refreshed.
#[derive(Clone, Default, PartialEq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub issued_at: Option<Instant>,
    pub expires_in: Duration,
}

impl Credential {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_empty() && self.refresh_token.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty()
            && !self.refresh_token.is_empty()
            && !self.token_type.is_empty()
            && !self.expires_in.is_zero()
    }

    /// Time left before a refresh is due, if issuance is known.
    fn refresh_due_in(&self, now: Instant, buffer: Duration) -> Option<Duration> {
        let issued_at = self.issued_at?;
        let limit = self.expires_in.checked_sub(buffer)?;
        let elapsed = now.saturating_duration_since(issued_at);
        Some(limit.saturating_sub(elapsed))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("has_access_token", &!self.access_token.is_empty())
            .field("has_refresh_token", &!self.refresh_token.is_empty())
            .field("token_type", &self.token_type)
            .field("issued_at", &self.issued_at)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl TokenResponse {
    fn into_credential(self, issued_at: Instant) -> Result<Credential> {
        fn required(field: Option<String>, name: &str) -> Result<String> {
            field
                .filter(|s| !s.is_empty() && s != "null")
                .ok_or_else(|| OAuthError::InvalidResponse(format!("missing {}", name)))
        }

        let expires_in = self
            .expires_in
            .filter(|&secs| secs > 0)
            .ok_or_else(|| OAuthError::InvalidResponse("missing expires_in".to_string()))?;

        Ok(Credential {
            access_token: required(self.access_token, "access_token")?,
            refresh_token: required(self.refresh_token, "refresh_token")?,
            token_type: required(self.token_type, "token_type")?,
            issued_at: Some(issued_at),
            expires_in: Duration::from_secs(expires_in),
        })
    }
}

// ============================================================================
// Status
// ============================================================================

/// Snapshot of the token state for display.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenStatus {
    pub has_refresh_token: bool,
    pub authorized: bool,
    /// Time until a refresh is due; `None` when issuance is unknown.
    pub refresh_due_in: Option<Duration>,
}

impl TokenStatus {
    pub fn refresh_due_display(&self) -> String {
        match self.refresh_due_in {
            None if self.has_refresh_token => "Unknown (will refresh on next check)".to_string(),
            None => "Not signed in".to_string(),
            Some(d) if d.is_zero() => "Due now".to_string(),
            Some(d) => {
                let secs = d.as_secs();
                format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
            }
        }
    }
}

// ============================================================================
// AuthorizationPrompt
// ============================================================================

/// The one-time human step: show the URL, return the pasted code.
#[async_trait]
pub trait AuthorizationPrompt: Send + Sync {
    /// `None` when the user gave up.
    async fn prompt(&self, authorization_url: &str) -> Option<String>;
}

// ============================================================================
// TokenManager
// ============================================================================

#[derive(Debug)]
struct AuthState {
    credential: Credential,
    pkce: PkcePair,
}

#[derive(Debug, Default)]
struct Flight {
    last: Option<Result<()>>,
}

/// Owns the OAuth state and hands out the current bearer credential.
#[derive(Debug)]
pub struct TokenManager {
    config: OAuthConfig,
    http: HttpFacade,
    store: SharedCredentialStore,
    clock: SharedClock,
    refresh_buffer: Duration,
    state: RwLock<AuthState>,
    flight: tokio::sync::Mutex<Flight>,
    completed: AtomicU64,
}

impl TokenManager {
    /// Restore from the store, or start unauthenticated with a new PKCE pair.
    ///
    /// A store that cannot be read is treated as empty.
    pub async fn load(
        config: OAuthConfig,
        http: HttpFacade,
        store: SharedCredentialStore,
        clock: SharedClock,
    ) -> Self {
        let restored = match store.load().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored credentials, starting unauthenticated");
                None
            }
        };

        let state = match restored {
            Some(session) => {
                tracing::info!("Restored stored session");
                AuthState {
                    credential: Credential {
                        access_token: session.access_token,
                        refresh_token: session.refresh_token,
                        token_type: "Bearer".to_string(),
                        issued_at: None,
                        expires_in: Duration::ZERO,
                    },
                    pkce: PkcePair::from_verifier(session.code_verifier),
                }
            }
            None => {
                tracing::debug!("No stored session, generated new PKCE pair");
                AuthState {
                    credential: Credential::default(),
                    pkce: PkcePair::generate(),
                }
            }
        };

        Self {
            config,
            http,
            store,
            clock,
            refresh_buffer: DEFAULT_REFRESH_BUFFER,
            state: RwLock::new(state),
            flight: tokio::sync::Mutex::new(Flight::default()),
            completed: AtomicU64::new(0),
        }
    }

    pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = buffer;
        self
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Browser URL for the interactive step.
    pub fn authorization_url(&self) -> String {
        let state = self.state.read();
        tracing::trace!(challenge = %state.pkce.challenge, "Building authorization URL");
        self.config.authorization_url(&state.pkce.challenge)
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.state.read().credential.refresh_token.is_empty()
    }

    /// True while the token is known fresh: a refresh token is held, issuance
    /// is known, and less than `expires_in - buffer` has elapsed.
    pub fn is_authorized(&self) -> bool {
        let state = self.state.read();
        let credential = &state.credential;
        if credential.refresh_token.is_empty() {
            return false;
        }
        let Some(issued_at) = credential.issued_at else {
            return false;
        };
        let Some(limit) = credential.expires_in.checked_sub(self.refresh_buffer) else {
            return false;
        };
        self.clock.now().saturating_duration_since(issued_at) < limit
    }

    pub fn status(&self) -> TokenStatus {
        let authorized = self.is_authorized();
        let state = self.state.read();
        TokenStatus {
            has_refresh_token: !state.credential.refresh_token.is_empty(),
            authorized,
            refresh_due_in: state
                .credential
                .refresh_due_in(self.clock.now(), self.refresh_buffer),
        }
    }

    /// Exchange a pasted authorization code for tokens.
    ///
    /// Whitespace anywhere in `code` is dropped. On failure the prior state is
    /// left untouched.
    pub async fn exchange_code(&self, code: &str) -> Result<()> {
        let code: String = code.chars().filter(|c| !c.is_whitespace()).collect();
        if code.is_empty() {
            return Err(OAuthError::Cancelled);
        }

        let mut flight = self.flight.lock().await;

        let verifier = self.state.read().pkce.verifier.clone();
        tracing::trace!(verifier = %verifier, "Exchanging authorization code");
        let body = json!({
            "grant_type": "authorization_code",
            "client_id": self.config.client_id,
            "code_verifier": verifier,
            "code": code,
            "redirect_uri": self.config.redirect_uri,
        });

        let result = match self.token_request(body).await {
            Ok(credential) => {
                tracing::info!("Authorization code exchanged");
                self.install(credential).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "Authorization code exchange failed");
                Err(e)
            }
        };

        self.finish(&mut flight, &result);
        result
    }

    /// Refresh the token pair.
    ///
    /// 401/403 clears the credential, wipes the store and starts a new PKCE
    /// pair; any other failure keeps the current tokens.
    pub async fn refresh(&self) -> Result<()> {
        let observed = self.completed.load(Ordering::SeqCst);
        let mut flight = self.flight.lock().await;
        if self.completed.load(Ordering::SeqCst) != observed
            && let Some(last) = flight.last.clone()
        {
            tracing::debug!("Joined in-flight token request");
            return last;
        }

        let refresh_token = self.state.read().credential.refresh_token.clone();
        if refresh_token.is_empty() {
            return Err(OAuthError::NotAuthenticated);
        }

        tracing::info!("Refreshing access token");
        let body = json!({
            "grant_type": "refresh_token",
            "client_id": self.config.client_id,
            "refresh_token": refresh_token,
        });

        let result = match self.token_request(body).await {
            Ok(credential) => {
                tracing::info!("Token refreshed");
                self.install(credential).await
            }
            Err(OAuthError::Rejected { status }) if status == 401 || status == 403 => {
                self.invalidate(status).await;
                Err(OAuthError::AuthRejected { status })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, keeping current tokens");
                Err(e)
            }
        };

        self.finish(&mut flight, &result);
        result
    }

    /// Make sure a usable token is held.
    ///
    /// Refreshes when a refresh token exists. Falls back to the interactive
    /// step when there is none, or when the refresh was rejected; the
    /// interactive step runs at most once per call.
    pub async fn authorize(&self, prompt: &dyn AuthorizationPrompt) -> Result<()> {
        if self.has_refresh_token() {
            match self.refresh().await {
                Err(OAuthError::AuthRejected { status }) => {
                    tracing::info!(status, "Stored session rejected, starting interactive authorization");
                }
                other => return other,
            }
        }

        let url = self.authorization_url();
        let code = prompt.prompt(&url).await.ok_or(OAuthError::Cancelled)?;
        self.exchange_code(&code).await
    }

    /// Forget the tokens, locally and in the store.
    pub async fn logout(&self) -> Result<()> {
        let _flight = self.flight.lock().await;
        self.reset();
        self.store.clear().await?;
        tracing::info!("Signed out");
        Ok(())
    }

    async fn token_request(&self, body: Value) -> Result<Credential> {
        let request = ApiRequest::post(&self.config.token_url)
            .header("Auth0-Client", &self.config.auth0_client)
            .json(body);

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(OAuthError::Rejected {
                status: response.status,
            });
        }
        if let Some(e) = response.decode_error {
            return Err(OAuthError::InvalidResponse(e));
        }

        let tokens: TokenResponse = serde_json::from_value(response.document)
            .map_err(|e| OAuthError::InvalidResponse(e.to_string()))?;
        tokens.into_credential(self.clock.now())
    }

    /// Replace the credential, then persist it.
    async fn install(&self, credential: Credential) -> Result<()> {
        let session = {
            let mut state = self.state.write();
            state.credential = credential;
            StoredSession {
                access_token: state.credential.access_token.clone(),
                refresh_token: state.credential.refresh_token.clone(),
                code_verifier: state.pkce.verifier.clone(),
            }
        };

        self.store.save(&session).await.map_err(|e| {
            tracing::warn!(error = %e, "Tokens obtained but not persisted");
            match e {
                OAuthError::Persistence(_) => e,
                other => OAuthError::Persistence(other.to_string()),
            }
        })
    }

    async fn invalidate(&self, status: u16) {
        self.reset();
        if let Err(e) = self.store.clear().await {
            tracing::warn!(error = %e, "Failed to clear stored credentials");
        }
        tracing::warn!(status, "Refresh rejected, credentials cleared");
    }

    fn reset(&self) {
        let mut state = self.state.write();
        state.credential = Credential::default();
        state.pkce = PkcePair::generate();
    }

    fn finish(&self, flight: &mut Flight, result: &Result<()>) {
        flight.last = Some(result.clone());
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

impl CredentialSource for TokenManager {
    fn access_token(&self) -> Option<String> {
        let state = self.state.read();
        Some(state.credential.access_token.clone()).filter(|t| !t.is_empty())
    }

    fn token_type(&self) -> String {
        let state = self.state.read();
        if state.credential.token_type.is_empty() {
            "Bearer".to_string()
        } else {
            state.credential.token_type.clone()
        }
    }
}
