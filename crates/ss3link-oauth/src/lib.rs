//! OAuth 2.0 PKCE token lifecycle for the SimpliSafe cloud.
//!
//! Obtains a token pair through a one-time interactive authorization-code
//! exchange, keeps it fresh with refresh grants, and persists it so later runs
//! can skip the interactive step.
//!
//! # Components
//!
//! - [`pkce`]: verifier/challenge generation
//! - [`config`]: client identity and endpoints
//! - [`store`]: credential persistence
//! - [`token_manager`]: exchange, refresh, expiry tracking, single-flight

pub mod config;
pub mod error;
pub mod pkce;
pub mod store;
pub mod token_manager;

pub use config::OAuthConfig;
pub use error::{OAuthError, Result};
pub use pkce::PkcePair;
pub use store::{
    CredentialStore, FileCredentialStore, InMemoryCredentialStore, SharedCredentialStore,
    StoredSession,
};
pub use token_manager::{
    AuthorizationPrompt, Credential, DEFAULT_REFRESH_BUFFER, TokenManager, TokenStatus,
};
