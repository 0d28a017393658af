//! Credential persistence.
//!
//! The stored blob is `{"accessToken", "refreshToken", "codeVerifier"}`. A blob
//! with any of those missing, null or empty is the same as no blob.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{OAuthError, Result};

/// A complete persisted session.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub access_token: String,
    pub refresh_token: String,
    pub code_verifier: String,
}

impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession").finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSession {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    code_verifier: Option<String>,
}

impl RawSession {
    fn into_session(self) -> Option<StoredSession> {
        let present = |field: Option<String>| field.filter(|s| !s.is_empty() && s != "null");
        Some(StoredSession {
            access_token: present(self.access_token)?,
            refresh_token: present(self.refresh_token)?,
            code_verifier: present(self.code_verifier)?,
        })
    }
}

impl StoredSession {
    /// Parse a stored blob; `None` when any field is unusable.
    pub fn from_json(json: &str) -> Result<Option<Self>> {
        let raw: RawSession = serde_json::from_str(json)?;
        Ok(raw.into_session())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Key-value persistence for the session blob.
#[async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    /// Load the stored session. `Ok(None)` when absent or incomplete.
    async fn load(&self) -> Result<Option<StoredSession>>;

    /// Replace the stored session.
    async fn save(&self, session: &StoredSession) -> Result<()>;

    /// Remove the stored session.
    async fn clear(&self) -> Result<()>;
}

/// Shared store handle.
pub type SharedCredentialStore = Arc<dyn CredentialStore>;

// ============================================================================
// FileCredentialStore
// ============================================================================

/// JSON file store.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a file is present, complete or not.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<StoredSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| OAuthError::Persistence(format!("Failed to read credentials: {}", e)))?;

        StoredSession::from_json(&content)
    }

    async fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                OAuthError::Persistence(format!("Failed to create credentials directory: {}", e))
            })?;
        }

        let json = session.to_json()?;
        std::fs::write(&self.path, json)
            .map_err(|e| OAuthError::Persistence(format!("Failed to write credentials: {}", e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).map_err(
                |e| OAuthError::Persistence(format!("Failed to restrict credentials file: {}", e)),
            )?;
        }

        tracing::info!(path = %self.path.display(), "Credentials saved");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| {
                OAuthError::Persistence(format!("Failed to delete credentials: {}", e))
            })?;
            tracing::info!(path = %self.path.display(), "Credentials removed");
        }
        Ok(())
    }
}

// ============================================================================
// InMemoryCredentialStore (for testing)
// ============================================================================

/// In-memory store for tests; writes can be made to fail.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    session: RwLock<Option<StoredSession>>,
    fail_writes: AtomicBool,
    save_count: AtomicU32,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: StoredSession) -> Self {
        Self {
            session: RwLock::new(Some(session)),
            ..Self::default()
        }
    }

    /// Make `save` and `clear` fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn session(&self) -> Option<StoredSession> {
        self.session.read().clone()
    }

    pub fn save_count(&self) -> u32 {
        self.save_count.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(OAuthError::Persistence("store is read-only".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self) -> Result<Option<StoredSession>> {
        Ok(self.session.read().clone())
    }

    async fn save(&self, session: &StoredSession) -> Result<()> {
        self.check_writable()?;
        *self.session.write() = Some(session.clone());
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.check_writable()?;
        *self.session.write() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn session() -> StoredSession {
        StoredSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            code_verifier: "verifier".to_string(),
        }
    }

    #[test]
    fn test_blob_field_names() {
        let json = session().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["accessToken"], "access");
        assert_eq!(value["refreshToken"], "refresh");
        assert_eq!(value["codeVerifier"], "verifier");
    }

    #[test]
    fn test_incomplete_blob_is_no_session() {
        assert!(
            StoredSession::from_json(r#"{"accessToken":"a","refreshToken":"r"}"#)
                .unwrap()
                .is_none()
        );
        assert!(
            StoredSession::from_json(r#"{"accessToken":"a","refreshToken":null,"codeVerifier":"v"}"#)
                .unwrap()
                .is_none()
        );
        assert!(
            StoredSession::from_json(r#"{"accessToken":"a","refreshToken":"","codeVerifier":"v"}"#)
                .unwrap()
                .is_none()
        );
        assert!(
            StoredSession::from_json(r#"{"accessToken":"a","refreshToken":"null","codeVerifier":"v"}"#)
                .unwrap()
                .is_none()
        );
        assert!(StoredSession::from_json("{}").unwrap().is_none());
        assert!(StoredSession::from_json("not json").is_err());
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let temp = tempdir().unwrap();
        let store = FileCredentialStore::new(temp.path().join("nested").join("credentials.json"));
        assert!(store.load().await.unwrap().is_none());

        store.save(&session()).await.unwrap();
        assert!(store.exists());
        assert_eq!(store.load().await.unwrap(), Some(session()));

        store.clear().await.unwrap();
        assert!(!store.exists());
        assert!(store.load().await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_store_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let store = FileCredentialStore::new(temp.path().join("credentials.json"));
        store.save(&session()).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("credentials.json");
        std::fs::write(&path, "{{{").unwrap();

        let store = FileCredentialStore::new(path);
        assert!(matches!(
            store.load().await.unwrap_err(),
            OAuthError::Serialization(_)
        ));
    }

    #[tokio::test]
    async fn test_in_memory_fail_writes() {
        let store = InMemoryCredentialStore::new();
        store.set_fail_writes(true);
        assert!(matches!(
            store.save(&session()).await.unwrap_err(),
            OAuthError::Persistence(_)
        ));
        assert!(store.session().is_none());

        store.set_fail_writes(false);
        store.save(&session()).await.unwrap();
        assert_eq!(store.save_count(), 1);
    }
}
