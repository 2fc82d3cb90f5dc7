//! Login session shared between the backend client and the app.
//!
//! The session is created on login, read on every outgoing request and
//! cleared on logout or when the backend answers 401. A copy is kept on disk
//! so the next run starts logged in.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Credentials of a logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token, absent after a 403 dropped it
    #[serde(default)]
    pub token: Option<String>,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Cloneable handle to the current session.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionContext {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(session)),
        }
    }

    /// Start a session after a successful login.
    pub fn begin(&self, session: Session) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    /// Token to attach to the next request.
    pub fn token(&self) -> Option<String> {
        self.snapshot().and_then(|s| s.token)
    }

    pub fn email(&self) -> Option<String> {
        self.snapshot().map(|s| s.email)
    }

    /// Whether requests will carry a bearer token.
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn snapshot(&self) -> Option<Session> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget the whole session (logout, 401).
    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Forget only the token (403), keeping who was logged in.
    pub fn drop_token(&self) {
        if let Some(session) = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            session.token = None;
        }
    }
}

/// On-disk copy of the session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store next to the config file.
    pub fn default_location() -> Option<Self> {
        dirs::config_dir().map(|p| Self::new(p.join("marketbrief").join("session.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved session; a missing file is no session.
    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file: {}", self.path.display()))?;
        let session = toml::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", self.path.display()))?;
        Ok(Some(session))
    }

    /// Persist the current state of `ctx`, removing the file when logged out.
    pub fn save(&self, ctx: &SessionContext) -> Result<()> {
        match ctx.snapshot() {
            Some(session) => {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create session directory: {}", parent.display())
                    })?;
                }
                let content = toml::to_string_pretty(&session).context("Failed to serialize session")?;
                fs::write(&self.path, content)
                    .with_context(|| format!("Failed to write session file: {}", self.path.display()))?;
            }
            None if self.path.exists() => {
                fs::remove_file(&self.path)
                    .with_context(|| format!("Failed to remove session file: {}", self.path.display()))?;
            }
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            token: Some("jwt-token".to_string()),
            email: "asha@example.com".to_string(),
            name: Some("Asha".to_string()),
        }
    }

    #[test]
    fn test_lifecycle() {
        let ctx = SessionContext::default();
        assert!(!ctx.is_authenticated());

        ctx.begin(session());
        let shared = ctx.clone();
        assert_eq!(shared.token().as_deref(), Some("jwt-token"));

        ctx.clear();
        assert!(shared.snapshot().is_none());
    }

    #[test]
    fn test_drop_token_keeps_email() {
        let ctx = SessionContext::new(Some(session()));
        ctx.drop_token();
        assert!(!ctx.is_authenticated());
        assert_eq!(ctx.email().as_deref(), Some("asha@example.com"));
    }

    #[test]
    fn test_store_round_trip_and_logout() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("marketbrief").join("session.toml"));

        let ctx = SessionContext::new(Some(session()));
        store.save(&ctx).unwrap();
        assert_eq!(store.load().unwrap(), Some(session()));

        ctx.clear();
        store.save(&ctx).unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.load().unwrap(), None);
    }
}
