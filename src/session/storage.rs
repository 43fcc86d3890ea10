//! Durable token storage: one JSON file holding the
//! `{"accessToken","refreshToken"}` pair. An absent, empty, or unparsable
//! file reads as "logged out" rather than an error, and writes go through a
//! temp-file rename so the pair lands atomically.

use super::{SessionError, TokenPair};
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Clone, Debug)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored pair. Any read or shape problem is treated as no
    /// session; startup must not surface storage noise to the user.
    #[must_use]
    pub fn load(&self) -> Option<TokenPair> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let json: Value = serde_json::from_str(&raw).ok()?;

        let access = json.get("accessToken").and_then(Value::as_str)?;
        let refresh = json.get("refreshToken").and_then(Value::as_str)?;

        Some(TokenPair::new(access, refresh))
    }

    /// Write the pair atomically (temp file + rename in the same
    /// directory).
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written or renamed.
    pub fn persist(&self, tokens: &TokenPair) -> Result<(), SessionError> {
        let payload = json!({
            "accessToken": tokens.access_token().expose_secret(),
            "refreshToken": tokens.refresh_token().expose_secret(),
        });

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| {
                    SessionError::Storage(format!(
                        "Failed to create {}: {err}",
                        parent.display()
                    ))
                })?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, payload.to_string()).map_err(|err| {
            SessionError::Storage(format!("Failed to write {}: {err}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.path).map_err(|err| {
            SessionError::Storage(format!("Failed to rename {}: {err}", tmp.display()))
        })?;

        debug!("token pair persisted to {}", self.path.display());

        Ok(())
    }

    /// Remove the stored pair. An already-absent file counts as success so
    /// logout stays idempotent.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SessionError::Storage(format!(
                "Failed to remove {}: {err}",
                self.path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use tempfile::TempDir;

    #[test]
    fn load_round_trips_persisted_pair() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TokenStore::new(dir.path().join("tokens.json"));

        store.persist(&TokenPair::new("AT1", "RT1"))?;

        let loaded = store.load().ok_or_else(|| anyhow!("expected a pair"))?;
        assert_eq!(loaded.access_token().expose_secret(), "AT1");
        assert_eq!(loaded.refresh_token().expose_secret(), "RT1");
        Ok(())
    }

    #[test]
    fn persist_creates_missing_directories() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TokenStore::new(dir.path().join("nested/state/tokens.json"));

        store.persist(&TokenPair::new("AT1", "RT1"))?;

        assert!(store.load().is_some());
        Ok(())
    }

    #[test]
    fn load_treats_missing_file_as_logged_out() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TokenStore::new(dir.path().join("tokens.json"));

        assert!(store.load().is_none());
        Ok(())
    }

    #[test]
    fn load_treats_garbage_as_logged_out() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("tokens.json");
        fs::write(&path, "not json at all")?;

        let store = TokenStore::new(path);
        assert!(store.load().is_none());
        Ok(())
    }

    #[test]
    fn load_requires_both_tokens() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("tokens.json");
        fs::write(&path, r#"{"accessToken": "AT1"}"#)?;

        let store = TokenStore::new(path);
        assert!(store.load().is_none());
        Ok(())
    }

    #[test]
    fn clear_is_idempotent() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TokenStore::new(dir.path().join("tokens.json"));

        store.persist(&TokenPair::new("AT1", "RT1"))?;
        store.clear()?;
        store.clear()?;

        assert!(store.load().is_none());
        assert!(!store.path().exists());
        Ok(())
    }
}
