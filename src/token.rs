//! Persistent bearer-token store.
//!
//! The backend authenticates every REST request and stream connection with a
//! single `access_token` credential obtained out of band (the login flow is
//! not part of this client). The token lives in a small JSON file so it
//! survives restarts; get/set is the whole contract.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

// ---

const ACCESS_TOKEN_KEY: &str = "access_token";

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    // ---
    pub fn new(path: impl AsRef<Path>) -> Self {
        TokenStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read the stored credential, `None` when nothing is stored yet.
    pub fn get(&self) -> Result<Option<String>> {
        // ---
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token store {}", self.path.display()))?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&contents)
            .with_context(|| format!("Token store {} is corrupt", self.path.display()))?;

        Ok(entries.get(ACCESS_TOKEN_KEY).cloned())
    }

    /// Store (or replace) the credential.
    pub fn set(&self, token: &str) -> Result<()> {
        // ---
        let mut entries = BTreeMap::new();
        entries.insert(ACCESS_TOKEN_KEY.to_string(), token.to_string());

        let contents = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write token store {}", self.path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_get_set_roundtrip() {
        // ---
        let path = std::env::temp_dir().join("greenhouse_token_test.json");
        let _ = fs::remove_file(&path);

        let store = TokenStore::new(&path);
        assert!(store.get().expect("readable").is_none());

        store.set("abc123").expect("writable");
        assert_eq!(store.get().expect("readable").as_deref(), Some("abc123"));

        store.set("def456").expect("writable");
        assert_eq!(store.get().expect("readable").as_deref(), Some("def456"));

        let _ = fs::remove_file(&path);
    }
}
