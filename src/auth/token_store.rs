use keyring::{Entry, Error as KeyringError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{Error, Result};

const SERVICE: &str = "rs_webmail_client";
const DEFAULT_ACCOUNT: &str = "session";

/// Durable home of the session token. Reads always go to the backing
/// storage so a write is visible to the very next read.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Token kept in the OS keyring, one entry per configured account.
pub struct KeyringTokenStore {
    account: String,
}

impl KeyringTokenStore {
    pub fn new(account: Option<&str>) -> Self {
        Self {
            account: account.unwrap_or(DEFAULT_ACCOUNT).to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Ok(Entry::new(SERVICE, &self.account)?)
    }
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(v) => Ok(Some(v)),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        log::debug!("keyring SET: service={SERVICE:?} account={:?}", self.account);
        self.entry()?.set_password(token)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(KeyringError::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// On-disk layout of the session file.
#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    token: Option<String>,
}

/// Token kept in a small JSON file (default: `~/.config/rs_webmail_client/session.json`).
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn write(&self, token: Option<&str>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let sf = SessionFile {
            token: token.map(|s| s.to_string()),
        };
        let s = serde_json::to_string_pretty(&sf).map_err(|e| Error::Storage(e.to_string()))?;
        fs::write(&self.path, s)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&self.path)?;
        let sf: SessionFile = serde_json::from_str(&s).map_err(|e| {
            Error::Storage(format!("corrupt session file {}: {e}", self.path.display()))
        })?;
        Ok(sf.token.filter(|t| !t.is_empty()))
    }

    fn save(&self, token: &str) -> Result<()> {
        self.write(Some(token))
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            self.write(None)?;
        }
        Ok(())
    }
}

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot().clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("session.json"));
        assert_eq!(store.load().unwrap(), None);

        store.save("first").unwrap();
        store.save("second").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("second"));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn file_store_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        FileTokenStore::new(&path).save("persisted").unwrap();
        assert_eq!(
            FileTokenStore::new(&path).load().unwrap().as_deref(),
            Some("persisted")
        );
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            FileTokenStore::new(&path).load(),
            Err(Error::Storage(_))
        ));
    }

    #[test]
    fn memory_store_write_is_visible_immediately() {
        let store = MemoryTokenStore::new();
        store.save("t").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("t"));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
