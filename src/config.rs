use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::token_store::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};

pub const APP_DIR: &str = "rs_webmail_client";
pub const API_URL_ENV: &str = "WEBMAIL_API_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenBackend {
    #[default]
    File,
    Keyring,
    /// Process-local; the session ends with the process.
    Memory,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub per_page: u32,
    pub request_timeout_secs: u64,
    pub confirm_delay_ms: u64,
    pub token_backend: TokenBackend,
    pub user_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            per_page: 20,
            request_timeout_secs: 30,
            confirm_delay_ms: 1500,
            token_backend: TokenBackend::File,
            user_email: None,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn confirm_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_delay_ms)
    }

    /// Page size sent to the listing endpoint, never zero.
    pub fn page_size(&self) -> u32 {
        self.per_page.max(1)
    }

    /// Opens the configured token backend. `seed` pre-loads a memory store
    /// and is ignored by the persistent backends.
    pub fn token_store(&self, seed: Option<&str>) -> Result<Box<dyn TokenStore>> {
        Ok(match self.token_backend {
            TokenBackend::File => Box::new(FileTokenStore::new(default_session_path()?)),
            TokenBackend::Keyring => Box::new(KeyringTokenStore::new(self.user_email.as_deref())),
            TokenBackend::Memory => match seed.filter(|t| !t.is_empty()) {
                Some(token) => Box::new(MemoryTokenStore::with_token(token)),
                None => Box::new(MemoryTokenStore::new()),
            },
        })
    }
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join(APP_DIR))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn default_session_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("session.json");
    Ok(p)
}

/// Loads the user's config, writing a template with defaults on first run.
/// `WEBMAIL_API_URL` overrides the base URL from the file.
pub fn load_config() -> Result<Config> {
    let mut cfg = load_from(&config_path()?)?;
    if let Ok(url) = std::env::var(API_URL_ENV)
        && !url.trim().is_empty()
    {
        cfg.api_base_url = url.trim().to_string();
    }
    Ok(cfg)
}

pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        let sample = Config::default();
        let tom = toml::to_string_pretty(&sample)?;
        fs::write(path, tom)?;
        log::info!("created template config at {}", path.display());
        return Ok(sample);
    }
    let s = fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&s)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
    Ok(cfg)
}
