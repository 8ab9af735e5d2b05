//! Where the Gemini API key lives
//!
//! The chat widget only sees the [`CredentialStore`] trait: it reads the key
//! when a request starts and clears it when the service rejects it.

use std::path::PathBuf;
use std::sync::Mutex;
use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn clear(&self) -> Result<()>;
}

/// Key from the `GEMINI_API_KEY` environment variable, falling back to the
/// config file.
#[derive(Debug, Clone)]
pub struct ConfigCredentials {
    path: PathBuf,
    read_env: bool,
}

impl ConfigCredentials {
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: Config::config_path()?,
            read_env: true,
        })
    }

    /// Config-file only, no environment lookup
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_env: false,
        }
    }

    fn env_key(&self) -> Option<String> {
        if !self.read_env {
            return None;
        }
        std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty())
    }

    /// Returns where the current key comes from: "env", "config", or None
    pub fn source(&self) -> Option<&'static str> {
        if self.env_key().is_some() {
            Some("env")
        } else if self.config_key().is_some() {
            Some("config")
        } else {
            None
        }
    }

    fn config_key(&self) -> Option<String> {
        match Config::load_from(&self.path) {
            Ok(config) => config.gemini_api_key.filter(|k| !k.trim().is_empty()),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read config");
                None
            }
        }
    }

    pub fn store(&self, key: &str) -> Result<()> {
        let mut config = Config::load_from(&self.path)?;
        config.gemini_api_key = Some(key.trim().to_string());
        config.save_to(&self.path)?;
        info!(path = %self.path.display(), "stored API key");
        Ok(())
    }
}

impl CredentialStore for ConfigCredentials {
    fn get(&self) -> Option<String> {
        self.env_key().or_else(|| self.config_key())
    }

    fn clear(&self) -> Result<()> {
        if self.env_key().is_some() {
            warn!("{} is set in the environment and cannot be cleared from here", API_KEY_ENV);
        }

        let mut config = Config::load_from(&self.path)?;
        if config.gemini_api_key.take().is_some() {
            config.save_to(&self.path)?;
            info!(path = %self.path.display(), "cleared stored API key");
        }
        Ok(())
    }
}

/// In-memory key, used by tests and one-off sessions
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    key: Mutex<Option<String>>,
}

impl MemoryCredentials {
    pub fn new(key: Option<&str>) -> Self {
        Self {
            key: Mutex::new(key.map(str::to_string)),
        }
    }
}

impl CredentialStore for MemoryCredentials {
    fn get(&self) -> Option<String> {
        self.key.lock().ok().and_then(|k| k.clone())
    }

    fn clear(&self) -> Result<()> {
        if let Ok(mut key) = self.key.lock() {
            *key = None;
        }
        Ok(())
    }
}
