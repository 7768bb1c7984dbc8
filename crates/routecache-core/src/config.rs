//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! backend URL, timeouts, HTTP logging, the package fallback policy and the
//! cache lifetimes.
//!
//! Configuration is stored at `~/.config/routecache/config.json`. Values
//! from the environment (`ROUTECACHE_*`) override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::client::DEFAULT_TIMEOUT_SECS;
use crate::api::{ClientConfig, HttpLogLevel};
use crate::cache::company::DEFAULT_DIRECTORY_TTL_HOURS;
use crate::cache::envelope::hours_ttl;
use crate::fallback::FallbackPolicy;
use crate::session::DEFAULT_SESSION_MAX_AGE_HOURS;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "routecache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_BASE_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub http_log: HttpLogLevel,
    pub fallback: FallbackPolicy,
    pub session_max_age_hours: i64,
    pub company_cache_ttl_hours: i64,
    /// Where the key-value store lives. Defaults to the platform cache dir.
    pub storage_dir: Option<PathBuf>,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: DEFAULT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_TIMEOUT_SECS,
            write_timeout_secs: DEFAULT_TIMEOUT_SECS,
            http_log: HttpLogLevel::default(),
            fallback: FallbackPolicy::default(),
            session_max_age_hours: DEFAULT_SESSION_MAX_AGE_HOURS,
            company_cache_ttl_hours: DEFAULT_DIRECTORY_TTL_HOURS,
            storage_dir: None,
            last_username: None,
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(?path, "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Cache lifetimes must not be negative. Very large ones are allowed
    /// and mean the entry effectively never expires.
    fn validate(&self) -> Result<()> {
        if self.session_max_age_hours < 0 {
            bail!("session_max_age_hours must not be negative, got {}", self.session_max_age_hours);
        }
        if self.company_cache_ttl_hours < 0 {
            bail!("company_cache_ttl_hours must not be negative, got {}", self.company_cache_ttl_hours);
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `ROUTECACHE_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ROUTECACHE_BASE_URL") {
            self.base_url = url;
        }
        if let Some(level) = lookup("ROUTECACHE_HTTP_LOG") {
            self.http_log = match HttpLogLevel::parse(&level) {
                Some(level) => level,
                None => bail!("Invalid ROUTECACHE_HTTP_LOG {:?} (expected none, basic or body)", level),
            };
        }
        if let Some(policy) = lookup("ROUTECACHE_FALLBACK") {
            self.fallback = match FallbackPolicy::parse(&policy) {
                Some(policy) => policy,
                None => bail!("Invalid ROUTECACHE_FALLBACK {:?} (expected strict or demo)", policy),
            };
        }
        if let Some(secs) = lookup("ROUTECACHE_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("Invalid ROUTECACHE_TIMEOUT_SECS {:?}", secs))?;
            self.connect_timeout_secs = secs;
            self.read_timeout_secs = secs;
            self.write_timeout_secs = secs;
        }
        if let Some(hours) = lookup("ROUTECACHE_SESSION_MAX_AGE_HOURS") {
            self.session_max_age_hours = hours
                .parse()
                .with_context(|| format!("Invalid ROUTECACHE_SESSION_MAX_AGE_HOURS {:?}", hours))?;
        }
        if let Some(hours) = lookup("ROUTECACHE_COMPANY_CACHE_TTL_HOURS") {
            self.company_cache_ttl_hours = hours
                .parse()
                .with_context(|| format!("Invalid ROUTECACHE_COMPANY_CACHE_TTL_HOURS {:?}", hours))?;
        }
        if let Some(dir) = lookup("ROUTECACHE_STORAGE_DIR") {
            self.storage_dir = Some(PathBuf::from(dir));
        }
        self.validate()
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn storage_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.storage_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            write_timeout: Duration::from_secs(self.write_timeout_secs),
            log_level: self.http_log,
            fallback: self.fallback,
        }
    }

    pub fn company_cache_ttl(&self) -> chrono::Duration {
        hours_ttl(self.company_cache_ttl_hours)
    }
}
