//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backing spreadsheet id, the API token and the calendar
//! ids, plus the two timing knobs of the data layer (cache TTL and the
//! client poll interval).
//!
//! Configuration is stored at `~/.config/sheetcrm/config.json`. The
//! spreadsheet id and token can also be supplied through `SHEETCRM_*`
//! environment variables, which take precedence over the file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for the config directory path
const APP_NAME: &str = "sheetcrm";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// How long a cache entry stays fresh, in milliseconds.
/// 30 seconds balances immediacy against spreadsheet API quota.
const DEFAULT_CACHE_TTL_MS: u64 = 30_000;

/// How often polling clients check the global write timestamp, in
/// milliseconds. 2 minutes keeps drift detection cheap for idle sessions.
const DEFAULT_POLL_INTERVAL_MS: u64 = 120_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub spreadsheet_id: Option<String>,
    pub api_token: Option<String>,
    pub calendar_id: Option<String>,
    pub holiday_calendar_id: Option<String>,
    pub timezone: Option<String>,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_cache_ttl_ms() -> u64 {
    DEFAULT_CACHE_TTL_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            api_token: None,
            calendar_id: None,
            holiday_calendar_id: None,
            timezone: None,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("SHEETCRM_SPREADSHEET_ID") {
            self.spreadsheet_id = Some(id);
        }
        if let Ok(token) = std::env::var("SHEETCRM_API_TOKEN") {
            self.api_token = Some(token);
        }
        if let Ok(id) = std::env::var("SHEETCRM_CALENDAR_ID") {
            self.calendar_id = Some(id);
        }
    }

    /// TTL after which a cache entry is considered stale.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Interval between staleness checks on polling clients.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timings() {
        let config = Config::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(30));
        assert_eq!(config.poll_interval(), Duration::from_secs(120));
    }

    #[test]
    fn test_missing_timings_fall_back_to_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"spreadsheet_id": "abc123"}"#).unwrap();
        assert_eq!(config.spreadsheet_id.as_deref(), Some("abc123"));
        assert_eq!(config.cache_ttl_ms, 30_000);
        assert_eq!(config.poll_interval_ms, 120_000);
    }
}
