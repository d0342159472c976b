//! Persisted endpoint/key pair and runtime settings.

use crate::errors::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/webhook/tive";
pub const DEFAULT_DEBOUNCE_MS: u64 = 800;
const CONFIG_FILE_NAME: &str = "config.json";

/// The two strings that survive between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConfig {
    pub endpoint: String,
    pub api_key: String,
}

impl Default for StoredConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
        }
    }
}

/// JSON file backed store. Read once at startup, written only on explicit
/// save or clear.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the platform's local data directory
    pub fn default_location() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "tive-sender").ok_or_else(|| {
            Error::ConfigStore("Could not find local data directory".to_string())
        })?;
        Ok(Self::new(dirs.data_local_dir().join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file yields the defaults
    pub fn load(&self) -> Result<StoredConfig> {
        if !self.path.exists() {
            debug!("No stored config at {}", self.path.display());
            return Ok(StoredConfig::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, config: &StoredConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(config)?)?;
        info!("Saved config to {}", self.path.display());
        Ok(())
    }

    /// Resets the endpoint to the default and empties the key
    pub fn clear(&self) -> Result<StoredConfig> {
        let config = StoredConfig::default();
        self.save(&config)?;
        Ok(config)
    }
}

/// Effective settings after merging the store with command line overrides
#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Option<Duration>,
    pub quiet_period: Duration,
    pub history_limit: Option<usize>,
}

impl Settings {
    pub fn resolve(
        stored: StoredConfig,
        endpoint: Option<String>,
        api_key: Option<String>,
        timeout_ms: Option<u64>,
        quiet_ms: u64,
        history_limit: Option<usize>,
    ) -> Self {
        Self {
            endpoint: endpoint.unwrap_or(stored.endpoint),
            api_key: api_key.unwrap_or(stored.api_key),
            timeout: timeout_ms.map(Duration::from_millis),
            quiet_period: Duration::from_millis(quiet_ms),
            history_limit,
        }
    }

    pub fn stored(&self) -> StoredConfig {
        StoredConfig {
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
        }
    }
}

/// Shows only the last four characters of a key
pub fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return "(not set)".to_string();
    }
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));

        assert_eq!(store.load().unwrap(), StoredConfig::default());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested/config.json"));
        let config = StoredConfig {
            endpoint: "https://api.example.com/hook".to_string(),
            api_key: "secret".to_string(),
        };

        store.save(&config).unwrap();
        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn test_clear_resets_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        store
            .save(&StoredConfig {
                endpoint: "https://elsewhere".to_string(),
                api_key: "secret".to_string(),
            })
            .unwrap();

        let cleared = store.clear().unwrap();
        assert_eq!(cleared.endpoint, DEFAULT_ENDPOINT);
        assert!(cleared.api_key.is_empty());
        assert_eq!(store.load().unwrap(), cleared);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(ConfigStore::new(path).load(), Err(Error::Json(_))));
    }

    #[test]
    fn test_overrides_win() {
        let stored = StoredConfig {
            endpoint: "https://stored".to_string(),
            api_key: "stored-key".to_string(),
        };
        let settings = Settings::resolve(
            stored,
            None,
            Some("cli-key".to_string()),
            Some(1500),
            800,
            None,
        );

        assert_eq!(settings.endpoint, "https://stored");
        assert_eq!(settings.api_key, "cli-key");
        assert_eq!(settings.timeout, Some(Duration::from_millis(1500)));
        assert_eq!(settings.quiet_period, Duration::from_millis(800));
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key(""), "(not set)");
        assert_eq!(mask_key("abc"), "***");
        assert_eq!(mask_key("sk_live_1234"), "********1234");
    }
}
