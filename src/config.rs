//! Engine configuration: environment variables override an optional TOML
//! file, which overrides built-in defaults — `from_env()` / `config_path()`
//! / `ensure_config_exists()` / `to_toml()`, scoped to the fields this
//! engine recognizes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Immutable per-engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
    pub enable_wal: bool,
    pub cache_size_pages: i64,
    pub page_size: u32,
    pub operation_timeout_ms: u64,
    pub queue_timeout_ms: u64,
    pub test_mode: bool,
    pub graceful_degradation: bool,
    pub retry_policy: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("browserstore.db"),
            busy_timeout_ms: 5_000,
            enable_wal: true,
            cache_size_pages: -2_000, // negative: kibibytes, matching SQLite's own convention
            page_size: 4_096,
            operation_timeout_ms: 5_000,
            queue_timeout_ms: 10_000,
            test_mode: false,
            graceful_degradation: false,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Shorter timeouts and a smaller retry budget, for engines under test.
    /// `test_mode` itself is never read again after construction — every
    /// other field already carries its effect.
    pub fn test_mode(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: 200,
            operation_timeout_ms: 500,
            queue_timeout_ms: 500,
            test_mode: true,
            retry_policy: RetryPolicy::test_mode(),
            ..Self::default()
        }
    }

    /// Default config directory + filename:
    /// `dirs::home_dir().join(".config").join("browserstore").join("config.toml")`.
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("browserstore")
            .join("config.toml")
    }

    /// Writes the default config file if one does not already exist at
    /// `config_path()`. Mirrors `Config::ensure_config_exists` in spirit:
    /// never overwrites a file the user has edited.
    pub fn ensure_config_exists() -> std::io::Result<()> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::default().to_toml())
    }

    /// Loads from (1) environment variables, (2) the TOML file at
    /// `config_path()` if present, (3) built-in defaults, in that
    /// precedence order — env wins over file, file wins over default.
    pub fn from_env() -> Self {
        let mut config = Self::load_file_config().unwrap_or_default();
        config.apply_env_overrides();
        config
    }

    fn load_file_config() -> Option<Self> {
        let path = Self::config_path();
        let contents = std::fs::read_to_string(path).ok()?;
        let file: FileConfig = toml::from_str(&contents).ok()?;
        Some(file.into_engine_config(Self::default()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("BROWSERSTORE_PATH") {
            self.path = PathBuf::from(v);
        }
        if let Some(v) = env_u64("BROWSERSTORE_BUSY_TIMEOUT_MS") {
            self.busy_timeout_ms = v;
        }
        if let Some(v) = env_bool("BROWSERSTORE_ENABLE_WAL") {
            self.enable_wal = v;
        }
        if let Ok(v) = std::env::var("BROWSERSTORE_CACHE_SIZE_PAGES") {
            if let Ok(parsed) = v.parse() {
                self.cache_size_pages = parsed;
            }
        }
        if let Some(v) = env_u64("BROWSERSTORE_PAGE_SIZE") {
            self.page_size = v as u32;
        }
        if let Some(v) = env_u64("BROWSERSTORE_OPERATION_TIMEOUT_MS") {
            self.operation_timeout_ms = v;
        }
        if let Some(v) = env_u64("BROWSERSTORE_QUEUE_TIMEOUT_MS") {
            self.queue_timeout_ms = v;
        }
        if let Some(v) = env_bool("BROWSERSTORE_GRACEFUL_DEGRADATION") {
            self.graceful_degradation = v;
        }
        if let Some(v) = env_u64("BROWSERSTORE_RETRY_MAX_ATTEMPTS") {
            self.retry_policy.max_attempts = v as u32;
        }
    }

    pub fn to_toml(&self) -> String {
        let file = FileConfig::from_engine_config(self);
        toml::to_string_pretty(&file).unwrap_or_default()
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.parse().ok()
}

fn env_bool(key: &str) -> Option<bool> {
    match std::env::var(key).ok()?.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// On-disk TOML shape. Every field is optional so a partial file only
/// overrides what it names, leaving the rest at their defaults.
#[derive(Debug, Default, Serialize, Deserialize)]
struct FileConfig {
    path: Option<String>,
    busy_timeout_ms: Option<u64>,
    enable_wal: Option<bool>,
    cache_size_pages: Option<i64>,
    page_size: Option<u32>,
    operation_timeout_ms: Option<u64>,
    queue_timeout_ms: Option<u64>,
    graceful_degradation: Option<bool>,
    retry_max_attempts: Option<u32>,
    retry_initial_delay_ms: Option<u64>,
    retry_max_delay_ms: Option<u64>,
    retry_backoff_multiplier: Option<f64>,
}

impl FileConfig {
    fn into_engine_config(self, mut base: EngineConfig) -> EngineConfig {
        if let Some(v) = self.path {
            base.path = PathBuf::from(v);
        }
        if let Some(v) = self.busy_timeout_ms {
            base.busy_timeout_ms = v;
        }
        if let Some(v) = self.enable_wal {
            base.enable_wal = v;
        }
        if let Some(v) = self.cache_size_pages {
            base.cache_size_pages = v;
        }
        if let Some(v) = self.page_size {
            base.page_size = v;
        }
        if let Some(v) = self.operation_timeout_ms {
            base.operation_timeout_ms = v;
        }
        if let Some(v) = self.queue_timeout_ms {
            base.queue_timeout_ms = v;
        }
        if let Some(v) = self.graceful_degradation {
            base.graceful_degradation = v;
        }
        if let Some(v) = self.retry_max_attempts {
            base.retry_policy.max_attempts = v;
        }
        if let Some(v) = self.retry_initial_delay_ms {
            base.retry_policy.initial_delay_ms = v;
        }
        if let Some(v) = self.retry_max_delay_ms {
            base.retry_policy.max_delay_ms = v;
        }
        if let Some(v) = self.retry_backoff_multiplier {
            base.retry_policy.backoff_multiplier = v;
        }
        base
    }

    fn from_engine_config(config: &EngineConfig) -> Self {
        Self {
            path: Some(config.path.to_string_lossy().into_owned()),
            busy_timeout_ms: Some(config.busy_timeout_ms),
            enable_wal: Some(config.enable_wal),
            cache_size_pages: Some(config.cache_size_pages),
            page_size: Some(config.page_size),
            operation_timeout_ms: Some(config.operation_timeout_ms),
            queue_timeout_ms: Some(config.queue_timeout_ms),
            graceful_degradation: Some(config.graceful_degradation),
            retry_max_attempts: Some(config.retry_policy.max_attempts),
            retry_initial_delay_ms: Some(config.retry_policy.initial_delay_ms),
            retry_max_delay_ms: Some(config.retry_policy.max_delay_ms),
            retry_backoff_multiplier: Some(config.retry_policy.backoff_multiplier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_not_test_mode() {
        let config = EngineConfig::default();
        assert!(!config.test_mode);
        assert!(!config.graceful_degradation);
    }

    #[test]
    fn test_test_mode_shortens_timeouts() {
        let config = EngineConfig::test_mode("scratch.db");
        let default = EngineConfig::default();
        assert!(config.operation_timeout_ms < default.operation_timeout_ms);
        assert!(config.retry_policy.max_attempts <= default.retry_policy.max_attempts);
    }

    #[test]
    fn test_to_toml_round_trips_through_file_config() {
        let config = EngineConfig::test_mode("scratch.db");
        let toml_text = config.to_toml();
        let file: FileConfig = toml::from_str(&toml_text).unwrap();
        let restored = file.into_engine_config(EngineConfig::default());
        assert_eq!(restored.path, config.path);
        assert_eq!(restored.busy_timeout_ms, config.busy_timeout_ms);
        assert_eq!(restored.retry_policy.max_attempts, config.retry_policy.max_attempts);
    }

    #[test]
    fn test_env_bool_accepts_common_spellings() {
        assert_eq!(None, env_bool("BROWSERSTORE_NONEXISTENT_KEY_FOR_TEST"));
    }
}
