//! Configuration management for lectern using the prefer crate.
//!
//! Load order: built-in defaults, then a config file discovered by prefer
//! (`lectern.toml`, `lectern.yaml`, `lectern.json`, ...), then environment
//! variables, then CLI flags (applied by the caller).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::acquisition::{AcquisitionConfig, DEFAULT_AUDIO_CAP_BYTES};
use crate::llm::LlmConfig;
use crate::lock::DEFAULT_LOCK_TTL;
use crate::models::DEFAULT_MAX_RETRIES;
use crate::rate_limit::{DEFAULT_MODEL_CONCURRENCY, DEFAULT_SLOT_WAIT};
use crate::retry::DEFAULT_RETRY_BASE;
use crate::worker::{DEFAULT_POP_TIMEOUT, DEFAULT_WORKER_COUNT};

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "lectern.db";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database URL (overrides data_dir/lectern.db if set).
    pub database_url: Option<String>,
    /// Redis URL for queue, lock and pub/sub. None = in-process backends.
    pub redis_url: Option<String>,
    pub worker_count: usize,
    /// Concurrent model calls across all workers.
    pub model_concurrency: usize,
    pub lock_ttl: Duration,
    pub pop_timeout: Duration,
    /// Retries granted to newly submitted jobs.
    pub max_retries: u32,
    /// Re-delivery waits `retry_base * 2^retry_count`.
    pub retry_base: Duration,
    /// Longest wait for a model slot.
    pub slot_wait: Duration,
    pub audio_cap_bytes: u64,
    pub caption_languages: Vec<String>,
    /// HTTP request timeout for scraping and downloads.
    pub http_timeout: Duration,
    pub llm: LlmConfig,
}

impl Default for Settings {
    fn default() -> Self {
        // Falls back gracefully: data dir -> home dir -> current dir
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lectern");
        let acquisition = AcquisitionConfig::default();

        Self {
            data_dir,
            database_url: None,
            redis_url: None,
            worker_count: DEFAULT_WORKER_COUNT,
            model_concurrency: DEFAULT_MODEL_CONCURRENCY,
            lock_ttl: DEFAULT_LOCK_TTL,
            pop_timeout: DEFAULT_POP_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base: DEFAULT_RETRY_BASE,
            slot_wait: DEFAULT_SLOT_WAIT,
            audio_cap_bytes: DEFAULT_AUDIO_CAP_BYTES,
            caption_languages: acquisition.caption_languages,
            http_timeout: Duration::from_secs(30),
            llm: LlmConfig::default(),
        }
    }
}

impl Settings {
    /// Defaults, then the discovered config file, then the environment.
    pub async fn load() -> (Self, Option<PathBuf>) {
        let config = Config::load().await;
        let base_dir = config
            .base_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let mut settings = Self::default();
        config.apply_to_settings(&mut settings, &base_dir);
        settings.apply_env(|key| std::env::var(key).ok());
        (settings, config.source_path)
    }

    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        match self.database_url {
            Some(ref url) => url.clone(),
            None => format!(
                "sqlite:{}",
                self.data_dir.join(DEFAULT_DATABASE_FILENAME).display()
            ),
        }
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }

    pub fn acquisition(&self) -> AcquisitionConfig {
        AcquisitionConfig {
            caption_languages: self.caption_languages.clone(),
            audio_cap_bytes: self.audio_cap_bytes,
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `LECTERN_WORKERS`: Worker count
    /// - `LECTERN_MODEL_CONCURRENCY`: Concurrent model calls
    /// - `LECTERN_LOCK_TTL_SECS`: Job lock TTL
    /// - `LECTERN_POP_TIMEOUT_SECS`: Queue pop wait
    /// - `LECTERN_MAX_RETRIES`: Retries for new jobs
    /// - `LECTERN_DATA_DIR`: Data directory
    /// - `REDIS_URL`: Redis URL
    /// - `DATABASE_URL`: Database URL
    ///
    /// Gemini settings (`GEMINI_*`) are read by [`LlmConfig`] itself.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        if let Some(n) = number("LECTERN_WORKERS") {
            self.worker_count = (n as usize).max(1);
        }
        if let Some(n) = number("LECTERN_MODEL_CONCURRENCY") {
            self.model_concurrency = (n as usize).max(1);
        }
        if let Some(secs) = number("LECTERN_LOCK_TTL_SECS") {
            self.lock_ttl = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = number("LECTERN_POP_TIMEOUT_SECS") {
            self.pop_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(n) = number("LECTERN_MAX_RETRIES") {
            self.max_retries = n.min(u32::MAX as u64) as u32;
        }
        if let Some(dir) = lookup("LECTERN_DATA_DIR").filter(|v| !v.is_empty()) {
            self.data_dir = PathBuf::from(shellexpand::tilde(&dir).as_ref());
        }
        if let Some(url) = lookup("REDIS_URL").filter(|v| !v.is_empty()) {
            self.redis_url = Some(url);
        }
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.database_url = Some(url);
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "workers")]
    pub worker_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_ttl_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pop_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_base_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_wait_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_cap_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_languages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_timeout_secs: Option<u64>,
    /// Model configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
    /// Path the config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers lectern config files in standard locations.
    pub async fn load() -> Self {
        // Use prefer for file discovery, then parse with serde
        match prefer::load("lectern").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        // File values first, then GEMINI_* on top.
        config.llm = config.llm.map(LlmConfig::with_env_overrides);
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref url) = self.database_url {
            settings.database_url = Some(url.clone());
        }
        if let Some(ref url) = self.redis_url {
            settings.redis_url = Some(url.clone());
        }
        if let Some(n) = self.worker_count {
            settings.worker_count = n.max(1);
        }
        if let Some(n) = self.model_concurrency {
            settings.model_concurrency = n.max(1);
        }
        if let Some(secs) = self.lock_ttl_secs {
            settings.lock_ttl = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = self.pop_timeout_secs {
            settings.pop_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(n) = self.max_retries {
            settings.max_retries = n;
        }
        if let Some(secs) = self.retry_base_secs {
            settings.retry_base = Duration::from_secs(secs);
        }
        if let Some(secs) = self.slot_wait_secs {
            settings.slot_wait = Duration::from_secs(secs);
        }
        if let Some(mb) = self.audio_cap_mb {
            settings.audio_cap_bytes = mb * 1024 * 1024;
        }
        if let Some(ref langs) = self.caption_languages {
            if !langs.is_empty() {
                settings.caption_languages = langs.clone();
            }
        }
        if let Some(secs) = self.http_timeout_secs {
            settings.http_timeout = Duration::from_secs(secs);
        }
        if let Some(ref llm) = self.llm {
            settings.llm = llm.clone();
        }
    }
}
