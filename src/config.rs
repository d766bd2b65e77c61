use crate::constants::*;
use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Explicit run configuration, built once by the binaries and handed to each stage.
///
/// Precedence, lowest to highest: built-in defaults, the TOML file, environment variables.
/// Values a stage cannot do without (API key, search phrases, warehouse URL) are only
/// checked by the stage that needs them, so `transform` runs with an empty environment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub youtube: YoutubeConfig,
    pub search: SearchConfig,
    pub warehouse: WarehouseConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct YoutubeConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_YOUTUBE_BASE_URL.to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_base_delay_ms: 500,
        }
    }
}

impl YoutubeConfig {
    pub fn api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(EtlError::Config(format!(
                "{ENV_YOUTUBE_API_KEY} is not set"
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub phrases: Vec<String>,
    /// Stop paging a phrase once this many unique channels were seen for it.
    pub max_results_per_phrase: usize,
    /// Keep at most this many channels, ranked by search appearances.
    pub max_channels: usize,
    pub max_videos_per_channel: Option<usize>,
    /// Also search videos and count their owning channels.
    pub search_videos: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            phrases: Vec::new(),
            max_results_per_phrase: 200,
            max_channels: 200,
            max_videos_per_channel: None,
            search_videos: false,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.phrases.iter().all(|p| p.trim().is_empty()) {
            return Err(EtlError::Config(format!(
                "no search phrases configured (set {ENV_SEARCH_PHRASES})"
            )));
        }
        if self.max_results_per_phrase == 0 {
            return Err(EtlError::Config(
                "max_results_per_phrase must be greater than zero".to_string(),
            ));
        }
        if self.max_channels == 0 {
            return Err(EtlError::Config(
                "max_channels must be greater than zero".to_string(),
            ));
        }
        if self.max_videos_per_channel == Some(0) {
            return Err(EtlError::Config(
                "max_videos_per_channel must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Trimmed, non-empty phrases in configured order.
    pub fn phrases(&self) -> Vec<&str> {
        self.phrases
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WarehouseConfig {
    /// Local database path or `libsql://` URL.
    pub url: Option<String>,
    pub auth_token: Option<String>,
    pub database: Option<String>,
    /// Table-name prefix standing in for a warehouse schema.
    pub schema: Option<String>,
    pub channel_table: String,
    pub video_table: String,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            url: None,
            auth_token: None,
            database: None,
            schema: None,
            channel_table: "channels".to_string(),
            video_table: "videos".to_string(),
        }
    }
}

impl WarehouseConfig {
    pub fn url(&self) -> Result<&str> {
        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(EtlError::Config(format!("{ENV_WAREHOUSE_URL} is not set"))),
        }
    }

    pub fn channel_table_name(&self) -> Result<String> {
        self.qualified(&self.channel_table)
    }

    pub fn video_table_name(&self) -> Result<String> {
        self.qualified(&self.video_table)
    }

    // Table names are interpolated into DDL, so only plain identifiers pass.
    fn qualified(&self, table: &str) -> Result<String> {
        let name = match self.schema.as_deref().map(str::trim) {
            Some(schema) if !schema.is_empty() => format!("{schema}_{table}"),
            _ => table.to_string(),
        };
        if is_identifier(&name) {
            Ok(name)
        } else {
            Err(EtlError::Config(format!(
                "invalid warehouse table name '{name}'"
            )))
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Config {
    /// Load from an explicit TOML file (or `yt_etl.toml` if present), then apply the
    /// process environment on top.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        info!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay values found through `lookup` (normally `std::env::var`).
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_YOUTUBE_API_KEY) {
            self.youtube.api_key = Some(v);
        }
        if let Some(v) = get(ENV_YOUTUBE_BASE_URL) {
            self.youtube.base_url = v;
        }
        if let Some(v) = parse_var(&get, ENV_YOUTUBE_TIMEOUT_SECONDS)? {
            self.youtube.timeout_seconds = v;
        }
        if let Some(v) = parse_var(&get, ENV_YOUTUBE_MAX_RETRIES)? {
            self.youtube.max_retries = v;
        }
        if let Some(v) = parse_var(&get, ENV_YOUTUBE_RETRY_BASE_DELAY_MS)? {
            self.youtube.retry_base_delay_ms = v;
        }

        if let Some(v) = get(ENV_SEARCH_PHRASES) {
            self.search.phrases = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = parse_var(&get, ENV_MAX_RESULTS_PER_PHRASE)? {
            self.search.max_results_per_phrase = v;
        }
        if let Some(v) = parse_var(&get, ENV_MAX_CHANNELS)? {
            self.search.max_channels = v;
        }
        if let Some(v) = parse_var(&get, ENV_MAX_VIDEOS_PER_CHANNEL)? {
            self.search.max_videos_per_channel = Some(v);
        }
        if let Some(v) = get(ENV_SEARCH_VIDEOS) {
            self.search.search_videos = parse_bool(ENV_SEARCH_VIDEOS, &v)?;
        }

        if let Some(v) = get(ENV_WAREHOUSE_URL) {
            self.warehouse.url = Some(v);
        }
        if let Some(v) = get(ENV_WAREHOUSE_AUTH_TOKEN) {
            self.warehouse.auth_token = Some(v);
        }
        if let Some(v) = get(ENV_WAREHOUSE_DATABASE) {
            self.warehouse.database = Some(v);
        }
        if let Some(v) = get(ENV_WAREHOUSE_SCHEMA) {
            self.warehouse.schema = Some(v);
        }
        if let Some(v) = get(ENV_WAREHOUSE_CHANNEL_TABLE) {
            self.warehouse.channel_table = v;
        }
        if let Some(v) = get(ENV_WAREHOUSE_VIDEO_TABLE) {
            self.warehouse.video_table = v;
        }

        if let Some(v) = get(ENV_DATA_DIR) {
            self.pipeline.data_dir = PathBuf::from(v);
        }

        debug!(
            phrases = self.search.phrases.len(),
            data_dir = %self.pipeline.data_dir.display(),
            "Configuration resolved"
        );
        Ok(self)
    }
}

fn parse_var<T, F>(get: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| EtlError::Config(format!("invalid value '{raw}' for {key}: {e}"))),
        None => Ok(None),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(EtlError::Config(format!(
            "invalid value '{raw}' for {key}: expected true or false"
        ))),
    }
}
