//! Names shared across stages: environment variables, file layout, API limits.

// Stage names (used in CLI output, logs and metric labels)
pub const EXTRACT_STAGE: &str = "extract";
pub const TRANSFORM_STAGE: &str = "transform";
pub const LOAD_STAGE: &str = "load";

// YouTube Data API
pub const DEFAULT_YOUTUBE_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
/// Per-request id and page-size limit imposed by the API.
pub const API_BATCH_LIMIT: usize = 50;

// Environment variables
pub const ENV_YOUTUBE_API_KEY: &str = "YOUTUBE_API_KEY";
pub const ENV_YOUTUBE_BASE_URL: &str = "YOUTUBE_API_BASE_URL";
pub const ENV_YOUTUBE_TIMEOUT_SECONDS: &str = "YOUTUBE_TIMEOUT_SECONDS";
pub const ENV_YOUTUBE_MAX_RETRIES: &str = "YOUTUBE_MAX_RETRIES";
pub const ENV_YOUTUBE_RETRY_BASE_DELAY_MS: &str = "YOUTUBE_RETRY_BASE_DELAY_MS";
pub const ENV_SEARCH_PHRASES: &str = "YOUTUBE_SEARCH_PHRASES";
pub const ENV_MAX_RESULTS_PER_PHRASE: &str = "YOUTUBE_MAX_RESULTS_PER_PHRASE";
pub const ENV_MAX_CHANNELS: &str = "YOUTUBE_MAX_CHANNELS";
pub const ENV_MAX_VIDEOS_PER_CHANNEL: &str = "YOUTUBE_MAX_VIDEOS_PER_CHANNEL";
pub const ENV_SEARCH_VIDEOS: &str = "YOUTUBE_SEARCH_VIDEOS";
pub const ENV_WAREHOUSE_URL: &str = "WAREHOUSE_URL";
pub const ENV_WAREHOUSE_AUTH_TOKEN: &str = "WAREHOUSE_AUTH_TOKEN";
pub const ENV_WAREHOUSE_DATABASE: &str = "WAREHOUSE_DATABASE";
pub const ENV_WAREHOUSE_SCHEMA: &str = "WAREHOUSE_SCHEMA";
pub const ENV_WAREHOUSE_CHANNEL_TABLE: &str = "WAREHOUSE_CHANNEL_TABLE";
pub const ENV_WAREHOUSE_VIDEO_TABLE: &str = "WAREHOUSE_VIDEO_TABLE";
pub const ENV_DATA_DIR: &str = "YT_ETL_DATA_DIR";

// Config file picked up when --config is not given
pub const DEFAULT_CONFIG_FILE: &str = "yt_etl.toml";

// Intermediate file layout under the data directory
pub const RAW_DIR: &str = "raw";
pub const CLEAN_DIR: &str = "clean";
pub const CHANNELS_FILE: &str = "channels.csv";
pub const VIDEOS_FILE: &str = "videos.csv";

// Logging
pub const LOG_DIR: &str = "logs";
pub const LOG_FILE: &str = "yt_etl.log";

/// Country value written when a code is missing or unrecognized.
pub const UNKNOWN_COUNTRY: &str = "unknown";
