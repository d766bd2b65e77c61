//! YouTube Data API v3 response shapes and the reqwest-backed client.
//!
//! Responses are deserialized into the structs below and mapped straight into
//! [`ChannelRecord`]/[`VideoRecord`]; nothing past this module sees JSON.

use crate::apis::{SearchKind, YoutubeApi};
use crate::config::YoutubeConfig;
use crate::constants::API_BATCH_LIMIT;
use crate::error::{EtlError, Result};
use crate::infra::http_client::{ReqwestHttp, RetryPolicy};
use crate::pipeline::normalize::parse_timestamp;
use crate::types::{ChannelRecord, VideoRecord};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<SearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub id: SearchResultId,
    pub snippet: Option<SearchSnippet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultId {
    pub kind: Option<String>,
    pub channel_id: Option<String>,
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnippet {
    pub channel_id: Option<String>,
}

impl SearchResult {
    /// Channel a hit belongs to: the snippet's owner, else the id of a channel result.
    pub fn channel_id(&self) -> Option<&str> {
        self.snippet
            .as_ref()
            .and_then(|s| s.channel_id.as_deref())
            .or(self.id.channel_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelItem {
    pub id: String,
    pub snippet: Option<ChannelSnippet>,
    pub statistics: Option<ChannelStatistics>,
    pub content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub published_at: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatistics {
    #[serde(default, deserialize_with = "lenient_count")]
    pub view_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub subscriber_count: Option<u64>,
    #[serde(default)]
    pub hidden_subscriber_count: bool,
    #[serde(default, deserialize_with = "lenient_count")]
    pub video_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelContentDetails {
    pub related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelatedPlaylists {
    pub uploads: Option<String>,
}

impl ChannelItem {
    pub fn into_record(self, appearances_in_searches: u64) -> ChannelRecord {
        let snippet = self.snippet.unwrap_or_default();
        let stats = self.statistics.unwrap_or_default();
        let uploads = self
            .content_details
            .and_then(|d| d.related_playlists)
            .and_then(|p| p.uploads)
            .unwrap_or_default();

        ChannelRecord {
            channel_id: self.id,
            title: snippet.title,
            description: snippet.description,
            published_at: parse_timestamp(snippet.published_at.as_deref()),
            country: snippet.country.unwrap_or_default(),
            // Hidden subscriber counts come back absent
            subscriber_count: stats.subscriber_count.unwrap_or(0),
            view_count: stats.view_count.unwrap_or(0),
            video_count: stats.video_count.unwrap_or(0),
            appearances_in_searches,
            uploads_playlist_id: uploads,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemsPage {
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    pub content_details: Option<PlaylistItemContentDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemContentDetails {
    pub video_id: Option<String>,
}

impl PlaylistItem {
    pub fn video_id(&self) -> Option<&str> {
        self.content_details
            .as_ref()
            .and_then(|d| d.video_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoItem {
    pub id: String,
    pub snippet: Option<VideoSnippet>,
    pub statistics: Option<VideoStatistics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub channel_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    #[serde(default, deserialize_with = "lenient_count")]
    pub view_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub like_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub comment_count: Option<u64>,
}

impl VideoItem {
    /// Map into a record owned by `channel_id`; absent statistics (likes hidden,
    /// comments disabled) become zero.
    pub fn into_record(self, channel_id: &str) -> VideoRecord {
        let snippet = self.snippet.unwrap_or_default();
        let stats = self.statistics.unwrap_or_default();
        VideoRecord {
            video_id: self.id,
            channel_id: channel_id.to_string(),
            title: snippet.title,
            description: snippet.description,
            published_at: parse_timestamp(snippet.published_at.as_deref()),
            view_count: stats.view_count.unwrap_or(0),
            like_count: stats.like_count.unwrap_or(0),
            comment_count: stats.comment_count.unwrap_or(0),
        }
    }
}

/// The API sends counts as decimal strings; accept bare numbers and null as well.
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Float(f64),
        Text(String),
    }

    Ok(match Option::<Count>::deserialize(deserializer)? {
        Some(Count::Number(n)) => Some(n),
        Some(Count::Float(f)) if f.is_finite() && f >= 0.0 => Some(f as u64),
        Some(Count::Float(_)) => None,
        Some(Count::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Production [`YoutubeApi`] over HTTPS, authenticated with an API key.
pub struct YoutubeClient {
    http: ReqwestHttp,
    base_url: String,
    api_key: String,
}

impl YoutubeClient {
    pub fn new(config: &YoutubeConfig) -> Result<Self> {
        let api_key = config.api_key()?.to_string();
        let policy = RetryPolicy {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        };
        let http = ReqwestHttp::new(Duration::from_secs(config.timeout_seconds), policy)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    fn check_batch(endpoint: &str, ids: &[String]) -> Result<()> {
        if ids.len() > API_BATCH_LIMIT {
            return Err(EtlError::api(
                endpoint,
                format!(
                    "batch of {} ids exceeds the limit of {}",
                    ids.len(),
                    API_BATCH_LIMIT
                ),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl YoutubeApi for YoutubeClient {
    #[instrument(skip(self, page_token))]
    async fn search(
        &self,
        query: &str,
        kind: SearchKind,
        page_token: Option<&str>,
    ) -> Result<SearchPage> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("q", query.to_string()),
            ("type", kind.as_str().to_string()),
            ("maxResults", API_BATCH_LIMIT.to_string()),
            ("key", self.api_key.clone()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        self.http.get_json("search", &self.url("search"), &params).await
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn channels(&self, ids: &[String]) -> Result<Vec<ChannelItem>> {
        Self::check_batch("channels", ids)?;
        let params = vec![
            ("part", "snippet,statistics,contentDetails".to_string()),
            ("id", ids.join(",")),
            ("maxResults", API_BATCH_LIMIT.to_string()),
            ("key", self.api_key.clone()),
        ];
        let resp: ChannelListResponse = self
            .http
            .get_json("channels", &self.url("channels"), &params)
            .await?;
        debug!("channels.list returned {} of {} ids", resp.items.len(), ids.len());
        Ok(resp.items)
    }

    #[instrument(skip(self, page_token))]
    async fn playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage> {
        let mut params = vec![
            ("part", "contentDetails".to_string()),
            ("playlistId", playlist_id.to_string()),
            ("maxResults", API_BATCH_LIMIT.to_string()),
            ("key", self.api_key.clone()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        self.http
            .get_json("playlistItems", &self.url("playlistItems"), &params)
            .await
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn videos(&self, ids: &[String]) -> Result<Vec<VideoItem>> {
        Self::check_batch("videos", ids)?;
        let params = vec![
            ("part", "snippet,statistics".to_string()),
            ("id", ids.join(",")),
            ("maxResults", API_BATCH_LIMIT.to_string()),
            ("key", self.api_key.clone()),
        ];
        let resp: VideoListResponse = self
            .http
            .get_json("videos", &self.url("videos"), &params)
            .await?;
        debug!("videos.list returned {} of {} ids", resp.items.len(), ids.len());
        Ok(resp.items)
    }
}
