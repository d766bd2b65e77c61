#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use yt_etl::apis::youtube::{ChannelItem, PlaylistItemsPage, SearchPage, VideoItem};
use yt_etl::apis::{SearchKind, YoutubeApi};
use yt_etl::error::{EtlError, Result};

/// Error an endpoint of [`FakeYoutube`] can be told to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeFailure {
    Quota,
    NotFound,
    Fatal,
}

impl FakeFailure {
    fn error(self, endpoint: &str) -> EtlError {
        let endpoint = endpoint.to_string();
        match self {
            FakeFailure::Quota => EtlError::QuotaExceeded {
                endpoint,
                message: "HTTP 403: quota exceeded".to_string(),
            },
            FakeFailure::NotFound => EtlError::NotFound {
                endpoint,
                message: "HTTP 404: playlist cannot be found".to_string(),
            },
            FakeFailure::Fatal => EtlError::Api {
                endpoint,
                message: "HTTP 400: bad request".to_string(),
            },
        }
    }
}

/// In-memory stand-in for the YouTube Data API.
///
/// Search results and playlists are paged by `page_size`; page tokens are page indexes.
pub struct FakeYoutube {
    pub page_size: usize,
    searches: HashMap<String, Vec<String>>,
    channels: HashMap<String, Value>,
    playlists: HashMap<String, Vec<String>>,
    videos: HashMap<String, Value>,
    calls: Mutex<Vec<(&'static str, usize)>>,
    failures: HashMap<&'static str, FakeFailure>,
}

impl FakeYoutube {
    pub fn new() -> Self {
        Self {
            page_size: 50,
            searches: HashMap::new(),
            channels: HashMap::new(),
            playlists: HashMap::new(),
            videos: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            failures: HashMap::new(),
        }
    }

    /// Every call to `endpoint` (after being recorded) fails with `failure`.
    pub fn failing(mut self, endpoint: &'static str, failure: FakeFailure) -> Self {
        self.failures.insert(endpoint, failure);
        self
    }

    /// `phrase` returns these channel hits, in order.
    pub fn search_hits(mut self, phrase: &str, channel_ids: &[&str]) -> Self {
        self.searches.insert(
            phrase.to_string(),
            channel_ids.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// A channel whose uploads playlist holds `video_ids`.
    pub fn channel(mut self, id: &str, country: Option<&str>, video_ids: &[&str]) -> Self {
        let uploads = format!("UU{}", id.trim_start_matches("UC"));
        self.channels.insert(
            id.to_string(),
            json!({
                "id": id,
                "snippet": {
                    "title": format!("Channel {id} 📊"),
                    "description": "Tutorials on SQL & Python\nweekly!",
                    "publishedAt": "2019-01-15T08:30:00Z",
                    "country": country,
                },
                "statistics": {
                    "viewCount": "1000",
                    "subscriberCount": "100",
                    "hiddenSubscriberCount": false,
                    "videoCount": video_ids.len().to_string(),
                },
                "contentDetails": { "relatedPlaylists": { "uploads": uploads } },
            }),
        );
        self.playlists.insert(
            uploads,
            video_ids.iter().map(|s| s.to_string()).collect(),
        );
        for video_id in video_ids {
            self.videos.entry(video_id.to_string()).or_insert_with(|| {
                json!({
                    "id": video_id,
                    "snippet": {
                        "channelId": id,
                        "title": format!("Video {video_id} 🚀"),
                        "description": "Learn joins, fast.",
                        "publishedAt": "2023-05-01T10:00:00Z",
                    },
                    "statistics": { "viewCount": "250", "likeCount": "12" },
                })
            });
        }
        self
    }

    /// Recorded `(endpoint, ids or 1)` for every call, in order.
    pub fn calls(&self) -> Vec<(&'static str, usize)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn batch_sizes(&self, endpoint: &str) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter(|(e, _)| *e == endpoint)
            .map(|(_, n)| n)
            .collect()
    }

    fn record(&self, endpoint: &'static str, n: usize) -> Result<()> {
        self.calls.lock().unwrap().push((endpoint, n));
        match self.failures.get(endpoint) {
            Some(failure) => Err(failure.error(endpoint)),
            None => Ok(()),
        }
    }

    fn page<'a>(&self, items: &'a [String], token: Option<&str>) -> (&'a [String], Option<String>) {
        let index: usize = token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let start = (index * self.page_size).min(items.len());
        let end = (start + self.page_size).min(items.len());
        let next = (end < items.len()).then(|| (index + 1).to_string());
        (&items[start..end], next)
    }
}

#[async_trait]
impl YoutubeApi for FakeYoutube {
    async fn search(
        &self,
        query: &str,
        _kind: SearchKind,
        page_token: Option<&str>,
    ) -> Result<SearchPage> {
        self.record("search", 1)?;
        let hits = self.searches.get(query).cloned().unwrap_or_default();
        let (page, next) = self.page(&hits, page_token);
        let items: Vec<Value> = page
            .iter()
            .map(|id| json!({ "id": { "kind": "youtube#channel", "channelId": id }, "snippet": { "channelId": id } }))
            .collect();
        Ok(serde_json::from_value(json!({ "nextPageToken": next, "items": items }))?)
    }

    async fn channels(&self, ids: &[String]) -> Result<Vec<ChannelItem>> {
        self.record("channels", ids.len())?;
        let mut items = Vec::new();
        for id in ids {
            if let Some(value) = self.channels.get(id) {
                items.push(serde_json::from_value(value.clone())?);
            }
        }
        Ok(items)
    }

    async fn playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage> {
        self.record("playlistItems", 1)?;
        let ids = self.playlists.get(playlist_id).cloned().unwrap_or_default();
        let (page, next) = self.page(&ids, page_token);
        let items: Vec<Value> = page
            .iter()
            .map(|id| json!({ "contentDetails": { "videoId": id } }))
            .collect();
        Ok(serde_json::from_value(json!({ "nextPageToken": next, "items": items }))?)
    }

    async fn videos(&self, ids: &[String]) -> Result<Vec<VideoItem>> {
        self.record("videos", ids.len())?;
        let mut items = Vec::new();
        // Reverse order: callers must not rely on request order
        for id in ids.iter().rev() {
            if let Some(value) = self.videos.get(id) {
                items.push(serde_json::from_value(value.clone())?);
            }
        }
        Ok(items)
    }
}
