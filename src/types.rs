use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One channel as written by the extractor and emitted by the transformer.
///
/// Field order is the column order of the intermediate CSV files and of the
/// warehouse table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub channel_id: String,
    pub title: String,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Raw ISO code before the transform, full country name (or `unknown`) after.
    pub country: String,
    pub subscriber_count: u64,
    pub view_count: u64,
    pub video_count: u64,
    pub appearances_in_searches: u64,
    pub uploads_playlist_id: String,
}

/// One video, always owned by a channel of the same run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub channel_id: String,
    pub title: String,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
}

/// Lenient view of a channel row as read back from a file.
///
/// Every cell is an optional string so that empty, missing or hand-edited values
/// reach the transformer's coercion rules instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawChannelRow {
    pub channel_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<String>,
    pub country: Option<String>,
    pub subscriber_count: Option<String>,
    pub view_count: Option<String>,
    pub video_count: Option<String>,
    pub appearances_in_searches: Option<String>,
    pub uploads_playlist_id: Option<String>,
}

/// Lenient view of a video row as read back from a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawVideoRow {
    pub video_id: Option<String>,
    pub channel_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<String>,
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub comment_count: Option<String>,
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl From<&ChannelRecord> for RawChannelRow {
    fn from(c: &ChannelRecord) -> Self {
        Self {
            channel_id: Some(c.channel_id.clone()),
            title: Some(c.title.clone()),
            description: Some(c.description.clone()),
            published_at: c.published_at.as_ref().map(format_timestamp),
            country: Some(c.country.clone()),
            subscriber_count: Some(c.subscriber_count.to_string()),
            view_count: Some(c.view_count.to_string()),
            video_count: Some(c.video_count.to_string()),
            appearances_in_searches: Some(c.appearances_in_searches.to_string()),
            uploads_playlist_id: Some(c.uploads_playlist_id.clone()),
        }
    }
}

impl From<&VideoRecord> for RawVideoRow {
    fn from(v: &VideoRecord) -> Self {
        Self {
            video_id: Some(v.video_id.clone()),
            channel_id: Some(v.channel_id.clone()),
            title: Some(v.title.clone()),
            description: Some(v.description.clone()),
            published_at: v.published_at.as_ref().map(format_timestamp),
            view_count: Some(v.view_count.to_string()),
            like_count: Some(v.like_count.to_string()),
            comment_count: Some(v.comment_count.to_string()),
        }
    }
}
