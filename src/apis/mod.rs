pub mod youtube;

use crate::error::Result;
use async_trait::async_trait;
use youtube::{ChannelItem, PlaylistItemsPage, SearchPage, VideoItem};

/// What a search request is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
    Channel,
    Video,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Channel => "channel",
            SearchKind::Video => "video",
        }
    }
}

/// The four YouTube Data API calls the extractor needs.
///
/// Batch methods take at most [`crate::constants::API_BATCH_LIMIT`] ids; callers chunk.
#[async_trait]
pub trait YoutubeApi: Send + Sync {
    /// One page of `search.list`.
    async fn search(
        &self,
        query: &str,
        kind: SearchKind,
        page_token: Option<&str>,
    ) -> Result<SearchPage>;

    /// `channels.list` with snippet, statistics and contentDetails.
    async fn channels(&self, ids: &[String]) -> Result<Vec<ChannelItem>>;

    /// One page of `playlistItems.list`.
    async fn playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage>;

    /// `videos.list` with snippet and statistics.
    async fn videos(&self, ids: &[String]) -> Result<Vec<VideoItem>>;
}
