use crate::apis::{SearchKind, YoutubeApi};
use crate::config::{Config, SearchConfig};
use crate::constants::{API_BATCH_LIMIT, EXTRACT_STAGE};
use crate::error::{EtlError, Result};
use crate::storage::{write_rows, DataFiles};
use crate::types::{ChannelRecord, VideoRecord};
use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, warn};

/// Everything one extraction produced, in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub channels: Vec<ChannelRecord>,
    pub videos: Vec<VideoRecord>,
}

/// A channel found by search, with how many hits named it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub channel_id: String,
    pub appearances: u64,
}

/// Hit counts in first-seen order.
#[derive(Debug, Default)]
struct HitCounter {
    order: Vec<Candidate>,
    index: HashMap<String, usize>,
}

impl HitCounter {
    fn add(&mut self, channel_id: &str) {
        match self.index.get(channel_id) {
            Some(&i) => self.order[i].appearances += 1,
            None => {
                self.index.insert(channel_id.to_string(), self.order.len());
                self.order.push(Candidate {
                    channel_id: channel_id.to_string(),
                    appearances: 1,
                });
            }
        }
    }

    /// Most-mentioned first; ties keep first-seen order.
    fn ranked(mut self, limit: usize) -> Vec<Candidate> {
        self.order.sort_by(|a, b| b.appearances.cmp(&a.appearances));
        self.order.truncate(limit);
        self.order
    }
}

/// Short form of an id batch for error messages.
fn describe_ids(ids: &[String]) -> String {
    const SHOWN: usize = 3;
    if ids.len() <= SHOWN {
        ids.join(", ")
    } else {
        format!("{} and {} more", ids[..SHOWN].join(", "), ids.len() - SHOWN)
    }
}

pub struct Extractor<'a> {
    api: &'a dyn YoutubeApi,
    search: &'a SearchConfig,
}

impl<'a> Extractor<'a> {
    pub fn new(api: &'a dyn YoutubeApi, search: &'a SearchConfig) -> Self {
        Self { api, search }
    }

    /// Search, resolve channels, enumerate their uploads.
    pub async fn run(&self) -> Result<Extraction> {
        self.search.validate()?;

        let candidates = self.gather_candidates().await?;
        info!("Found {} unique channel candidates; pulling stats", candidates.len());

        let channels = self.fetch_channels(&candidates).await?;
        info!("Resolved {} channels", channels.len());

        let mut videos = Vec::new();
        let mut seen_videos = HashSet::new();
        for channel in &channels {
            let ids = self.list_uploads(channel).await?;
            let fresh: Vec<String> = ids
                .into_iter()
                .filter(|id| seen_videos.insert(id.clone()))
                .collect();
            let mut channel_videos = self.fetch_videos(&channel.channel_id, &fresh).await?;
            debug!(
                channel_id = %channel.channel_id,
                "Fetched {} of {} uploads",
                channel_videos.len(),
                fresh.len()
            );
            videos.append(&mut channel_videos);
        }

        Ok(Extraction { channels, videos })
    }

    /// Run every phrase (and kind) through search and rank the channels it named.
    #[instrument(skip(self))]
    pub async fn gather_candidates(&self) -> Result<Vec<Candidate>> {
        let mut kinds = vec![SearchKind::Channel];
        if self.search.search_videos {
            kinds.push(SearchKind::Video);
        }

        let mut counter = HitCounter::default();
        for phrase in self.search.phrases() {
            for &kind in &kinds {
                let hits = self.search_phrase(phrase, kind).await?;
                info!(
                    phrase,
                    kind = kind.as_str(),
                    "Search returned {} channel hits",
                    hits.len()
                );
                for id in &hits {
                    counter.add(id);
                }
            }
        }
        Ok(counter.ranked(self.search.max_channels))
    }

    /// Page through one search until the API runs out of pages or enough unique
    /// channels were seen. Returns every hit, repeats included.
    async fn search_phrase(&self, phrase: &str, kind: SearchKind) -> Result<Vec<String>> {
        let mut hits = Vec::new();
        let mut unique = HashSet::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .api
                .search(phrase, kind, page_token.as_deref())
                .await
                .map_err(|e| e.with_target(format!("{} search for '{phrase}'", kind.as_str())))?;
            for item in &page.items {
                if let Some(id) = item.channel_id() {
                    unique.insert(id.to_string());
                    hits.push(id.to_string());
                }
            }
            page_token = page.next_page_token.filter(|t| !t.is_empty());
            if unique.len() >= self.search.max_results_per_phrase || page_token.is_none() {
                break;
            }
        }
        Ok(hits)
    }

    /// Resolve candidates in batches, keeping ranking order.
    #[instrument(skip(self, candidates), fields(count = candidates.len()))]
    pub async fn fetch_channels(&self, candidates: &[Candidate]) -> Result<Vec<ChannelRecord>> {
        let mut by_id: HashMap<String, ChannelRecord> = HashMap::new();
        for batch in candidates.chunks(API_BATCH_LIMIT) {
            let ids: Vec<String> = batch.iter().map(|c| c.channel_id.clone()).collect();
            let items = self
                .api
                .channels(&ids)
                .await
                .map_err(|e| e.with_target(format!("channels {}", describe_ids(&ids))))?;
            for item in items {
                let appearances = batch
                    .iter()
                    .find(|c| c.channel_id == item.id)
                    .map(|c| c.appearances)
                    .unwrap_or(0);
                let record = item.into_record(appearances);
                by_id.entry(record.channel_id.clone()).or_insert(record);
            }
        }

        let mut channels = Vec::with_capacity(by_id.len());
        for candidate in candidates {
            match by_id.remove(&candidate.channel_id) {
                Some(record) => channels.push(record),
                None => warn!(
                    channel_id = %candidate.channel_id,
                    "Channel not returned by the API (deleted or terminated)"
                ),
            }
        }
        Ok(channels)
    }

    /// Every video id in the channel's uploads playlist, deduplicated, in playlist order.
    ///
    /// A channel without uploads is never listed, and a playlist the API reports as not
    /// found counts as empty.
    #[instrument(skip(self, channel), fields(channel_id = %channel.channel_id))]
    pub async fn list_uploads(&self, channel: &ChannelRecord) -> Result<Vec<String>> {
        if channel.uploads_playlist_id.is_empty() || channel.video_count == 0 {
            debug!("Channel has no uploads");
            return Ok(Vec::new());
        }

        let limit = self.search.max_videos_per_channel.unwrap_or(usize::MAX);
        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        let mut page_token: Option<String> = None;

        'pages: loop {
            let page = match self
                .api
                .playlist_items(&channel.uploads_playlist_id, page_token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(EtlError::NotFound { message, .. }) => {
                    warn!(
                        playlist_id = %channel.uploads_playlist_id,
                        "Uploads playlist not found, keeping {} ids: {}",
                        ids.len(),
                        message
                    );
                    return Ok(ids);
                }
                Err(e) => {
                    return Err(e.with_target(format!(
                        "uploads playlist {} of channel {}",
                        channel.uploads_playlist_id, channel.channel_id
                    )))
                }
            };
            for item in &page.items {
                if let Some(id) = item.video_id() {
                    if seen.insert(id.to_string()) {
                        ids.push(id.to_string());
                        if ids.len() >= limit {
                            break 'pages;
                        }
                    }
                }
            }
            page_token = page.next_page_token.filter(|t| !t.is_empty());
            if page_token.is_none() {
                break;
            }
        }
        Ok(ids)
    }

    /// Statistics for `ids`, all attributed to `channel_id`.
    pub async fn fetch_videos(&self, channel_id: &str, ids: &[String]) -> Result<Vec<VideoRecord>> {
        let mut videos = Vec::with_capacity(ids.len());
        for batch in ids.chunks(API_BATCH_LIMIT) {
            let mut items = self.api.videos(batch).await.map_err(|e| {
                e.with_target(format!("videos of channel {channel_id} ({})", describe_ids(batch)))
            })?;
            // The API does not promise request order
            items.sort_by_key(|item| batch.iter().position(|id| *id == item.id));
            for item in items {
                if let Some(owner) = item.snippet.as_ref().and_then(|s| s.channel_id.as_deref()) {
                    if owner != channel_id {
                        warn!(video_id = %item.id, owner, channel_id, "Upload owned by another channel");
                    }
                }
                videos.push(item.into_record(channel_id));
            }
        }
        Ok(videos)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractSummary {
    pub channels: usize,
    pub videos: usize,
    pub channels_file: String,
    pub videos_file: String,
}

/// Extract stage: query the API and write the raw channel and video files.
#[instrument(skip(config, api), fields(stage = EXTRACT_STAGE))]
pub async fn run_extract(config: &Config, api: &dyn YoutubeApi) -> Result<ExtractSummary> {
    let started = std::time::Instant::now();
    info!("📡 Collecting candidate channels by running searches...");

    let extraction = Extractor::new(api, &config.search).run().await?;

    let files = DataFiles::raw(&config.pipeline.data_dir);
    write_rows(&files.channels, &extraction.channels)?;
    write_rows(&files.videos, &extraction.videos)?;

    counter!("yt_etl_rows_written_total", "stage" => EXTRACT_STAGE, "entity" => "channel")
        .increment(extraction.channels.len() as u64);
    counter!("yt_etl_rows_written_total", "stage" => EXTRACT_STAGE, "entity" => "video")
        .increment(extraction.videos.len() as u64);
    histogram!("yt_etl_stage_duration_seconds", "stage" => EXTRACT_STAGE)
        .record(started.elapsed().as_secs_f64());

    info!(
        "💾 Saved {} channels to {} and {} videos to {}",
        extraction.channels.len(),
        files.channels.display(),
        extraction.videos.len(),
        files.videos.display()
    );

    Ok(ExtractSummary {
        channels: extraction.channels.len(),
        videos: extraction.videos.len(),
        channels_file: files.channels.display().to_string(),
        videos_file: files.videos.display().to_string(),
    })
}
