use crate::config::Config;
use crate::constants::{TRANSFORM_STAGE, UNKNOWN_COUNTRY};
use crate::error::{EtlError, Result};
use crate::pipeline::normalize::{coerce_count, parse_timestamp, resolve_country, sanitize_text};
use crate::storage::{read_rows, write_rows, DataFiles};
use crate::types::{ChannelRecord, RawChannelRow, RawVideoRow, VideoRecord};
use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// Cleaned collections plus what the cleaning did to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub channels: Vec<ChannelRecord>,
    pub videos: Vec<VideoRecord>,
    pub report: TransformReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    pub duplicate_channels: usize,
    pub duplicate_videos: usize,
    pub unknown_countries: usize,
    /// Count cells that were missing or not a plain non-negative integer.
    pub coerced_counts: usize,
}

fn required_id(value: Option<&str>, what: &str, row: usize) -> Result<String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(id) => Ok(id.to_string()),
        None => Err(EtlError::transform(format!("{what} row #{row} has no identifier"))),
    }
}

fn text(value: Option<&str>) -> String {
    sanitize_text(value.unwrap_or_default())
}

fn count(value: Option<&str>, coerced: &mut usize) -> u64 {
    let (n, was_coerced) = coerce_count(value);
    if was_coerced {
        *coerced += 1;
    }
    n
}

/// Clean one channel row. `row` is the 1-based position used in error messages.
pub fn clean_channel(
    raw: &RawChannelRow,
    row: usize,
    report: &mut TransformReport,
) -> Result<ChannelRecord> {
    let channel_id = required_id(raw.channel_id.as_deref(), "channel", row)?;
    let country = resolve_country(raw.country.as_deref());
    if country == UNKNOWN_COUNTRY {
        report.unknown_countries += 1;
    }
    let coerced = &mut report.coerced_counts;
    Ok(ChannelRecord {
        channel_id,
        title: text(raw.title.as_deref()),
        description: text(raw.description.as_deref()),
        published_at: parse_timestamp(raw.published_at.as_deref()),
        country,
        subscriber_count: count(raw.subscriber_count.as_deref(), coerced),
        view_count: count(raw.view_count.as_deref(), coerced),
        video_count: count(raw.video_count.as_deref(), coerced),
        appearances_in_searches: count(raw.appearances_in_searches.as_deref(), coerced),
        uploads_playlist_id: raw
            .uploads_playlist_id
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
    })
}

pub fn clean_video(
    raw: &RawVideoRow,
    row: usize,
    report: &mut TransformReport,
) -> Result<VideoRecord> {
    let video_id = required_id(raw.video_id.as_deref(), "video", row)?;
    let channel_id = raw
        .channel_id
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            EtlError::transform(format!("video {video_id} (row #{row}) has no channel id"))
        })?
        .to_string();
    let coerced = &mut report.coerced_counts;
    Ok(VideoRecord {
        video_id,
        channel_id,
        title: text(raw.title.as_deref()),
        description: text(raw.description.as_deref()),
        published_at: parse_timestamp(raw.published_at.as_deref()),
        view_count: count(raw.view_count.as_deref(), coerced),
        like_count: count(raw.like_count.as_deref(), coerced),
        comment_count: count(raw.comment_count.as_deref(), coerced),
    })
}

/// Clean both collections. Pure: no files, network or warehouse.
///
/// Rows repeating an already-seen identifier are dropped (first wins). A video whose
/// channel is not among the cleaned channels fails the whole transform.
pub fn transform(channels: &[RawChannelRow], videos: &[RawVideoRow]) -> Result<TransformOutput> {
    let mut report = TransformReport::default();

    let mut seen_channels = HashSet::new();
    let mut clean_channels = Vec::with_capacity(channels.len());
    for (i, raw) in channels.iter().enumerate() {
        let channel = clean_channel(raw, i + 1, &mut report)?;
        if seen_channels.insert(channel.channel_id.clone()) {
            clean_channels.push(channel);
        } else {
            report.duplicate_channels += 1;
        }
    }

    let mut seen_videos = HashSet::new();
    let mut clean_videos = Vec::with_capacity(videos.len());
    for (i, raw) in videos.iter().enumerate() {
        let video = clean_video(raw, i + 1, &mut report)?;
        if !seen_channels.contains(&video.channel_id) {
            return Err(EtlError::transform(format!(
                "video {} references channel {} which is not in the channel file",
                video.video_id, video.channel_id
            )));
        }
        if seen_videos.insert(video.video_id.clone()) {
            clean_videos.push(video);
        } else {
            report.duplicate_videos += 1;
        }
    }

    Ok(TransformOutput {
        channels: clean_channels,
        videos: clean_videos,
        report,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct TransformSummary {
    pub channels: usize,
    pub videos: usize,
    pub report: TransformReport,
}

/// Transform stage: raw files in, clean files out.
#[instrument(skip(config), fields(stage = TRANSFORM_STAGE))]
pub fn run_transform(config: &Config) -> Result<TransformSummary> {
    let started = std::time::Instant::now();
    let input = DataFiles::raw(&config.pipeline.data_dir);
    let output = DataFiles::clean(&config.pipeline.data_dir);

    info!("🔧 Reading raw files from {}", input.channels.display());
    let raw_channels: Vec<RawChannelRow> = read_rows(&input.channels)?;
    let raw_videos: Vec<RawVideoRow> = read_rows(&input.videos)?;

    let TransformOutput {
        channels,
        videos,
        report,
    } = transform(&raw_channels, &raw_videos)?;

    if report.duplicate_channels + report.duplicate_videos > 0 {
        warn!(
            "Dropped {} duplicate channels and {} duplicate videos",
            report.duplicate_channels, report.duplicate_videos
        );
    }
    if report.unknown_countries > 0 {
        info!("{} channels have no recognizable country", report.unknown_countries);
    }
    if report.coerced_counts > 0 {
        info!("Coerced {} count cells to integers", report.coerced_counts);
    }

    write_rows(&output.channels, &channels)?;
    write_rows(&output.videos, &videos)?;
    counter!("yt_etl_rows_written_total", "stage" => TRANSFORM_STAGE, "entity" => "channel")
        .increment(channels.len() as u64);
    counter!("yt_etl_rows_written_total", "stage" => TRANSFORM_STAGE, "entity" => "video")
        .increment(videos.len() as u64);
    histogram!("yt_etl_stage_duration_seconds", "stage" => TRANSFORM_STAGE)
        .record(started.elapsed().as_secs_f64());

    info!(
        "✅ Cleaned {} channels and {} videos into {}",
        channels.len(),
        videos.len(),
        output.channels.parent().map(|p| p.display().to_string()).unwrap_or_default()
    );

    Ok(TransformSummary {
        channels: channels.len(),
        videos: videos.len(),
        report,
    })
}
