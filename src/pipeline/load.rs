use crate::config::{Config, WarehouseConfig};
use crate::constants::LOAD_STAGE;
use crate::error::Result;
use crate::storage::{read_rows, DataFiles};
use crate::types::{ChannelRecord, VideoRecord};
use crate::warehouse::{LoadBatch, Warehouse};
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub batch_id: Uuid,
    pub channel_table: String,
    pub channel_rows: usize,
    pub video_table: String,
    pub video_rows: usize,
}

/// Append both collections to the warehouse under one connection.
///
/// Tables are created when missing and checked for the expected columns when present.
/// Each collection is appended in its own transaction, channels first. The connection
/// is released on every return path.
#[instrument(skip_all, fields(channels = channels.len(), videos = videos.len()))]
pub async fn load_records(
    config: &WarehouseConfig,
    channels: &[ChannelRecord],
    videos: &[VideoRecord],
) -> Result<LoadSummary> {
    let channel_table = config.channel_table_name()?;
    let video_table = config.video_table_name()?;

    let warehouse = Warehouse::connect(config).await?;
    warehouse.ensure_table::<ChannelRecord>(&channel_table).await?;
    warehouse.ensure_table::<VideoRecord>(&video_table).await?;

    let batch = LoadBatch::new();
    info!("📥 Appending batch {} to {} and {}", batch.id, channel_table, video_table);

    let channel_rows = warehouse.append(&channel_table, channels, &batch).await?;
    info!("Appended {} rows to {}", channel_rows, channel_table);
    let video_rows = warehouse.append(&video_table, videos, &batch).await?;
    info!("Appended {} rows to {}", video_rows, video_table);

    Ok(LoadSummary {
        batch_id: batch.id,
        channel_table,
        channel_rows,
        video_table,
        video_rows,
    })
}

/// Load stage: clean files in, warehouse rows out.
#[instrument(skip(config), fields(stage = LOAD_STAGE))]
pub async fn run_load(config: &Config) -> Result<LoadSummary> {
    let started = std::time::Instant::now();
    let files = DataFiles::clean(&config.pipeline.data_dir);

    let channels: Vec<ChannelRecord> = read_rows(&files.channels)?;
    let videos: Vec<VideoRecord> = read_rows(&files.videos)?;
    info!(
        "Read {} channels and {} videos from {}",
        channels.len(),
        videos.len(),
        files.channels.parent().map(|p| p.display().to_string()).unwrap_or_default()
    );

    let summary = load_records(&config.warehouse, &channels, &videos).await?;

    counter!("yt_etl_rows_written_total", "stage" => LOAD_STAGE, "entity" => "channel")
        .increment(summary.channel_rows as u64);
    counter!("yt_etl_rows_written_total", "stage" => LOAD_STAGE, "entity" => "video")
        .increment(summary.video_rows as u64);
    histogram!("yt_etl_stage_duration_seconds", "stage" => LOAD_STAGE)
        .record(started.elapsed().as_secs_f64());

    info!(
        "✅ Load complete: {} channels, {} videos (batch {})",
        summary.channel_rows, summary.video_rows, summary.batch_id
    );
    Ok(summary)
}
