//! Stage runners shared by the `yt_etl` command and the single-stage binaries.

use crate::apis::youtube::YoutubeClient;
use crate::config::Config;
use crate::constants::{EXTRACT_STAGE, LOAD_STAGE, TRANSFORM_STAGE};
use crate::logging;
use crate::pipeline::{
    run_extract, run_load, run_transform, ExtractSummary, LoadSummary, TransformSummary,
};
use anyhow::Context;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Transform,
    Load,
    /// All three, in order.
    Run,
}

fn print_extract(summary: &ExtractSummary) {
    println!("\n📊 Extract Results:");
    println!("   Channels: {} -> {}", summary.channels, summary.channels_file);
    println!("   Videos: {} -> {}", summary.videos, summary.videos_file);
}

fn print_transform(summary: &TransformSummary) {
    println!("\n📊 Transform Results:");
    println!("   Channels: {}", summary.channels);
    println!("   Videos: {}", summary.videos);
    println!(
        "   Duplicates dropped: {} channels, {} videos",
        summary.report.duplicate_channels, summary.report.duplicate_videos
    );
    println!("   Unknown countries: {}", summary.report.unknown_countries);
    println!("   Coerced counts: {}", summary.report.coerced_counts);
}

fn print_load(summary: &LoadSummary) {
    println!("\n📊 Load Results:");
    println!("   Batch: {}", summary.batch_id);
    println!("   {}: {} rows appended", summary.channel_table, summary.channel_rows);
    println!("   {}: {} rows appended", summary.video_table, summary.video_rows);
}

async fn extract(config: &Config) -> anyhow::Result<()> {
    println!("🔄 Running extract stage...");
    let client = YoutubeClient::new(&config.youtube).context("extract stage failed")?;
    let summary = run_extract(config, &client)
        .await
        .with_context(|| format!("{EXTRACT_STAGE} stage failed"))?;
    print_extract(&summary);
    Ok(())
}

fn transform(config: &Config) -> anyhow::Result<()> {
    println!("🔨 Running transform stage...");
    let summary = run_transform(config).with_context(|| format!("{TRANSFORM_STAGE} stage failed"))?;
    print_transform(&summary);
    Ok(())
}

async fn load(config: &Config) -> anyhow::Result<()> {
    println!("📥 Running load stage...");
    let summary = run_load(config)
        .await
        .with_context(|| format!("{LOAD_STAGE} stage failed"))?;
    print_load(&summary);
    Ok(())
}

/// Run `stage` against an already loaded configuration.
pub async fn run_stage(stage: Stage, config: &Config) -> anyhow::Result<()> {
    match stage {
        Stage::Extract => extract(config).await,
        Stage::Transform => transform(config),
        Stage::Load => load(config).await,
        Stage::Run => {
            extract(config).await?;
            transform(config)?;
            load(config).await?;
            println!("\n✅ Pipeline complete");
            Ok(())
        }
    }
}

/// Full binary entry: `.env`, logging, configuration, then the stage.
pub async fn main_for(stage: Stage, config_path: Option<&Path>) -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _guard = logging::init_logging();

    let config = Config::load(config_path).context("failed to load configuration")?;
    info!(?stage, data_dir = %config.pipeline.data_dir.display(), "Starting");
    run_stage(stage, &config).await
}
