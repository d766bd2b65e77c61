//! The three stages. Each reads the previous stage's files, so any one of them can be
//! rerun on its own.

pub mod extract;
pub mod load;
pub mod normalize;
pub mod transform;

use crate::apis::YoutubeApi;
use crate::config::Config;
use crate::error::Result;
use serde::Serialize;
use tracing::info;

pub use extract::{run_extract, ExtractSummary, Extractor};
pub use load::{load_records, run_load, LoadSummary};
pub use transform::{run_transform, transform, TransformSummary};

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub extract: ExtractSummary,
    pub transform: TransformSummary,
    pub load: LoadSummary,
}

/// Extract, transform and load in sequence. The first failing stage stops the run.
pub async fn run_pipeline(config: &Config, api: &dyn YoutubeApi) -> Result<PipelineResult> {
    let extract = run_extract(config, api).await?;
    let transform = run_transform(config)?;
    let load = run_load(config).await?;
    info!(
        "🎉 Pipeline finished: {} channels and {} videos appended",
        load.channel_rows, load.video_rows
    );
    Ok(PipelineResult {
        extract,
        transform,
        load,
    })
}
