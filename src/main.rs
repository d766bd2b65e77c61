use clap::{Parser, Subcommand};
use std::path::PathBuf;
use yt_etl::cli::{main_for, Stage};

#[derive(Parser)]
#[command(name = "yt_etl")]
#[command(about = "YouTube channel and video ETL into a SQL warehouse")]
#[command(version)]
struct Cli {
    /// TOML configuration file (defaults to ./yt_etl.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search YouTube and write the raw channel and video files
    Extract,
    /// Clean the raw files into the clean files
    Transform,
    /// Append the clean files to the warehouse
    Load,
    /// Run extract, transform and load sequentially
    Run,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let stage = match cli.command {
        Commands::Extract => Stage::Extract,
        Commands::Transform => Stage::Transform,
        Commands::Load => Stage::Load,
        Commands::Run => Stage::Run,
    };

    main_for(stage, cli.config.as_deref()).await
}
