use yt_etl::cli::{main_for, Stage};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    main_for(Stage::Load, None).await
}
