use anyhow::Result;
use chrono::{TimeZone, Utc};
use std::path::Path;
use tempfile::tempdir;
use yt_etl::config::{Config, WarehouseConfig};
use yt_etl::error::EtlError;
use yt_etl::pipeline::{load_records, run_load, transform};
use yt_etl::storage::{write_rows, DataFiles};
use yt_etl::types::{ChannelRecord, RawChannelRow, VideoRecord};
use yt_etl::warehouse::Warehouse;

fn warehouse_at(path: &Path) -> WarehouseConfig {
    WarehouseConfig {
        url: Some(path.display().to_string()),
        ..Default::default()
    }
}

fn channel(id: &str) -> ChannelRecord {
    ChannelRecord {
        channel_id: id.to_string(),
        title: "Data With Dana".to_string(),
        description: "Weekly SQL tips".to_string(),
        published_at: Some(Utc.with_ymd_and_hms(2018, 7, 1, 12, 0, 0).unwrap()),
        country: "United States".to_string(),
        subscriber_count: 5400,
        view_count: 120_000,
        video_count: 1,
        appearances_in_searches: 2,
        uploads_playlist_id: format!("UU{id}"),
    }
}

fn video(id: &str, channel_id: &str) -> VideoRecord {
    VideoRecord {
        video_id: id.to_string(),
        channel_id: channel_id.to_string(),
        title: "CTEs in five minutes".to_string(),
        description: String::new(),
        published_at: None,
        view_count: 900,
        like_count: 45,
        comment_count: 3,
    }
}

async fn distinct_batches(path: &Path, table: &str) -> Result<i64> {
    let db = libsql::Builder::new_local(path).build().await?;
    let conn = db.connect()?;
    let mut rows = conn
        .query(&format!("SELECT COUNT(DISTINCT batch_id) FROM {table}"), ())
        .await?;
    let row = rows.next().await?.expect("count row");
    Ok(row.get::<i64>(0)?)
}

#[tokio::test]
async fn each_load_appends_exactly_its_rows() -> Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("warehouse.db");
    let config = warehouse_at(&db_path);
    let channels = vec![channel("UC1"), channel("UC2")];
    let videos = vec![video("v1", "UC1")];

    let first = load_records(&config, &channels, &videos).await?;
    assert_eq!((first.channel_rows, first.video_rows), (2, 1));

    let second = load_records(&config, &channels, &videos).await?;
    assert_ne!(first.batch_id, second.batch_id);

    let warehouse = Warehouse::connect(&config).await?;
    assert_eq!(warehouse.row_count("channels").await?, 4);
    assert_eq!(warehouse.row_count("videos").await?, 2);
    drop(warehouse);

    assert_eq!(distinct_batches(&db_path, "channels").await?, 2);
    Ok(())
}

#[tokio::test]
async fn empty_collections_still_create_tables() -> Result<()> {
    let dir = tempdir()?;
    let config = warehouse_at(&dir.path().join("warehouse.db"));

    let summary = load_records(&config, &[], &[]).await?;
    assert_eq!((summary.channel_rows, summary.video_rows), (0, 0));

    let warehouse = Warehouse::connect(&config).await?;
    let columns = warehouse.columns("videos").await?;
    assert!(columns.iter().any(|c| c == "comment_count"));
    assert!(columns.iter().any(|c| c == "batch_id"));
    assert_eq!(warehouse.row_count("videos").await?, 0);
    Ok(())
}

#[tokio::test]
async fn incompatible_existing_table_is_a_schema_mismatch() -> Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("warehouse.db");
    {
        let db = libsql::Builder::new_local(&db_path).build().await?;
        let conn = db.connect()?;
        conn.execute("CREATE TABLE channels (channel_id TEXT, title TEXT)", ())
            .await?;
    }

    let err = load_records(&warehouse_at(&db_path), &[channel("UC1")], &[])
        .await
        .unwrap_err();

    match err {
        EtlError::SchemaMismatch { table, missing } => {
            assert_eq!(table, "channels");
            assert!(missing.contains(&"country".to_string()));
            assert!(missing.contains(&"loaded_at".to_string()));
            assert!(!missing.contains(&"title".to_string()));
        }
        other => panic!("expected schema mismatch, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn schema_prefix_names_the_tables() -> Result<()> {
    let dir = tempdir()?;
    let config = WarehouseConfig {
        schema: Some("youtube".to_string()),
        ..warehouse_at(&dir.path().join("warehouse.db"))
    };

    let summary = load_records(&config, &[channel("UC1")], &[video("v1", "UC1")]).await?;
    assert_eq!(summary.channel_table, "youtube_channels");
    assert_eq!(summary.video_table, "youtube_videos");

    let warehouse = Warehouse::connect(&config).await?;
    assert_eq!(warehouse.row_count("youtube_channels").await?, 1);
    Ok(())
}

#[tokio::test]
async fn missing_warehouse_url_is_a_config_error() {
    let err = load_records(&WarehouseConfig::default(), &[], &[])
        .await
        .unwrap_err();
    assert!(matches!(err, EtlError::Config(_)));
}

#[tokio::test]
async fn run_load_reads_the_clean_files() -> Result<()> {
    let dir = tempdir()?;
    let mut config = Config::default();
    config.pipeline.data_dir = dir.path().join("data");
    config.warehouse = warehouse_at(&dir.path().join("warehouse.db"));

    let clean = DataFiles::clean(&config.pipeline.data_dir);
    write_rows(&clean.channels, &[channel("UC1"), channel("UC2")])?;
    write_rows(&clean.videos, &[video("v1", "UC1"), video("v2", "UC2"), video("v3", "UC2")])?;

    let summary = run_load(&config).await?;
    assert_eq!((summary.channel_rows, summary.video_rows), (2, 3));

    let warehouse = Warehouse::connect(&config.warehouse).await?;
    assert_eq!(warehouse.row_count("videos").await?, 3);
    Ok(())
}

#[tokio::test]
async fn counts_beyond_the_signed_range_load_clamped() -> Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("warehouse.db");
    let raw = RawChannelRow {
        channel_id: Some("UCbig".to_string()),
        view_count: Some("9300000000000000000".to_string()),
        subscriber_count: Some("1e30".to_string()),
        ..Default::default()
    };
    let cleaned = transform(&[raw], &[])?;
    assert_eq!(cleaned.report.coerced_counts, 4);

    let summary = load_records(&warehouse_at(&db_path), &cleaned.channels, &[]).await?;
    assert_eq!(summary.channel_rows, 1);

    let db = libsql::Builder::new_local(&db_path).build().await?;
    let conn = db.connect()?;
    let mut rows = conn
        .query("SELECT view_count, subscriber_count FROM channels", ())
        .await?;
    let row = rows.next().await?.expect("channel row");
    assert_eq!(row.get::<i64>(0)?, i64::MAX);
    assert_eq!(row.get::<i64>(1)?, i64::MAX);
    Ok(())
}
