mod common;

use anyhow::Result;
use common::{FakeFailure, FakeYoutube};
use tempfile::tempdir;
use yt_etl::config::{Config, SearchConfig};
use yt_etl::error::EtlError;
use yt_etl::pipeline::{run_extract, Extractor};
use yt_etl::storage::{read_rows, DataFiles};
use yt_etl::types::RawChannelRow;

fn search(phrases: &[&str]) -> SearchConfig {
    SearchConfig {
        phrases: phrases.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

#[tokio::test]
async fn duplicate_channels_across_phrases_are_merged() -> Result<()> {
    let api = FakeYoutube::new()
        .search_hits("sql tutorial", &["UCa", "UCb"])
        .search_hits("data analysis", &["UCc", "UCa"])
        .channel("UCa", Some("US"), &["a1", "a2"])
        .channel("UCb", Some("GB"), &["b1"])
        .channel("UCc", None, &["c1"]);
    let config = search(&["sql tutorial", "data analysis"]);

    let extraction = Extractor::new(&api, &config).run().await?;

    let channels: Vec<(&str, u64)> = extraction
        .channels
        .iter()
        .map(|c| (c.channel_id.as_str(), c.appearances_in_searches))
        .collect();
    assert_eq!(channels, vec![("UCa", 2), ("UCb", 1), ("UCc", 1)]);
    assert_eq!(api.batch_sizes("channels"), vec![3]);

    let videos: Vec<&str> = extraction.videos.iter().map(|v| v.video_id.as_str()).collect();
    assert_eq!(videos, vec!["a1", "a2", "b1", "c1"]);
    for video in &extraction.videos {
        assert!(extraction.channels.iter().any(|c| c.channel_id == video.channel_id));
    }
    Ok(())
}

#[tokio::test]
async fn channel_with_no_uploads_yields_no_videos() -> Result<()> {
    let api = FakeYoutube::new()
        .search_hits("excel", &["UCempty"])
        .channel("UCempty", Some("CA"), &[]);
    let config = search(&["excel"]);

    let extraction = Extractor::new(&api, &config).run().await?;

    assert_eq!(extraction.channels.len(), 1);
    assert_eq!(extraction.channels[0].video_count, 0);
    assert!(extraction.videos.is_empty());
    assert!(api.batch_sizes("playlistItems").is_empty());
    assert!(api.batch_sizes("videos").is_empty());
    Ok(())
}

#[tokio::test]
async fn batches_never_exceed_fifty_ids() -> Result<()> {
    let ids: Vec<String> = (0..120).map(|i| format!("UC{i:03}")).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let uploads: Vec<String> = (0..120).map(|i| format!("v{i:03}")).collect();
    let upload_refs: Vec<&str> = uploads.iter().map(String::as_str).collect();

    let mut api = FakeYoutube::new().search_hits("tableau", &id_refs);
    for (i, id) in id_refs.iter().enumerate() {
        let videos: &[&str] = if i == 0 { &upload_refs } else { &[] };
        api = api.channel(id, None, videos);
    }
    let config = search(&["tableau"]);

    let extraction = Extractor::new(&api, &config).run().await?;

    assert_eq!(extraction.channels.len(), 120);
    assert_eq!(api.batch_sizes("search"), vec![1, 1, 1]);
    assert_eq!(api.batch_sizes("channels"), vec![50, 50, 20]);
    assert_eq!(api.batch_sizes("videos"), vec![50, 50, 20]);

    // Responses come back shuffled; output keeps playlist order
    let first: Vec<&str> = extraction.videos.iter().take(3).map(|v| v.video_id.as_str()).collect();
    assert_eq!(first, vec!["v000", "v001", "v002"]);
    Ok(())
}

#[tokio::test]
async fn paging_stops_once_enough_channels_were_seen() -> Result<()> {
    let ids: Vec<String> = (0..150).map(|i| format!("UC{i:03}")).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let api = FakeYoutube::new().search_hits("power bi", &id_refs);
    let config = SearchConfig {
        max_results_per_phrase: 60,
        max_channels: 10,
        ..search(&["power bi"])
    };

    let candidates = Extractor::new(&api, &config).gather_candidates().await?;

    assert_eq!(api.batch_sizes("search").len(), 2);
    assert_eq!(candidates.len(), 10);
    assert_eq!(candidates[0].channel_id, "UC000");
    Ok(())
}

#[tokio::test]
async fn uploads_are_capped_per_channel() -> Result<()> {
    let api = FakeYoutube::new()
        .search_hits("r programming", &["UCr"])
        .channel("UCr", None, &["r1", "r2", "r3", "r4"]);
    let config = SearchConfig {
        max_videos_per_channel: Some(2),
        ..search(&["r programming"])
    };

    let extraction = Extractor::new(&api, &config).run().await?;

    let videos: Vec<&str> = extraction.videos.iter().map(|v| v.video_id.as_str()).collect();
    assert_eq!(videos, vec!["r1", "r2"]);
    Ok(())
}

#[tokio::test]
async fn missing_phrases_fail_before_any_request() {
    let api = FakeYoutube::new();
    let config = search(&["  "]);

    let err = Extractor::new(&api, &config).run().await.unwrap_err();

    assert!(matches!(err, EtlError::Config(_)));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn run_extract_writes_raw_files() -> Result<()> {
    let dir = tempdir()?;
    let api = FakeYoutube::new()
        .search_hits("statistics", &["UCs"])
        .channel("UCs", Some("US"), &["s1"]);
    let mut config = Config::default();
    config.search = search(&["statistics"]);
    config.pipeline.data_dir = dir.path().to_path_buf();

    let summary = run_extract(&config, &api).await?;
    assert_eq!((summary.channels, summary.videos), (1, 1));

    let files = DataFiles::raw(dir.path());
    let rows: Vec<RawChannelRow> = read_rows(&files.channels)?;
    assert_eq!(rows[0].channel_id.as_deref(), Some("UCs"));
    // Raw files keep the API's values untouched
    assert_eq!(rows[0].country.as_deref(), Some("US"));
    assert_eq!(rows[0].title.as_deref(), Some("Channel UCs 📊"));
    assert!(files.videos.exists());
    Ok(())
}

#[tokio::test]
async fn video_search_adds_owning_channel_hits() -> Result<()> {
    let api = FakeYoutube::new()
        .search_hits("pandas", &["UCp"])
        .channel("UCp", Some("IN"), &[]);
    let config = SearchConfig {
        search_videos: true,
        ..search(&["pandas"])
    };

    let candidates = Extractor::new(&api, &config).gather_candidates().await?;

    // One channel search and one video search, each naming the channel once
    assert_eq!(api.batch_sizes("search").len(), 2);
    assert_eq!(candidates[0].appearances, 2);
    Ok(())
}

#[tokio::test]
async fn never_uploaded_channel_is_kept_without_listing_its_playlist() -> Result<()> {
    // The live API answers 404 playlistNotFound for such a channel's uploads
    let api = FakeYoutube::new()
        .search_hits("dbt", &["UCnew"])
        .channel("UCnew", None, &[])
        .failing("playlistItems", FakeFailure::NotFound);
    let config = search(&["dbt"]);

    let extraction = Extractor::new(&api, &config).run().await?;

    assert_eq!(extraction.channels.len(), 1);
    assert_eq!(extraction.channels[0].channel_id, "UCnew");
    assert_eq!(extraction.channels[0].video_count, 0);
    assert!(extraction.videos.is_empty());
    assert!(api.batch_sizes("playlistItems").is_empty());
    Ok(())
}

#[tokio::test]
async fn uploads_playlist_not_found_counts_as_empty() -> Result<()> {
    let api = FakeYoutube::new()
        .search_hits("airflow", &["UCgone", "UCalso"])
        .channel("UCgone", Some("FR"), &["g1"])
        .channel("UCalso", None, &["h1", "h2"])
        .failing("playlistItems", FakeFailure::NotFound);
    let config = search(&["airflow"]);

    let extraction = Extractor::new(&api, &config).run().await?;

    assert_eq!(extraction.channels.len(), 2);
    assert!(extraction.videos.is_empty());
    assert_eq!(api.batch_sizes("playlistItems").len(), 2);
    Ok(())
}

#[tokio::test]
async fn quota_exhaustion_stops_extraction_and_names_the_phrase() {
    let api = FakeYoutube::new()
        .search_hits("sql tutorial", &["UCa"])
        .channel("UCa", None, &["a1"])
        .failing("search", FakeFailure::Quota);
    let config = search(&["sql tutorial", "data analysis"]);

    let err = Extractor::new(&api, &config).run().await.unwrap_err();

    assert!(matches!(err, EtlError::QuotaExceeded { .. }));
    assert!(err.to_string().contains("'sql tutorial'"));
    assert_eq!(api.calls(), vec![("search", 1)]);
}

#[tokio::test]
async fn failed_channel_batch_names_the_ids() {
    let api = FakeYoutube::new()
        .search_hits("looker", &["UCa", "UCb"])
        .failing("channels", FakeFailure::Fatal);
    let config = search(&["looker"]);

    let err = Extractor::new(&api, &config).run().await.unwrap_err();

    assert!(matches!(err, EtlError::Api { ref endpoint, .. } if endpoint == "channels"));
    assert!(err.to_string().contains("UCa, UCb"));
}

#[tokio::test]
async fn failed_video_batch_aborts_without_writing_raw_files() -> Result<()> {
    let dir = tempdir()?;
    let api = FakeYoutube::new()
        .search_hits("spark", &["UCs"])
        .channel("UCs", Some("US"), &["s1", "s2"])
        .failing("videos", FakeFailure::Fatal);
    let mut config = Config::default();
    config.search = search(&["spark"]);
    config.pipeline.data_dir = dir.path().to_path_buf();

    let err = run_extract(&config, &api).await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("UCs"), "{message}");
    assert!(message.contains("s1, s2"), "{message}");
    let files = DataFiles::raw(dir.path());
    assert!(!files.channels.exists());
    assert!(!files.videos.exists());
    Ok(())
}
