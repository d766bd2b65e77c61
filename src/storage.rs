//! Flat-file handoff between stages.
//!
//! Each stage reads and writes a pair of CSV files (channels, videos) with a header
//! row. Column names come from the serde field names of the record types, so the
//! schema is stable across stages.

use crate::constants::{CHANNELS_FILE, CLEAN_DIR, RAW_DIR, VIDEOS_FILE};
use crate::error::{EtlError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Locations of one channel/video file pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFiles {
    pub channels: PathBuf,
    pub videos: PathBuf,
}

impl DataFiles {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            channels: dir.join(CHANNELS_FILE),
            videos: dir.join(VIDEOS_FILE),
        }
    }

    /// Extractor output / transformer input.
    pub fn raw(data_dir: impl AsRef<Path>) -> Self {
        Self::in_dir(data_dir.as_ref().join(RAW_DIR))
    }

    /// Transformer output / loader input.
    pub fn clean(data_dir: impl AsRef<Path>) -> Self {
        Self::in_dir(data_dir.as_ref().join(CLEAN_DIR))
    }
}

/// `" Channel ID "` -> `"channel_id"`, so hand-edited headers still match field names.
fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Read every row of a CSV file into `T`, naming the file and row on failure.
///
/// Header cells are trimmed, lowercased and have inner whitespace replaced by `_`
/// before matching.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| {
        EtlError::Io(std::io::Error::new(
            e.kind(),
            format!("open {}: {}", path.display(), e),
        ))
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(file);
    let headers: csv::StringRecord = reader.headers()?.iter().map(normalize_header).collect();
    reader.set_headers(headers);

    let mut rows = Vec::new();
    for (i, row) in reader.deserialize::<T>().enumerate() {
        let row = row.map_err(|e| {
            EtlError::transform(format!(
                "{}: unreadable row #{}: {}",
                path.display(),
                i + 1,
                e
            ))
        })?;
        rows.push(row);
    }
    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Write rows to a CSV file, creating parent directories. Returns the row count.
///
/// The header comes from the first serialized row, so an empty slice leaves an empty
/// file, which reads back as zero rows.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(rows.len())
}
