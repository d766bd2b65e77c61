use crate::config::WarehouseConfig;
use crate::error::{EtlError, Result};
use crate::types::{format_timestamp, ChannelRecord, VideoRecord};
use chrono::{DateTime, Utc};
use libsql::params::Params;
use libsql::{Builder, Connection, Database, Value};
use tracing::{debug, info};
use uuid::Uuid;

/// Column name and SQL type.
pub type Column = (&'static str, &'static str);

/// Audit columns stamped on every appended row.
pub const BATCH_COLUMNS: &[Column] = &[("batch_id", "TEXT NOT NULL"), ("loaded_at", "TEXT NOT NULL")];

/// A record type the warehouse can append.
pub trait WarehouseRow {
    /// Record columns in insert order, excluding [`BATCH_COLUMNS`].
    const COLUMNS: &'static [Column];

    fn values(&self) -> Result<Vec<Value>>;
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn integer(n: u64) -> Result<Value> {
    i64::try_from(n)
        .map(Value::Integer)
        .map_err(|_| EtlError::warehouse(format!("count {n} does not fit a 64-bit signed integer")))
}

fn timestamp(ts: &Option<DateTime<Utc>>) -> Value {
    match ts {
        Some(ts) => Value::Text(format_timestamp(ts)),
        None => Value::Null,
    }
}

impl WarehouseRow for ChannelRecord {
    const COLUMNS: &'static [Column] = &[
        ("channel_id", "TEXT NOT NULL"),
        ("title", "TEXT"),
        ("description", "TEXT"),
        ("published_at", "TEXT"),
        ("country", "TEXT"),
        ("subscriber_count", "INTEGER NOT NULL"),
        ("view_count", "INTEGER NOT NULL"),
        ("video_count", "INTEGER NOT NULL"),
        ("appearances_in_searches", "INTEGER NOT NULL"),
        ("uploads_playlist_id", "TEXT"),
    ];

    fn values(&self) -> Result<Vec<Value>> {
        Ok(vec![
            text(&self.channel_id),
            text(&self.title),
            text(&self.description),
            timestamp(&self.published_at),
            text(&self.country),
            integer(self.subscriber_count)?,
            integer(self.view_count)?,
            integer(self.video_count)?,
            integer(self.appearances_in_searches)?,
            text(&self.uploads_playlist_id),
        ])
    }
}

impl WarehouseRow for VideoRecord {
    const COLUMNS: &'static [Column] = &[
        ("video_id", "TEXT NOT NULL"),
        ("channel_id", "TEXT NOT NULL"),
        ("title", "TEXT"),
        ("description", "TEXT"),
        ("published_at", "TEXT"),
        ("view_count", "INTEGER NOT NULL"),
        ("like_count", "INTEGER NOT NULL"),
        ("comment_count", "INTEGER NOT NULL"),
    ];

    fn values(&self) -> Result<Vec<Value>> {
        Ok(vec![
            text(&self.video_id),
            text(&self.channel_id),
            text(&self.title),
            text(&self.description),
            timestamp(&self.published_at),
            integer(self.view_count)?,
            integer(self.like_count)?,
            integer(self.comment_count)?,
        ])
    }
}

/// Identity of one load run, written into every row it appends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBatch {
    pub id: Uuid,
    pub loaded_at: DateTime<Utc>,
}

impl LoadBatch {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            loaded_at: Utc::now(),
        }
    }
}

impl Default for LoadBatch {
    fn default() -> Self {
        Self::new()
    }
}

/// One open warehouse connection. Dropping it releases the connection.
pub struct Warehouse {
    _db: Database,
    conn: Connection,
}

impl Warehouse {
    /// Connect to a remote libSQL/Turso URL, or open a local database file.
    pub async fn connect(config: &WarehouseConfig) -> Result<Self> {
        let url = config.url()?;
        let remote = url.starts_with("libsql://")
            || url.starts_with("https://")
            || url.starts_with("http://");

        let db = if remote {
            let token = config.auth_token.clone().unwrap_or_default();
            info!("Connecting to remote warehouse at {}", url);
            Builder::new_remote(url.to_string(), token).build().await
        } else {
            info!("Opening local warehouse at {}", url);
            Builder::new_local(url).build().await
        }
        .map_err(|e| EtlError::warehouse(format!("Failed to connect to {url}: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| EtlError::warehouse(format!("Failed to get connection: {e}")))?;

        if let Some(database) = &config.database {
            debug!("Target database: {}", database);
        }
        Ok(Self { _db: db, conn })
    }

    /// Create `table` for `R` if missing, then check that every expected column exists.
    pub async fn ensure_table<R: WarehouseRow>(&self, table: &str) -> Result<()> {
        let columns: Vec<String> = R::COLUMNS
            .iter()
            .chain(BATCH_COLUMNS)
            .map(|(name, ty)| format!("{name} {ty}"))
            .collect();
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {table} ({})",
            columns.join(", ")
        );
        self.conn
            .execute(&ddl, ())
            .await
            .map_err(|e| EtlError::warehouse(format!("Failed to create table {table}: {e}")))?;

        let existing = self.columns(table).await?;
        let missing: Vec<String> = R::COLUMNS
            .iter()
            .chain(BATCH_COLUMNS)
            .map(|(name, _)| *name)
            .filter(|name| !existing.iter().any(|c| c.eq_ignore_ascii_case(name)))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(EtlError::SchemaMismatch {
                table: table.to_string(),
                missing,
            });
        }
        debug!("Table {} ready with {} columns", table, existing.len());
        Ok(())
    }

    /// Column names of `table`, empty if it does not exist.
    pub async fn columns(&self, table: &str) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(&format!("PRAGMA table_info({table})"), ())
            .await
            .map_err(|e| EtlError::warehouse(format!("Failed to inspect {table}: {e}")))?;

        let mut names = Vec::new();
        while let Some(row) = rows.next().await? {
            let name: String = row.get(1)?;
            names.push(name);
        }
        Ok(names)
    }

    /// Append `rows` to `table` in one transaction. Nothing is updated or deleted.
    pub async fn append<R: WarehouseRow>(
        &self,
        table: &str,
        rows: &[R],
        batch: &LoadBatch,
    ) -> Result<usize> {
        let names: Vec<&str> = R::COLUMNS
            .iter()
            .chain(BATCH_COLUMNS)
            .map(|(name, _)| *name)
            .collect();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            names.join(", "),
            placeholders.join(", ")
        );
        let batch_id = batch.id.to_string();
        let loaded_at = format_timestamp(&batch.loaded_at);

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| EtlError::warehouse(format!("Failed to begin transaction on {table}: {e}")))?;

        for (i, row) in rows.iter().enumerate() {
            let mut values = row.values()?;
            values.push(Value::Text(batch_id.clone()));
            values.push(Value::Text(loaded_at.clone()));
            if let Err(e) = tx.execute(&sql, Params::Positional(values)).await {
                let _ = tx.rollback().await;
                return Err(EtlError::warehouse(format!(
                    "Failed to append row #{} to {table}: {e}",
                    i + 1
                )));
            }
        }

        tx.commit()
            .await
            .map_err(|e| EtlError::warehouse(format!("Failed to commit {table}: {e}")))?;
        Ok(rows.len())
    }

    pub async fn row_count(&self, table: &str) -> Result<u64> {
        let mut rows = self
            .conn
            .query(&format!("SELECT COUNT(*) FROM {table}"), ())
            .await
            .map_err(|e| EtlError::warehouse(format!("Failed to count {table}: {e}")))?;
        match rows.next().await? {
            Some(row) => {
                let n: i64 = row.get(0)?;
                Ok(n.max(0) as u64)
            }
            None => Ok(0),
        }
    }
}
