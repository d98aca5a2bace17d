use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{Candle, CandleRow};

pub type DbPool = SqlitePool;

// 6 bound columns per row, well under SQLite's 32766 parameter limit
const INSERT_CHUNK: usize = 1000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),
}

/// How the store file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read/write; the file must already exist.
    ReadWrite,
    /// Read/write; the file is created if missing.
    ReadWriteCreate,
}

/// Open the SQLite store in WAL mode, creating its parent directory first.
pub async fn get_pool(path: &Path, mode: OpenMode) -> Result<DbPool, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    info!("Opening SQLite store at: {}", path.display());
    let options = SqliteConnectOptions::new()
        .filename(path)
        .read_only(false)
        .create_if_missing(mode == OpenMode::ReadWriteCreate)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Table names are spliced into SQL, so only `[A-Za-z0-9_]+` is accepted.
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Fails if the store file cannot be opened for reading.
pub fn check_readable(path: &Path) -> std::io::Result<()> {
    std::fs::File::open(path).map(|_| ())
}

/// Candle table keyed by timestamp.
#[derive(Debug, Clone)]
pub struct CandleStore {
    pool: DbPool,
    table: String,
}

impl CandleStore {
    pub fn new(pool: DbPool, table: impl Into<String>) -> Result<Self, StoreError> {
        let table = table.into();
        if !is_valid_identifier(&table) {
            return Err(StoreError::InvalidTableName(table));
        }
        Ok(Self { pool, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn create_table(&self) -> Result<(), StoreError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                timestamp INTEGER PRIMARY KEY,
                open REAL,
                high REAL,
                low REAL,
                close REAL,
                volume REAL
            )",
            self.table
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn table_exists(&self) -> Result<bool, StoreError> {
        let found: Option<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(&self.table)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    /// Insert-if-absent on the timestamp key. Existing rows are never touched.
    /// Returns the number of rows actually inserted.
    pub async fn upsert_candles(&self, candles: &[Candle]) -> Result<u64, StoreError> {
        if candles.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for chunk in candles.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "INSERT OR IGNORE INTO {} (timestamp, open, high, low, close, volume) ",
                self.table
            ));
            builder.push_values(chunk, |mut b, c| {
                b.push_bind(c.timestamp)
                    .push_bind(c.open)
                    .push_bind(c.high)
                    .push_bind(c.low)
                    .push_bind(c.close)
                    .push_bind(c.volume);
            });
            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;

        debug!("Inserted {} of {} candles into {}", inserted, candles.len(), self.table);
        Ok(inserted)
    }

    /// The `limit` most recent rows, oldest first.
    pub async fn load_recent(&self, limit: u32) -> Result<Vec<CandleRow>, StoreError> {
        let sql = format!(
            "SELECT timestamp, open, high, low, close, volume FROM (
                SELECT * FROM {}
                ORDER BY timestamp DESC
                LIMIT ?
            ) ORDER BY timestamp ASC",
            self.table
        );
        let rows = sqlx::query_as::<_, CandleRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let n: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(n)
    }

    pub async fn get(&self, timestamp: i64) -> Result<Option<CandleRow>, StoreError> {
        let sql = format!(
            "SELECT timestamp, open, high, low, close, volume FROM {} WHERE timestamp = ?",
            self.table
        );
        let row = sqlx::query_as::<_, CandleRow>(&sql)
            .bind(timestamp)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
