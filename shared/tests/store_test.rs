//! Integration tests for the SQLite candle store

use shared::{get_pool, Candle, CandleStore, OpenMode, StoreError};
use tempfile::TempDir;

const DAY_MS: i64 = 86_400_000;

async fn open_store(dir: &TempDir) -> CandleStore {
    let path = dir.path().join("dataset").join("crypto_data.db");
    let pool = get_pool(&path, OpenMode::ReadWriteCreate).await.unwrap();
    let store = CandleStore::new(pool, "btc_data").unwrap();
    store.create_table().await.unwrap();
    store
}

fn daily_candles(start: i64, n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let p = 100.0 + i as f64;
            Candle::new(start + i as i64 * DAY_MS, p, p + 2.0, p - 2.0, p + 1.0, 10.0)
        })
        .collect()
}

#[tokio::test]
async fn test_open_creates_parent_directory() {
    let dir = TempDir::new().unwrap();
    let _store = open_store(&dir).await;
    assert!(dir.path().join("dataset").join("crypto_data.db").exists());
}

#[tokio::test]
async fn test_read_write_mode_requires_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.db");
    let result = get_pool(&path, OpenMode::ReadWrite).await;
    assert!(matches!(result, Err(StoreError::Sqlite(_))));
}

#[tokio::test]
async fn test_wal_journal_mode_enabled() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[tokio::test]
async fn test_rejects_unsafe_table_name() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let result = CandleStore::new(store.pool().clone(), "btc_data; DROP TABLE btc_data");
    assert!(matches!(result, Err(StoreError::InvalidTableName(_))));
}

#[tokio::test]
async fn test_table_exists() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    assert!(store.table_exists().await.unwrap());

    let other = CandleStore::new(store.pool().clone(), "eth_data").unwrap();
    assert!(!other.table_exists().await.unwrap());
}

#[tokio::test]
async fn test_upsert_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let candles = daily_candles(0, 5);

    assert_eq!(store.upsert_candles(&candles).await.unwrap(), 5);
    assert_eq!(store.upsert_candles(&candles).await.unwrap(), 0);
    assert_eq!(store.count().await.unwrap(), 5);

    // Different values at an existing timestamp must not overwrite
    let clash = Candle::new(2 * DAY_MS, 1.0, 1.0, 1.0, 1.0, 1.0);
    assert_eq!(store.upsert_candles(&[clash]).await.unwrap(), 0);

    let row = store.get(2 * DAY_MS).await.unwrap().unwrap();
    assert_eq!(row.close, Some(103.0));
    assert_eq!(row.open, Some(102.0));
}

#[tokio::test]
async fn test_upsert_duplicates_within_batch() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let mut candles = daily_candles(0, 3);
    candles.push(Candle::new(0, 9.0, 9.0, 9.0, 9.0, 9.0));

    assert_eq!(store.upsert_candles(&candles).await.unwrap(), 3);
    assert_eq!(store.get(0).await.unwrap().unwrap().close, Some(101.0));
}

#[tokio::test]
async fn test_upsert_spans_multiple_chunks() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let candles = daily_candles(0, 2500);

    assert_eq!(store.upsert_candles(&candles).await.unwrap(), 2500);
    assert_eq!(store.count().await.unwrap(), 2500);
}

#[tokio::test]
async fn test_load_recent_window_is_ascending_and_bounded() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    // Insert out of order to make sure ordering comes from the query
    let mut candles = daily_candles(0, 30);
    candles.reverse();
    store.upsert_candles(&candles).await.unwrap();

    let window = store.load_recent(10).await.unwrap();
    assert_eq!(window.len(), 10);
    assert!(window.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    assert_eq!(window.first().unwrap().timestamp, 20 * DAY_MS);
    assert_eq!(window.last().unwrap().timestamp, 29 * DAY_MS);

    let all = store.load_recent(1000).await.unwrap();
    assert_eq!(all.len(), 30);
}

#[tokio::test]
async fn test_load_recent_keeps_null_closes() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store.upsert_candles(&daily_candles(0, 3)).await.unwrap();
    sqlx::query("INSERT INTO btc_data (timestamp, open, high, low, close, volume) VALUES (?, 1, 1, 1, NULL, 1)")
        .bind(3 * DAY_MS)
        .execute(store.pool())
        .await
        .unwrap();

    let window = store.load_recent(10).await.unwrap();
    assert_eq!(window.len(), 4);
    assert_eq!(window[3].close, None);
}

#[tokio::test]
async fn test_load_recent_empty_table() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    assert!(store.load_recent(1000).await.unwrap().is_empty());
}
