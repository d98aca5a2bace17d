pub mod config;
pub mod database;
pub mod models;

pub use config::Config;
pub use database::{check_readable, get_pool, CandleStore, DbPool, OpenMode, StoreError};
pub use models::*;
