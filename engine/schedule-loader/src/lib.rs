//! NFL Schedule Loader
//!
//! Fetches the weekly NFL schedule from ESPN's public feed, turns each game into a
//! flat record with a deterministic id, and upserts the whole run into PostgreSQL
//! in one transaction.
//!
//! - **models**: `GameRecord` and its id derived from season, week and title
//! - **fetcher**: `EspnScheduleClient`, payload extraction and the range fetch
//! - **store**: `ScheduleStore` with Postgres and in-memory backends
//! - **pipeline**: `ScheduleLoader`, which runs fetch-all then upsert-all

pub mod config;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod store;

pub use config::LoaderConfig;
pub use error::{Result, ScheduleError};
pub use fetcher::{extract_records, fetch_range, EspnScheduleClient, ScheduleSource};
pub use models::{game_id, GameRecord, LoadSummary, StoredGame, UpsertOutcome};
pub use pipeline::{LoadReport, ScheduleLoader};
pub use store::{InMemoryScheduleStore, PostgresScheduleStore, ScheduleStore};
