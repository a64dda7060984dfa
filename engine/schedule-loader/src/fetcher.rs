use crate::config::SourceConfig;
use crate::error::{Result, ScheduleError};
use crate::models::GameRecord;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Anything that can hand back the raw schedule document for one season/week
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Fetch the raw JSON schedule for a single week
    async fn fetch_week(&self, year: i32, week: u32) -> Result<Value>;
}

/// Client for ESPN's public NFL schedule feed
pub struct EspnScheduleClient {
    client: Client,
    base_url: String,
}

impl EspnScheduleClient {
    /// Create a new client instance
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Self { client, base_url: config.base_url.clone() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ScheduleSource for EspnScheduleClient {
    async fn fetch_week(&self, year: i32, week: u32) -> Result<Value> {
        debug!(url = %self.base_url, year, week, "Fetching schedule");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("xhr", "1".to_string()), ("year", year.to_string()), ("week", week.to_string())])
            .send()
            .await
            .map_err(|e| ScheduleError::fetch(year, week, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScheduleError::fetch(year, week, format!("HTTP {status}")));
        }

        let body = response.text().await.map_err(|e| ScheduleError::fetch(year, week, e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| ScheduleError::malformed(year, week, e.to_string()))
    }
}

/// Pull game records out of `content.schedule.<date>.games[*]`.
///
/// Every level is optional; anything missing or of the wrong type falls back to an
/// empty container, empty string or zero.
pub fn extract_records(payload: &Value) -> Vec<GameRecord> {
    let Some(schedule) = payload.pointer("/content/schedule").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut records = Vec::new();
    for day in schedule.values() {
        let Some(games) = day.get("games").and_then(Value::as_array) else {
            continue;
        };
        records.extend(games.iter().map(game_from_entry));
    }
    records
}

fn game_from_entry(game: &Value) -> GameRecord {
    let venue = game
        .get("competitions")
        .and_then(Value::as_array)
        .and_then(|competitions| competitions.first())
        .and_then(|competition| competition.pointer("/venue/fullName"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    GameRecord::new(
        int_at(game, "/season/year"),
        int_at(game, "/week/number"),
        str_at(game, "/name"),
        str_at(game, "/date"),
        venue,
    )
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> &'a str {
    value.pointer(pointer).and_then(Value::as_str).unwrap_or_default()
}

fn int_at(value: &Value, pointer: &str) -> i32 {
    match value.pointer(pointer) {
        Some(Value::Number(n)) => n.as_i64().and_then(|n| i32::try_from(n).ok()).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Records gathered by a range fetch, plus the weeks that could not be fetched
#[derive(Debug, Default)]
pub struct RangeFetch {
    pub records: Vec<GameRecord>,
    pub failed: Vec<(i32, u32)>,
}

/// Fetch every (year, week) pair in order, one request at a time.
///
/// A failing pair is logged and skipped; the rest of the range still runs.
pub async fn fetch_range<S>(source: &S, years: &[i32], weeks: &[u32]) -> RangeFetch
where
    S: ScheduleSource + ?Sized,
{
    let mut result = RangeFetch::default();

    for &year in years {
        info!(year, "Fetching schedules for season");

        for &week in weeks {
            match source.fetch_week(year, week).await {
                Ok(payload) => {
                    let games = extract_records(&payload);
                    info!(year, week, games = games.len(), "✓ Fetched week");
                    result.records.extend(games);
                }
                Err(e) => {
                    warn!(year, week, error = %e, "✗ Failed to fetch week, skipping");
                    result.failed.push((year, week));
                }
            }
        }
    }

    result
}
