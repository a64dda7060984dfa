use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ScheduleError};

/// One scheduled NFL game as reported by the upstream schedule feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Kickoff time exactly as the feed reported it
    pub date: String,
    /// Regular season week, 0 when the feed omitted it
    pub week_no: i32,
    /// Matchup, e.g. "Baltimore Ravens at Kansas City Chiefs"
    pub title: String,
    /// Stadium name, empty when the feed had no venue
    pub venue: String,
    pub season: i32,
}

impl GameRecord {
    pub fn new(
        season: i32,
        week_no: i32,
        title: impl Into<String>,
        date: impl Into<String>,
        venue: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            week_no,
            title: title.into(),
            venue: venue.into(),
            season,
        }
    }

    /// Deterministic id for this game.
    ///
    /// Only season, week and title feed the id, so a game whose kickoff or venue moves
    /// keeps the same row. The name-based UUID matches ids already present in the table.
    pub fn game_id(&self) -> Uuid {
        game_id(self.season, self.week_no, &self.title)
    }

    /// Kickoff as a naive UTC timestamp, the form stored in the `date` column
    pub fn kickoff(&self) -> Result<NaiveDateTime> {
        parse_kickoff(&self.date).ok_or_else(|| ScheduleError::InvalidTimestamp {
            value: self.date.clone(),
            title: self.title.clone(),
        })
    }
}

/// Name-based (v5) UUID over `"{season}-{week_no}-{title}"` in the DNS namespace
pub fn game_id(season: i32, week_no: i32, title: &str) -> Uuid {
    let name = format!("{season}-{week_no}-{title}");
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes())
}

/// ESPN reports kickoffs as `2024-09-06T00:20Z`; full RFC 3339 is accepted as well.
pub fn parse_kickoff(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    ["%Y-%m-%dT%H:%MZ", "%Y-%m-%dT%H:%M:%SZ"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Row of the `nfl_schedules` table
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct StoredGame {
    pub id: Uuid,
    pub season: i32,
    pub week_no: i32,
    pub date: NaiveDateTime,
    pub title: String,
    pub venue: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Insert/update split reported by a bulk upsert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub inserted: u64,
    pub updated: u64,
}

/// Numbers reported at the end of a load run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub fetched: usize,
    pub failed_weeks: Vec<(i32, u32)>,
    pub inserted: u64,
    pub updated: u64,
    pub total_in_store: i64,
}
