//! REST endpoints for the schedule service
//!
//! The echo route hands its path segments straight back. The week route reads the
//! stored schedule for one season/week.

use schedule_loader::{ScheduleStore, StoredGame};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::Filter;

pub const MIN_SEASON: i32 = 2020;
pub const MAX_SEASON: i32 = 2030;
pub const MAX_WEEK: i32 = 17;

/// Echo response for `/schedule/season/{season_number}/week/{week_number}`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct EchoResponse {
    pub season_number: Option<String>,
    pub week_number: Option<String>,
}

/// One game in a week response
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct GameResponse {
    pub title: String,
    pub venue: String,
    pub season: i32,
    pub week_no: i32,
    /// Kickoff date, YYYY-MM-DD
    pub date: String,
}

impl From<StoredGame> for GameResponse {
    fn from(game: StoredGame) -> Self {
        Self {
            title: game.title,
            venue: game.venue,
            season: game.season,
            week_no: game.week_no,
            date: game.date.date().format("%Y-%m-%d").to_string(),
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&ErrorResponse { error: message.into() }), status)
}

/// Echo back the season and week path segments
pub fn echo_schedule(season_number: String, week_number: String) -> EchoResponse {
    info!(season_number = %season_number, week_number = %week_number, "Processing schedule request");
    EchoResponse { season_number: Some(season_number), week_number: Some(week_number) }
}

/// Stored games for one week, after range-checking the season and week
pub async fn get_week_schedule(
    season: i32,
    week: i32,
    store: Arc<dyn ScheduleStore>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, warp::Rejection> {
    info!(season, week, "Processing request for season schedule");

    if !(MIN_SEASON..=MAX_SEASON).contains(&season) {
        warn!(season, "Invalid season number");
        return Ok(error_reply(
            StatusCode::BAD_REQUEST,
            format!("Invalid season_number. Must be between {MIN_SEASON} and {MAX_SEASON}."),
        ));
    }
    if !(1..=MAX_WEEK).contains(&week) {
        warn!(week, "Invalid week number");
        return Ok(error_reply(
            StatusCode::BAD_REQUEST,
            format!("Invalid week_number. Must be between 1 and {MAX_WEEK} inclusive."),
        ));
    }

    match store.games_for_week(season, week).await {
        Ok(games) => {
            let body: Vec<GameResponse> = games.into_iter().map(GameResponse::from).collect();
            info!(season, week, games = body.len(), "Returning games");
            Ok(warp::reply::with_status(warp::reply::json(&body), StatusCode::OK))
        }
        Err(e) => {
            error!(season, week, error = %e, "Failed to load games");
            Ok(error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load schedule"))
        }
    }
}

/// Create all routes
pub fn create_routes(
    store: Arc<dyn ScheduleStore>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let store_filter = warp::any().map(move || store.clone());

    // Echo endpoint
    let echo = warp::path!("schedule" / "season" / String / "week" / String)
        .and(warp::get())
        .map(|season_number: String, week_number: String| {
            warp::reply::json(&echo_schedule(season_number, week_number))
        });

    // Stored week endpoint
    let week_schedule = warp::path!("api" / "schedule" / i32 / i32)
        .and(warp::get())
        .and(store_filter)
        .and_then(get_week_schedule);

    // Health check endpoint
    let health = warp::path("health").and(warp::path::end()).and(warp::get()).map(|| {
        warp::reply::json(&serde_json::json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    });

    echo.or(week_schedule).or(health).with(
        warp::cors().allow_any_origin().allow_headers(vec!["content-type"]).allow_methods(vec!["GET", "OPTIONS"]),
    )
}
