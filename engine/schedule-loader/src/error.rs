//! Error types for the schedule loader

use thiserror::Error;

/// Result type alias for schedule loader operations
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Errors that can occur while fetching or storing schedules
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// Upstream request for a single season/week failed
    #[error("Fetch failed for {year} week {week}: {message}")]
    Fetch { year: i32, week: u32, message: String },

    /// Upstream body could not be read as JSON
    #[error("Malformed payload for {year} week {week}: {message}")]
    MalformedPayload { year: i32, week: u32, message: String },

    /// Could not open a connection to the store
    #[error("Store connection error: {0}")]
    StoreConnection(#[source] sqlx::Error),

    /// A statement against the store failed
    #[error("Store write error: {0}")]
    StoreWrite(#[source] sqlx::Error),

    /// A read against the store failed
    #[error("Store read error: {0}")]
    StoreRead(#[source] sqlx::Error),

    /// A game date could not be turned into a timestamp
    #[error("Invalid timestamp '{value}' for game '{title}'")]
    InvalidTimestamp { value: String, title: String },

    /// Configuration is missing or inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ScheduleError {
    /// Create a new fetch error for a season/week pair
    pub fn fetch(year: i32, week: u32, msg: impl Into<String>) -> Self {
        Self::Fetch { year, week, message: msg.into() }
    }

    /// Create a new malformed payload error for a season/week pair
    pub fn malformed(year: i32, week: u32, msg: impl Into<String>) -> Self {
        Self::MalformedPayload { year, week, message: msg.into() }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether the range fetch may skip this error and continue
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::MalformedPayload { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_errors_are_recoverable() {
        assert!(ScheduleError::fetch(2024, 3, "HTTP 503").is_recoverable());
        assert!(ScheduleError::malformed(2024, 3, "expected value").is_recoverable());
        assert!(!ScheduleError::config("PG_USER not set").is_recoverable());
        assert!(!ScheduleError::StoreWrite(sqlx::Error::RowNotFound).is_recoverable());
    }

    #[test]
    fn test_error_messages_name_the_pair() {
        let err = ScheduleError::fetch(2025, 17, "HTTP 404 Not Found");
        assert_eq!(err.to_string(), "Fetch failed for 2025 week 17: HTTP 404 Not Found");
    }
}
