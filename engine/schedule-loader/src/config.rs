use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::path::Path;

use crate::error::{Result, ScheduleError};

/// Configuration for the schedule loader
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// PostgreSQL connection settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Upstream schedule feed settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Which seasons and weeks a run covers
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Database name
    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Schedule endpoint; `xhr`, `year` and `week` are appended as query parameters
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Seasons to fetch, in order
    pub years: Vec<i32>,

    /// First regular season week (inclusive)
    pub first_week: u32,

    /// Last regular season week (inclusive)
    pub last_week: u32,
}

pub const DEFAULT_SCHEDULE_URL: &str = "https://cdn.espn.com/core/nfl/schedule";

fn default_database() -> String {
    "nfl-schedules".to_string()
}

fn default_port() -> u16 {
    5432
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            user: String::new(),
            password: String::new(),
            database: default_database(),
            port: default_port(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_SCHEDULE_URL.to_string(), timeout_secs: 30 }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { years: vec![2024, 2025], first_week: 1, last_week: 17 }
    }
}

impl LoaderConfig {
    /// Load configuration from environment variables, reading `.env` first if present
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = non_empty("PG_SERVER_HOST").or_else(|| non_empty("PG_HOST")) {
            config.database.host = host;
        }
        if let Some(user) = non_empty("PG_USER") {
            config.database.user = user;
        }
        if let Some(password) = non_empty("PG_PASSWORD") {
            config.database.password = password;
        }
        if let Some(database) = non_empty("PG_DATABASE") {
            config.database.database = database;
        }
        if let Some(port) = non_empty("PG_PORT") {
            config.database.port = port
                .parse()
                .map_err(|_| ScheduleError::config(format!("Invalid PG_PORT: {port}")))?;
        }
        if let Some(url) = non_empty("ESPN_SCHEDULE_URL") {
            config.source.base_url = url;
        }
        if let Some(timeout) = non_empty("ESPN_TIMEOUT_SECS") {
            config.source.timeout_secs = timeout.parse().map_err(|_| {
                ScheduleError::config(format!("Invalid ESPN_TIMEOUT_SECS: {timeout}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, with `NFL__SECTION__KEY` environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("NFL").separator("__"))
            .build()
            .map_err(|e| ScheduleError::config(e.to_string()))?;

        let config: Self =
            settings.try_deserialize().map_err(|e| ScheduleError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration, reporting every missing database setting at once
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("PG_SERVER_HOST", &self.database.host),
            ("PG_USER", &self.database.user),
            ("PG_PASSWORD", &self.database.password),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(ScheduleError::config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        self.run.validate()
    }

    /// Connection options for the configured database
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.database.host)
            .port(self.database.port)
            .username(&self.database.user)
            .password(&self.database.password)
            .database(&self.database.database)
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.years.is_empty() {
            return Err(ScheduleError::config("At least one season year is required"));
        }
        if self.first_week == 0 || self.last_week > 18 || self.first_week > self.last_week {
            return Err(ScheduleError::config(format!(
                "Invalid week range {}..={} (weeks run 1 to 18)",
                self.first_week, self.last_week
            )));
        }
        Ok(())
    }

    /// Weeks covered by a run
    pub fn weeks(&self) -> Vec<u32> {
        (self.first_week..=self.last_week).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_database_settings() {
        let config = LoaderConfig::from_lookup(lookup_from(&[
            ("PG_SERVER_HOST", "db.internal"),
            ("PG_USER", "loader"),
            ("PG_PASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.user, "loader");
        assert_eq!(config.database.database, "nfl-schedules");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.source.base_url, DEFAULT_SCHEDULE_URL);
        assert_eq!(config.run.weeks().len(), 17);
    }

    #[test]
    fn test_pg_host_is_accepted_as_fallback() {
        let config = LoaderConfig::from_lookup(lookup_from(&[
            ("PG_HOST", "fallback-host"),
            ("PG_USER", "loader"),
            ("PG_PASSWORD", "secret"),
            ("PG_DATABASE", "schedules_test"),
            ("PG_PORT", "6543"),
        ]))
        .unwrap();

        assert_eq!(config.database.host, "fallback-host");
        assert_eq!(config.database.database, "schedules_test");
        assert_eq!(config.database.port, 6543);
    }

    #[test]
    fn test_missing_credentials_fail_fast() {
        let err = LoaderConfig::from_lookup(lookup_from(&[("PG_USER", "loader")])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("PG_SERVER_HOST"), "message was: {message}");
        assert!(message.contains("PG_PASSWORD"), "message was: {message}");
        assert!(!message.contains("PG_USER"), "message was: {message}");
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = LoaderConfig::from_lookup(lookup_from(&[
            ("PG_SERVER_HOST", "db"),
            ("PG_USER", "loader"),
            ("PG_PASSWORD", "secret"),
            ("PG_PORT", "not-a-port"),
        ]));
        assert!(matches!(result, Err(ScheduleError::InvalidConfig(_))));
    }

    #[test]
    fn test_week_range_validation() {
        let mut run = RunConfig::default();
        assert!(run.validate().is_ok());

        run.first_week = 0;
        assert!(run.validate().is_err());

        run.first_week = 10;
        run.last_week = 9;
        assert!(run.validate().is_err());

        run.first_week = 1;
        run.last_week = 18;
        assert!(run.validate().is_ok());

        run.years.clear();
        assert!(run.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[database]
host = "localhost"
user = "postgres"
password = "password"

[run]
years = [2023]
first_week = 1
last_week = 4
"#
        )
        .unwrap();

        let config = LoaderConfig::from_file(file.path()).unwrap();
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.database, "nfl-schedules");
        assert_eq!(config.run.years, vec![2023]);
        assert_eq!(config.run.weeks(), vec![1, 2, 3, 4]);
        assert_eq!(config.source.timeout_secs, 30);
    }
}
