use crate::config::RunConfig;
use crate::error::Result;
use crate::fetcher::{fetch_range, ScheduleSource};
use crate::models::{GameRecord, LoadSummary};
use crate::store::ScheduleStore;
use tracing::{error, info};

/// Result of one load run: the summary numbers plus the games that were fetched
#[derive(Debug, Default)]
pub struct LoadReport {
    pub summary: LoadSummary,
    pub games: Vec<GameRecord>,
}

/// Drives schema setup, the range fetch and the single batch upsert
pub struct ScheduleLoader {
    source: Box<dyn ScheduleSource>,
    store: Box<dyn ScheduleStore>,
}

impl ScheduleLoader {
    pub fn new(source: Box<dyn ScheduleSource>, store: Box<dyn ScheduleStore>) -> Self {
        Self { source, store }
    }

    /// Run one best-effort pass over the configured seasons and weeks.
    ///
    /// Failed weeks are skipped and listed in the summary. Store errors abort the run;
    /// the store is only written after every fetch has finished.
    pub async fn run(&self, run: &RunConfig) -> Result<LoadReport> {
        info!("Setting up database");
        self.store.ensure_schema().await?;

        let weeks = run.weeks();
        info!(years = ?run.years, first_week = run.first_week, last_week = run.last_week, "Fetching NFL schedules");
        let fetched = fetch_range(self.source.as_ref(), &run.years, &weeks).await;
        info!(games = fetched.records.len(), failed_weeks = fetched.failed.len(), "Total games fetched");

        info!("Upserting games into database");
        let outcome = match self.store.upsert_batch(&fetched.records).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Upsert failed, store left unchanged");
                return Err(e);
            }
        };
        let total_in_store = self.store.count_all().await?;

        let summary = LoadSummary {
            fetched: fetched.records.len(),
            failed_weeks: fetched.failed,
            inserted: outcome.inserted,
            updated: outcome.updated,
            total_in_store,
        };
        info!(
            fetched = summary.fetched,
            inserted = summary.inserted,
            updated = summary.updated,
            total = summary.total_in_store,
            "✅ Load complete"
        );

        Ok(LoadReport { summary, games: fetched.records })
    }
}
