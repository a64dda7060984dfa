use anyhow::{Context, Result};
use clap::Parser;
use schedule_loader::logging::initialize_logging;
use schedule_loader::{
    EspnScheduleClient, InMemoryScheduleStore, LoaderConfig, PostgresScheduleStore,
    ScheduleLoader, ScheduleStore,
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "load-nfl-schedules")]
#[command(about = "Fetch NFL schedules from ESPN and upsert them into PostgreSQL")]
struct Cli {
    /// TOML config file; environment variables are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seasons to load, e.g. --years 2024,2025
    #[arg(long, value_delimiter = ',')]
    years: Option<Vec<i32>>,

    /// First week to load
    #[arg(long)]
    first_week: Option<u32>,

    /// Last week to load
    #[arg(long)]
    last_week: Option<u32>,

    /// Number of fetched games to print after the load
    #[arg(long, default_value = "5")]
    sample: usize,

    /// Fetch and report without writing to the database
    #[arg(long)]
    dry_run: bool,

    /// Log format: compact, pretty or json
    #[arg(long, default_value = "compact")]
    log_format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_logging("info", &cli.log_format)?;

    let mut config = match &cli.config {
        Some(path) => LoaderConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => LoaderConfig::from_env().context("Failed to load config from environment")?,
    };
    if let Some(years) = cli.years {
        config.run.years = years;
    }
    if let Some(first_week) = cli.first_week {
        config.run.first_week = first_week;
    }
    if let Some(last_week) = cli.last_week {
        config.run.last_week = last_week;
    }
    config.run.validate()?;

    let source = EspnScheduleClient::new(&config.source).context("Failed to create HTTP client")?;
    info!(url = %source.base_url(), "Using ESPN schedule feed");

    let store: Box<dyn ScheduleStore> = if cli.dry_run {
        info!("Dry run: games are kept in memory only");
        Box::new(InMemoryScheduleStore::new())
    } else {
        Box::new(PostgresScheduleStore::new(config.connect_options()))
    };

    let loader = ScheduleLoader::new(Box::new(source), store);
    let report = match loader.run(&config.run).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "❌ Schedule load failed");
            return Err(e.into());
        }
    };

    let summary = &report.summary;
    println!("\nTotal games fetched: {}", summary.fetched);
    if !summary.failed_weeks.is_empty() {
        let failed: Vec<String> =
            summary.failed_weeks.iter().map(|(y, w)| format!("{y}/{w}")).collect();
        println!("✗ Weeks that failed to fetch: {}", failed.join(", "));
    }
    println!("✓ Inserted: {} new games", summary.inserted);
    println!("✓ Updated: {} existing games", summary.updated);
    println!("✓ Total games in database: {}", summary.total_in_store);

    if cli.sample > 0 && !report.games.is_empty() {
        println!("\n{}", "=".repeat(80));
        println!("VALIDATION: Sample games (first {})", cli.sample);
        println!("{}\n", "=".repeat(80));

        for game in report.games.iter().take(cli.sample) {
            println!("ID: {}", game.game_id());
            println!("Season: {}", game.season);
            println!("Week: {}", game.week_no);
            println!("Date: {}", game.date);
            println!("Title: {}", game.title);
            println!("Venue: {}", game.venue);
            println!("{}", "-".repeat(80));
        }
    }

    Ok(())
}
