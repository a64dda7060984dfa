//! Storage for schedule rows
//!
//! `PostgresScheduleStore` writes the `nfl_schedules` table. `InMemoryScheduleStore`
//! keeps the same semantics in a map for dry runs and tests.

use crate::error::{Result, ScheduleError};
use crate::models::{GameRecord, StoredGame, UpsertOutcome};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Postgres, QueryBuilder};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Rows per INSERT statement; keeps bind parameters well below the Postgres limit
const UPSERT_CHUNK_SIZE: usize = 1000;

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS nfl_schedules (
        id UUID PRIMARY KEY,
        season INTEGER NOT NULL,
        week_no INTEGER NOT NULL,
        date TIMESTAMP NOT NULL,
        title VARCHAR(255) NOT NULL,
        venue VARCHAR(255) NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    "ALTER TABLE nfl_schedules ADD COLUMN IF NOT EXISTS created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP",
    "ALTER TABLE nfl_schedules ADD COLUMN IF NOT EXISTS updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP",
    "CREATE INDEX IF NOT EXISTS idx_season_week ON nfl_schedules(season, week_no)",
];

/// Persistence for schedule rows keyed by game id
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Create the table and index if they do not exist yet
    async fn ensure_schema(&self) -> Result<()>;

    /// Insert new games and update known ones in a single all-or-nothing write
    async fn upsert_batch(&self, records: &[GameRecord]) -> Result<UpsertOutcome>;

    /// Total number of stored games
    async fn count_all(&self) -> Result<i64>;

    /// Stored games for one week, ordered by kickoff
    async fn games_for_week(&self, season: i32, week_no: i32) -> Result<Vec<StoredGame>>;
}

/// A record ready to be written: id and kickoff resolved
#[derive(Debug, Clone)]
pub struct PreparedGame {
    pub id: Uuid,
    pub season: i32,
    pub week_no: i32,
    pub date: NaiveDateTime,
    pub title: String,
    pub venue: String,
}

/// Resolve ids and kickoffs, collapsing records that share an id.
///
/// The last record for an id wins but keeps the position of the first one. Any
/// unparseable kickoff fails the whole batch.
pub fn prepare_batch(records: &[GameRecord]) -> Result<Vec<PreparedGame>> {
    let mut prepared: Vec<PreparedGame> = Vec::with_capacity(records.len());
    let mut positions: HashMap<Uuid, usize> = HashMap::with_capacity(records.len());

    for record in records {
        let game = PreparedGame {
            id: record.game_id(),
            season: record.season,
            week_no: record.week_no,
            date: record.kickoff()?,
            title: record.title.clone(),
            venue: record.venue.clone(),
        };

        match positions.get(&game.id) {
            Some(&idx) => prepared[idx] = game,
            None => {
                positions.insert(game.id, prepared.len());
                prepared.push(game);
            }
        }
    }

    Ok(prepared)
}

/// PostgreSQL-backed store; opens a fresh connection per operation
pub struct PostgresScheduleStore {
    options: PgConnectOptions,
}

impl PostgresScheduleStore {
    pub fn new(options: PgConnectOptions) -> Self {
        Self { options }
    }

    async fn connect(&self) -> Result<PgConnection> {
        PgConnection::connect_with(&self.options).await.map_err(ScheduleError::StoreConnection)
    }
}

#[async_trait]
impl ScheduleStore for PostgresScheduleStore {
    #[instrument(level = "info", skip(self))]
    async fn ensure_schema(&self) -> Result<()> {
        let mut conn = self.connect().await?;

        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&mut conn).await.map_err(ScheduleError::StoreWrite)?;
        }

        info!("Schema for nfl_schedules is in place");
        Ok(())
    }

    #[instrument(level = "info", skip(self, records), fields(records = records.len()))]
    async fn upsert_batch(&self, records: &[GameRecord]) -> Result<UpsertOutcome> {
        let games = prepare_batch(records)?;
        if games.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await.map_err(ScheduleError::StoreWrite)?;
        let mut outcome = UpsertOutcome::default();

        for chunk in games.chunks(UPSERT_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO nfl_schedules (id, season, week_no, date, title, venue) ",
            );
            builder.push_values(chunk, |mut row, game| {
                row.push_bind(game.id)
                    .push_bind(game.season)
                    .push_bind(game.week_no)
                    .push_bind(game.date)
                    .push_bind(game.title.clone())
                    .push_bind(game.venue.clone());
            });
            builder.push(
                r#"
                ON CONFLICT (id)
                DO UPDATE SET
                    season = EXCLUDED.season,
                    week_no = EXCLUDED.week_no,
                    date = EXCLUDED.date,
                    title = EXCLUDED.title,
                    venue = EXCLUDED.venue,
                    updated_at = CURRENT_TIMESTAMP
                RETURNING (xmax = 0) AS inserted
                "#,
            );

            // xmax is zero only for rows this statement freshly inserted
            let inserted_flags: Vec<bool> = builder
                .build_query_scalar()
                .fetch_all(&mut *tx)
                .await
                .map_err(ScheduleError::StoreWrite)?;

            for inserted in inserted_flags {
                if inserted {
                    outcome.inserted += 1;
                } else {
                    outcome.updated += 1;
                }
            }
            debug!(rows = chunk.len(), "Upserted chunk");
        }

        tx.commit().await.map_err(ScheduleError::StoreWrite)?;

        info!(inserted = outcome.inserted, updated = outcome.updated, "Upserted games");
        Ok(outcome)
    }

    async fn count_all(&self) -> Result<i64> {
        let mut conn = self.connect().await?;
        sqlx::query_scalar("SELECT COUNT(*) FROM nfl_schedules")
            .fetch_one(&mut conn)
            .await
            .map_err(ScheduleError::StoreRead)
    }

    async fn games_for_week(&self, season: i32, week_no: i32) -> Result<Vec<StoredGame>> {
        let mut conn = self.connect().await?;
        sqlx::query_as::<_, StoredGame>(
            r#"
            SELECT id, season, week_no, date, title, venue, created_at, updated_at
            FROM nfl_schedules
            WHERE season = $1 AND week_no = $2
            ORDER BY date
            "#,
        )
        .bind(season)
        .bind(week_no)
        .fetch_all(&mut conn)
        .await
        .map_err(ScheduleError::StoreRead)
    }
}

/// Map-backed store with the same upsert semantics as the Postgres one
#[derive(Default)]
pub struct InMemoryScheduleStore {
    rows: Mutex<BTreeMap<Uuid, StoredGame>>,
    writes: AtomicUsize,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of upserts that actually touched the map
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, id: &Uuid) -> Option<StoredGame> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner).get(id).cloned()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert_batch(&self, records: &[GameRecord]) -> Result<UpsertOutcome> {
        let games = prepare_batch(records)?;
        if games.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let now = Utc::now().naive_utc();
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let mut outcome = UpsertOutcome::default();

        for game in games {
            match rows.get_mut(&game.id) {
                Some(row) => {
                    row.season = game.season;
                    row.week_no = game.week_no;
                    row.date = game.date;
                    row.title = game.title;
                    row.venue = game.venue;
                    row.updated_at = Some(now);
                    outcome.updated += 1;
                }
                None => {
                    rows.insert(
                        game.id,
                        StoredGame {
                            id: game.id,
                            season: game.season,
                            week_no: game.week_no,
                            date: game.date,
                            title: game.title,
                            venue: game.venue,
                            created_at: Some(now),
                            updated_at: Some(now),
                        },
                    );
                    outcome.inserted += 1;
                }
            }
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(outcome)
    }

    async fn count_all(&self) -> Result<i64> {
        let rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(rows.len() as i64)
    }

    async fn games_for_week(&self, season: i32, week_no: i32) -> Result<Vec<StoredGame>> {
        let rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let mut games: Vec<StoredGame> = rows
            .values()
            .filter(|g| g.season == season && g.week_no == week_no)
            .cloned()
            .collect();
        games.sort_by_key(|g| g.date);
        Ok(games)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week_one() -> Vec<GameRecord> {
        vec![
            GameRecord::new(2024, 1, "Baltimore Ravens at Kansas City Chiefs", "2024-09-06T00:20Z", "GEHA Field at Arrowhead Stadium"),
            GameRecord::new(2024, 1, "Green Bay Packers at Philadelphia Eagles", "2024-09-07T00:15Z", "Arena Corinthians"),
            GameRecord::new(2024, 1, "Pittsburgh Steelers at Atlanta Falcons", "2024-09-08T17:00Z", "Mercedes-Benz Stadium"),
        ]
    }

    #[test]
    fn test_prepare_batch_collapses_shared_ids() {
        let mut records = week_one();
        records.push(GameRecord::new(
            2024,
            1,
            "Baltimore Ravens at Kansas City Chiefs",
            "2024-09-06T01:00Z",
            "Arrowhead",
        ));

        let prepared = prepare_batch(&records).unwrap();
        assert_eq!(prepared.len(), 3);
        assert_eq!(prepared[0].title, "Baltimore Ravens at Kansas City Chiefs");
        assert_eq!(prepared[0].venue, "Arrowhead");
    }

    #[test]
    fn test_prepare_batch_rejects_bad_kickoff() {
        let mut records = week_one();
        records.push(GameRecord::new(2024, 1, "TBD at TBD", "TBD", ""));

        assert!(matches!(prepare_batch(&records), Err(ScheduleError::InvalidTimestamp { .. })));
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let store = InMemoryScheduleStore::new();

        let outcome = store.upsert_batch(&[]).await.unwrap();
        assert_eq!(outcome, UpsertOutcome { inserted: 0, updated: 0 });
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_replaying_a_batch_updates_in_place() {
        let store = InMemoryScheduleStore::new();
        let batch = week_one();

        let first = store.upsert_batch(&batch).await.unwrap();
        assert_eq!(first, UpsertOutcome { inserted: 3, updated: 0 });
        let total = store.count_all().await.unwrap();

        let second = store.upsert_batch(&batch).await.unwrap();
        assert_eq!(second, UpsertOutcome { inserted: 0, updated: 3 });
        assert_eq!(store.count_all().await.unwrap(), total);
    }

    #[tokio::test]
    async fn test_moved_game_keeps_its_row() {
        let store = InMemoryScheduleStore::new();
        let original = GameRecord::new(2025, 2, "A at B", "2025-09-14T17:00Z", "Stadium X");
        store.upsert_batch(std::slice::from_ref(&original)).await.unwrap();
        let created = store.get(&original.game_id()).unwrap().created_at;

        let moved = GameRecord::new(2025, 2, "A at B", "2025-09-15T00:20Z", "Stadium Y");
        let outcome = store.upsert_batch(&[moved]).await.unwrap();

        assert_eq!(outcome, UpsertOutcome { inserted: 0, updated: 1 });
        let row = store.get(&original.game_id()).unwrap();
        assert_eq!(row.venue, "Stadium Y");
        assert_eq!(row.created_at, created);
        assert_eq!(store.count_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bad_kickoff_leaves_store_untouched() {
        let store = InMemoryScheduleStore::new();
        let mut batch = week_one();
        batch.push(GameRecord::new(2024, 1, "TBD at TBD", "", ""));

        assert!(store.upsert_batch(&batch).await.is_err());
        assert_eq!(store.count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_games_for_week_sorted_by_kickoff() {
        let store = InMemoryScheduleStore::new();
        let mut batch = week_one();
        batch.reverse();
        batch.push(GameRecord::new(2024, 2, "Other at Week", "2024-09-15T17:00Z", ""));
        store.upsert_batch(&batch).await.unwrap();

        let games = store.games_for_week(2024, 1).await.unwrap();
        let titles: Vec<&str> = games.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Baltimore Ravens at Kansas City Chiefs",
                "Green Bay Packers at Philadelphia Eagles",
                "Pittsburgh Steelers at Atlanta Falcons",
            ]
        );
        assert!(store.games_for_week(2023, 1).await.unwrap().is_empty());
    }

    /// Runs against a real database when TEST_DATABASE_URL is set
    #[tokio::test]
    async fn test_postgres_upsert_round() {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            return;
        };
        let options: PgConnectOptions = url.parse().expect("invalid TEST_DATABASE_URL");
        let store = PostgresScheduleStore::new(options.clone());

        store.ensure_schema().await.unwrap();
        store.ensure_schema().await.unwrap();

        // Season reserved for this test
        let season = 1933;
        let mut conn = PgConnection::connect_with(&options).await.unwrap();
        sqlx::query("DELETE FROM nfl_schedules WHERE season = $1")
            .bind(season)
            .execute(&mut conn)
            .await
            .unwrap();

        let batch: Vec<GameRecord> = week_one()
            .into_iter()
            .map(|g| GameRecord { season, ..g })
            .collect();

        assert_eq!(store.upsert_batch(&[]).await.unwrap(), UpsertOutcome::default());

        let first = store.upsert_batch(&batch).await.unwrap();
        assert_eq!(first, UpsertOutcome { inserted: 3, updated: 0 });
        let total = store.count_all().await.unwrap();

        let second = store.upsert_batch(&batch).await.unwrap();
        assert_eq!(second, UpsertOutcome { inserted: 0, updated: 3 });
        assert_eq!(store.count_all().await.unwrap(), total);

        let games = store.games_for_week(season, 1).await.unwrap();
        assert_eq!(games.len(), 3);
        assert_eq!(games[0].id, batch[0].game_id());
        assert!(games.iter().all(|g| g.created_at.is_some() && g.updated_at >= g.created_at));

        sqlx::query("DELETE FROM nfl_schedules WHERE season = $1")
            .bind(season)
            .execute(&mut conn)
            .await
            .unwrap();
    }
}
