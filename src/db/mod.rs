pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqlitePool, SqlitePoolOptions},
    Row, Sqlite,
};

use crate::config::Config;
use crate::error::{PollError, Result};
use crate::models::{Ballot, Poll, PollRecord, VotingMethod};

pub use memory::MemoryStore;

/// Result of an attempt to close a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    AlreadyEnded,
    /// A ballot arrived after the winner was computed; recompute and retry.
    BallotsChanged,
    NotFound,
}

/// Where polls live. Implementations must make `append_ballot` and
/// `close_poll` atomic per poll: once a close succeeds no other close or
/// append may succeed on the same poll.
#[async_trait]
pub trait PollStore: Send + Sync {
    async fn create_poll(&self, poll: &Poll) -> Result<()>;

    async fn get_poll(&self, poll_id: &str) -> Result<Poll>;

    /// Validates and appends a ballot to an open poll.
    async fn append_ballot(&self, poll_id: &str, ballot: Ballot) -> Result<()>;

    /// Closes the poll only if it is still open and still holds exactly
    /// `expected_votes` ballots.
    async fn close_poll(
        &self,
        poll_id: &str,
        expected_votes: usize,
        winner: &str,
        final_scores: &[f64],
    ) -> Result<CloseOutcome>;

    /// Ids of open polls whose deadline is before `now`.
    async fn expired_polls(&self, now: DateTime<Utc>) -> Result<Vec<String>>;
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(config: &Config) -> Result<Self> {
        let db_url = config.database_url.as_str();

        // Create database if it doesn't exist
        if !db_url.contains(":memory:") && !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database {}", db_url);
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(db_url)
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        // voting_method stays nullable: rows written before polls had a method are slider polls.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS polls (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                options TEXT NOT NULL,
                voting_method TEXT,
                hide_scores BOOLEAN NOT NULL DEFAULT FALSE,
                ended BOOLEAN NOT NULL DEFAULT FALSE,
                winner TEXT,
                final_scores TEXT,
                created_at TEXT NOT NULL,
                ends_at TEXT
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ballots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                poll_id TEXT NOT NULL,
                ballot TEXT NOT NULL,
                FOREIGN KEY (poll_id) REFERENCES polls(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS ballots_poll_id ON ballots (poll_id);")
            .execute(pool)
            .await?;

        Ok(())
    }

    async fn poll_status(&self, poll_id: &str) -> Result<Option<bool>> {
        let row = sqlx::query("SELECT ended FROM polls WHERE id = ?")
            .bind(poll_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get::<bool, _>("ended")))
    }
}

#[async_trait]
impl PollStore for Database {
    async fn create_poll(&self, poll: &Poll) -> Result<()> {
        let record = PollRecord::from(poll.clone());

        sqlx::query(
            r#"
            INSERT INTO polls (id, title, options, voting_method, hide_scores, ended, winner, final_scores, created_at, ends_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.title)
        .bind(serde_json::to_string(&record.options)?)
        .bind(record.voting_method.as_str())
        .bind(record.hide_scores)
        .bind(record.ended)
        .bind(&record.winner)
        .bind(record.final_scores.as_ref().map(serde_json::to_string).transpose()?)
        .bind(record.created_at.to_rfc3339())
        .bind(record.ends_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        for ballot in &record.votes {
            sqlx::query("INSERT INTO ballots (poll_id, ballot) VALUES (?, ?)")
                .bind(&record.id)
                .bind(serde_json::to_string(ballot)?)
                .execute(&self.pool)
                .await?;
        }

        debug!("Stored poll {} ({} options)", record.id, record.options.len());
        Ok(())
    }

    async fn get_poll(&self, poll_id: &str) -> Result<Poll> {
        let row = sqlx::query(
            r#"
            SELECT id, title, options, voting_method, hide_scores, ended, winner, final_scores, created_at, ends_at
            FROM polls
            WHERE id = ?
            "#,
        )
        .bind(poll_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| PollError::NotFound(poll_id.to_string()))?;

        let corrupt = |reason: String| PollError::CorruptRecord {
            id: poll_id.to_string(),
            reason,
        };

        let voting_method = match row.get::<Option<String>, _>("voting_method") {
            Some(method) => method.parse::<VotingMethod>()?,
            None => VotingMethod::default(),
        };

        let created_at = DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))
            .map_err(|e| corrupt(format!("bad created_at: {}", e)))?
            .with_timezone(&Utc);

        let ends_at = match row.get::<Option<String>, _>("ends_at") {
            Some(s) => Some(
                DateTime::parse_from_rfc3339(&s)
                    .map_err(|e| corrupt(format!("bad ends_at: {}", e)))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        let final_scores = match row.get::<Option<String>, _>("final_scores") {
            Some(s) => Some(serde_json::from_str::<Vec<f64>>(&s)?),
            None => None,
        };

        let votes = sqlx::query("SELECT ballot FROM ballots WHERE poll_id = ? ORDER BY id")
            .bind(poll_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| serde_json::from_str::<Ballot>(&row.get::<String, _>("ballot")))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let record = PollRecord {
            id: row.get("id"),
            title: row.get("title"),
            options: serde_json::from_str(&row.get::<String, _>("options"))?,
            voting_method,
            hide_scores: row.get("hide_scores"),
            votes,
            ended: row.get("ended"),
            winner: row.get("winner"),
            final_scores,
            created_at,
            ends_at,
        };

        Poll::try_from(record)
    }

    async fn append_ballot(&self, poll_id: &str, ballot: Ballot) -> Result<()> {
        // Validate against the stored poll; a failed check leaves nothing behind.
        let mut poll = self.get_poll(poll_id).await?;
        poll.append_ballot(ballot.clone())?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO ballots (poll_id, ballot)
            SELECT ?, ?
            WHERE EXISTS (SELECT 1 FROM polls WHERE id = ? AND ended = FALSE)
            "#,
        )
        .bind(poll_id)
        .bind(serde_json::to_string(&ballot)?)
        .bind(poll_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            // Closed between the read above and the insert.
            return Err(PollError::AlreadyEnded(poll_id.to_string()));
        }
        Ok(())
    }

    async fn close_poll(
        &self,
        poll_id: &str,
        expected_votes: usize,
        winner: &str,
        final_scores: &[f64],
    ) -> Result<CloseOutcome> {
        let updated = sqlx::query(
            r#"
            UPDATE polls
            SET ended = TRUE, winner = ?, final_scores = ?
            WHERE id = ? AND ended = FALSE
              AND (SELECT COUNT(*) FROM ballots WHERE poll_id = ?) = ?
            "#,
        )
        .bind(winner)
        .bind(serde_json::to_string(final_scores)?)
        .bind(poll_id)
        .bind(poll_id)
        .bind(expected_votes as i64)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 1 {
            return Ok(CloseOutcome::Closed);
        }

        Ok(match self.poll_status(poll_id).await? {
            None => CloseOutcome::NotFound,
            Some(true) => CloseOutcome::AlreadyEnded,
            Some(false) => CloseOutcome::BallotsChanged,
        })
    }

    async fn expired_polls(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let ids = sqlx::query(
            r#"
            SELECT id
            FROM polls
            WHERE ends_at IS NOT NULL AND ends_at < ? AND ended = FALSE
            "#,
        )
        .bind(now.to_rfc3339())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| row.get::<String, _>("id"))
        .collect();
        Ok(ids)
    }
}
