// src/store/postgres.rs
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{Connection, PgPool, Postgres};
use tracing::debug;

use super::{PollSession, PollStore, VoteOutcome};
use crate::error::PollError;
use crate::models::{NewPoll, NewVote, OptionRow, PollRow, RecordId};

const LIST_POLLS: &str = r#"
    SELECT
        p.id, p.title, p.description, p.is_active,
        p.end_date, p.created_at, p.creator_id,
        u.name AS creator_name,
        (SELECT COUNT(*) FROM votes WHERE poll_id = p.id) AS total_votes
    FROM polls p
    LEFT JOIN users u ON p.creator_id = u.id
    ORDER BY p.created_at DESC
"#;

const LIST_OPTIONS: &str = r#"
    SELECT id, text, votes_count AS votes
    FROM poll_options
    WHERE poll_id = $1
    ORDER BY id
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PollStore for PgStore {
    type Session = PgSession;

    async fn open(&self) -> Result<PgSession, PollError> {
        let conn = self.pool.acquire().await?;
        debug!("acquired database connection");
        Ok(PgSession { conn })
    }
}

/// One pooled connection, returned to the pool on drop.
pub struct PgSession {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl PollSession for PgSession {
    async fn list_polls(&mut self) -> Result<Vec<PollRow>, PollError> {
        let polls = sqlx::query_as::<_, PollRow>(LIST_POLLS)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(polls)
    }

    async fn list_options(&mut self, poll_id: RecordId) -> Result<Vec<OptionRow>, PollError> {
        let options = sqlx::query_as::<_, OptionRow>(LIST_OPTIONS)
            .bind(poll_id)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(options)
    }

    async fn create_poll(&mut self, poll: &NewPoll) -> Result<RecordId, PollError> {
        let mut tx = self.conn.begin().await?;

        let poll_id = sqlx::query_scalar::<_, RecordId>(
            "INSERT INTO polls (title, description, creator_id, end_date) VALUES ($1, $2, $3, CAST($4 AS TIMESTAMP)) RETURNING id",
        )
        .bind(&poll.title)
        .bind(&poll.description)
        .bind(poll.creator_id)
        .bind(&poll.end_date)
        .fetch_one(&mut *tx)
        .await?;

        for text in &poll.options {
            sqlx::query("INSERT INTO poll_options (poll_id, text) VALUES ($1, $2)")
                .bind(poll_id)
                .bind(text)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(poll_id)
    }

    async fn record_vote(&mut self, vote: &NewVote) -> Result<VoteOutcome, PollError> {
        let mut tx = self.conn.begin().await?;

        // Rolls back on drop.
        let existing =
            sqlx::query_scalar::<_, RecordId>("SELECT id FROM votes WHERE poll_id = $1 AND user_id = $2")
                .bind(vote.poll_id)
                .bind(vote.user_id)
                .fetch_optional(&mut *tx)
                .await?;

        if existing.is_some() {
            return Ok(VoteOutcome::AlreadyVoted);
        }

        let inserted = sqlx::query("INSERT INTO votes (poll_id, user_id, option_id) VALUES ($1, $2, $3)")
            .bind(vote.poll_id)
            .bind(vote.user_id)
            .bind(vote.option_id)
            .execute(&mut *tx)
            .await;

        if let Err(err) = inserted {
            // Only reachable where a unique index on (poll_id, user_id) exists.
            if is_unique_violation(&err) {
                return Ok(VoteOutcome::AlreadyVoted);
            }
            return Err(err.into());
        }

        sqlx::query("UPDATE poll_options SET votes_count = votes_count + 1 WHERE id = $1")
            .bind(vote.option_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(VoteOutcome::Recorded)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
