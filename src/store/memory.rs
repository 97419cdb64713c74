// src/store/memory.rs
//! In-process store with the same constraints as the Postgres schema: NOT NULL
//! on required columns, foreign keys on every reference and the `TIMESTAMP`
//! cast of `end_date`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use parking_lot::Mutex;

use super::{PollSession, PollStore, VoteOutcome};
use crate::error::PollError;
use crate::models::{NewPoll, NewVote, OptionRow, PollRow, RecordId};

#[derive(Debug, Clone)]
struct StoredPoll {
    id: RecordId,
    title: String,
    description: Option<String>,
    creator_id: Option<RecordId>,
    is_active: bool,
    end_date: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
struct StoredOption {
    id: RecordId,
    poll_id: RecordId,
    text: String,
    votes_count: i32,
}

#[derive(Debug, Clone, Copy)]
struct StoredVote {
    poll_id: RecordId,
    user_id: RecordId,
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<RecordId, String>,
    polls: Vec<StoredPoll>,
    options: Vec<StoredOption>,
    votes: Vec<StoredVote>,
    last_poll_id: RecordId,
    last_option_id: RecordId,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    sessions_opened: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, id: RecordId, name: impl Into<String>) -> Self {
        self.tables.lock().users.insert(id, name.into());
        self
    }

    /// How many sessions have been handed out so far.
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn vote_rows(&self) -> usize {
        self.tables.lock().votes.len()
    }

    pub fn poll_rows(&self) -> usize {
        self.tables.lock().polls.len()
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    type Session = MemorySession;

    async fn open(&self) -> Result<MemorySession, PollError> {
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession {
            tables: Arc::clone(&self.tables),
        })
    }
}

pub struct MemorySession {
    tables: Arc<Mutex<Tables>>,
}

#[async_trait]
impl PollSession for MemorySession {
    async fn list_polls(&mut self) -> Result<Vec<PollRow>, PollError> {
        let tables = self.tables.lock();

        let mut polls: Vec<&StoredPoll> = tables.polls.iter().collect();
        polls.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(polls
            .into_iter()
            .map(|poll| PollRow {
                id: poll.id,
                title: poll.title.clone(),
                description: poll.description.clone(),
                is_active: poll.is_active,
                end_date: poll.end_date,
                created_at: poll.created_at,
                creator_id: poll.creator_id,
                creator_name: poll
                    .creator_id
                    .and_then(|id| tables.users.get(&id).cloned()),
                total_votes: tables.votes.iter().filter(|v| v.poll_id == poll.id).count() as i64,
            })
            .collect())
    }

    async fn list_options(&mut self, poll_id: RecordId) -> Result<Vec<OptionRow>, PollError> {
        let tables = self.tables.lock();

        let mut options: Vec<OptionRow> = tables
            .options
            .iter()
            .filter(|option| option.poll_id == poll_id)
            .map(|option| OptionRow {
                id: option.id,
                text: option.text.clone(),
                votes: option.votes_count,
            })
            .collect();
        options.sort_by_key(|option| option.id);

        Ok(options)
    }

    async fn create_poll(&mut self, poll: &NewPoll) -> Result<RecordId, PollError> {
        let mut tables = self.tables.lock();

        let title = poll
            .title
            .clone()
            .ok_or_else(|| PollError::constraint("polls.title must not be null"))?;
        let end_date = poll.end_date.as_deref().map(cast_timestamp).transpose()?;
        if let Some(creator_id) = poll.creator_id {
            if !tables.users.contains_key(&creator_id) {
                return Err(PollError::constraint(format!(
                    "polls.creator_id {creator_id} references no user"
                )));
            }
        }

        tables.last_poll_id += 1;
        let poll_id = tables.last_poll_id;
        tables.polls.push(StoredPoll {
            id: poll_id,
            title,
            description: poll.description.clone(),
            creator_id: poll.creator_id,
            is_active: true,
            end_date,
            created_at: Utc::now().naive_utc(),
        });

        for text in &poll.options {
            tables.last_option_id += 1;
            let id = tables.last_option_id;
            tables.options.push(StoredOption {
                id,
                poll_id,
                text: text.clone(),
                votes_count: 0,
            });
        }

        Ok(poll_id)
    }

    async fn record_vote(&mut self, vote: &NewVote) -> Result<VoteOutcome, PollError> {
        let mut tables = self.tables.lock();

        if let (Some(poll_id), Some(user_id)) = (vote.poll_id, vote.user_id) {
            let already = tables
                .votes
                .iter()
                .any(|v| v.poll_id == poll_id && v.user_id == user_id);
            if already {
                return Ok(VoteOutcome::AlreadyVoted);
            }
        }

        let poll_id = vote
            .poll_id
            .ok_or_else(|| PollError::constraint("votes.poll_id must not be null"))?;
        let user_id = vote
            .user_id
            .ok_or_else(|| PollError::constraint("votes.user_id must not be null"))?;
        let option_id = vote
            .option_id
            .ok_or_else(|| PollError::constraint("votes.option_id must not be null"))?;

        if !tables.users.contains_key(&user_id) {
            return Err(PollError::constraint(format!(
                "votes.user_id {user_id} references no user"
            )));
        }
        if !tables.polls.iter().any(|poll| poll.id == poll_id) {
            return Err(PollError::constraint(format!(
                "votes.poll_id {poll_id} references no poll"
            )));
        }
        let option = tables
            .options
            .iter_mut()
            .find(|option| option.id == option_id)
            .ok_or_else(|| {
                PollError::constraint(format!("votes.option_id {option_id} references no option"))
            })?;
        option.votes_count += 1;

        tables.votes.push(StoredVote { poll_id, user_id });
        Ok(VoteOutcome::Recorded)
    }
}

/// The subset of Postgres timestamp input the clients send: ISO 8601 with `T`
/// or a space, optional seconds and fraction, a bare date (midnight) or
/// RFC 3339. An offset is dropped and the wall-clock time kept, as Postgres
/// does for `TIMESTAMP`.
fn cast_timestamp(raw: &str) -> Result<NaiveDateTime, PollError> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Ok(with_offset.naive_local());
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(parsed);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| PollError::InvalidEndDate(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 31)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn timestamps_in_the_shapes_postgres_accepts() {
        assert_eq!(cast_timestamp("2025-01-31").unwrap(), at(0, 0));
        assert_eq!(cast_timestamp("2025-01-31T00:00").unwrap(), at(0, 0));
        assert_eq!(cast_timestamp("2025-01-31T00:00:00").unwrap(), at(0, 0));
        assert_eq!(cast_timestamp("2025-01-31T00:00:00Z").unwrap(), at(0, 0));
        assert_eq!(cast_timestamp("2025-01-31 10:00").unwrap(), at(10, 0));
        assert_eq!(cast_timestamp("2025-01-31 10:00:00").unwrap(), at(10, 0));
        assert_eq!(
            cast_timestamp("2025-01-31T10:30:00+03:00").unwrap(),
            at(10, 30)
        );
    }

    #[test]
    fn blank_or_garbage_is_rejected() {
        assert!(matches!(
            cast_timestamp(""),
            Err(PollError::InvalidEndDate(_))
        ));
        assert!(matches!(
            cast_timestamp("next friday"),
            Err(PollError::InvalidEndDate(_))
        ));
    }

    #[tokio::test]
    async fn vote_from_unknown_user_is_rejected() {
        let store = MemoryStore::new().with_user(1, "Alice");
        let mut session = store.open().await.unwrap();
        let poll_id = session
            .create_poll(&NewPoll {
                title: Some("Lunch".to_string()),
                options: vec!["Soup".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();
        let option_id = session.list_options(poll_id).await.unwrap()[0].id;

        let result = session
            .record_vote(&NewVote {
                poll_id: Some(poll_id),
                option_id: Some(option_id),
                user_id: Some(99),
            })
            .await;

        assert!(matches!(result, Err(PollError::Constraint(_))));
        assert_eq!(store.vote_rows(), 0);
        assert_eq!(session.list_options(poll_id).await.unwrap()[0].votes, 0);
    }
}
