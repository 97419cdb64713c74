// models.rs
use chrono::NaiveDateTime;

/// Primary keys are `SERIAL` columns.
pub type RecordId = i32;

/// One row of the poll listing query, creator name and vote total included.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PollRow {
    pub id: RecordId,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub end_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub creator_id: Option<RecordId>,
    pub creator_name: Option<String>,
    pub total_votes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OptionRow {
    pub id: RecordId,
    pub text: String,
    pub votes: i32,
}

/// A poll and its option labels, written together. Absent fields are stored
/// as NULL and left for the database to accept or reject.
#[derive(Debug, Clone, Default)]
pub struct NewPoll {
    pub title: Option<String>,
    pub description: Option<String>,
    pub options: Vec<String>,
    /// Raw text, cast to a timestamp by the store.
    pub end_date: Option<String>,
    pub creator_id: Option<RecordId>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NewVote {
    pub poll_id: Option<RecordId>,
    pub option_id: Option<RecordId>,
    pub user_id: Option<RecordId>,
}
