// src/store/mod.rs
//! Storage seam for the poll operations.
//!
//! A [`PollStore`] hands out one [`PollSession`] per request. The session owns
//! its connection and gives it back when dropped, so every exit path of a
//! request releases it.

use async_trait::async_trait;

use crate::error::PollError;
use crate::models::{NewPoll, NewVote, OptionRow, PollRow, RecordId};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded,
    AlreadyVoted,
}

#[async_trait]
pub trait PollStore: Send + Sync + 'static {
    type Session: PollSession;

    async fn open(&self) -> Result<Self::Session, PollError>;
}

#[async_trait]
pub trait PollSession: Send {
    /// Every poll, newest first, with creator name and vote total.
    async fn list_polls(&mut self) -> Result<Vec<PollRow>, PollError>;

    /// Options of one poll in ascending id order.
    async fn list_options(&mut self, poll_id: RecordId) -> Result<Vec<OptionRow>, PollError>;

    /// Writes the poll and its options in the given order, all or nothing.
    async fn create_poll(&mut self, poll: &NewPoll) -> Result<RecordId, PollError>;

    /// Checks for an earlier vote by the same user on the same poll, then
    /// stores the vote and bumps the option's counter by one.
    async fn record_vote(&mut self, vote: &NewVote) -> Result<VoteOutcome, PollError>;
}
