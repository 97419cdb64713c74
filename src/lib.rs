// src/lib.rs
//! Poll backend: list polls with their tallies, create polls, record one vote
//! per user per poll.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod poll;
pub mod routes;
pub mod store;

pub use config::Config;
pub use error::{ConfigError, PollError};
pub use poll::PollService;
