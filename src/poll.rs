// src/poll.rs
use http::{Method, StatusCode};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::api::{
    Action, CreatePollBody, CreateResult, ErrorResult, ListResult, PollRequest, PollResponse,
    PollView, ResponseBody, VoteBody, VoteResult,
};
use crate::error::PollError;
use crate::models::NewVote;
use crate::store::{PollSession, PollStore, VoteOutcome};

/// Routes a request to list, create or vote. Each call that needs storage
/// opens its own session and drops it before returning.
pub struct PollService<S> {
    store: S,
}

impl<S: PollStore> PollService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn handle(&self, request: PollRequest) -> Result<PollResponse, PollError> {
        let span = info_span!("poll_request", request_id = %Uuid::new_v4(), method = %request.method);
        self.dispatch(request).instrument(span).await
    }

    async fn dispatch(&self, request: PollRequest) -> Result<PollResponse, PollError> {
        match request.method {
            Method::OPTIONS => Ok(PollResponse::preflight()),
            Method::GET => self.list().await,
            Method::POST => match Action::parse(request.body_text())? {
                Action::Create(body) => self.create(body).await,
                Action::Vote(body) => self.vote(body).await,
                Action::Unknown(action) => {
                    warn!(?action, "unrecognized action");
                    Ok(PollResponse::method_not_allowed())
                }
            },
            _ => Ok(PollResponse::method_not_allowed()),
        }
    }

    async fn list(&self) -> Result<PollResponse, PollError> {
        let mut session = self.store.open().await?;

        let rows = session.list_polls().await?;
        let mut polls = Vec::with_capacity(rows.len());
        for row in rows {
            let options = session.list_options(row.id).await?;
            polls.push(PollView::new(row, options));
        }

        Ok(PollResponse::json(
            StatusCode::OK,
            ResponseBody::List(ListResult { polls }),
        ))
    }

    async fn create(&self, body: CreatePollBody) -> Result<PollResponse, PollError> {
        let poll = body.into_new_poll();
        let mut session = self.store.open().await?;

        let poll_id = session.create_poll(&poll).await?;
        info!(poll_id, options = poll.options.len(), creator_id = ?poll.creator_id, "poll created");

        Ok(PollResponse::json(
            StatusCode::CREATED,
            ResponseBody::Created(CreateResult {
                success: true,
                poll_id,
            }),
        ))
    }

    async fn vote(&self, body: VoteBody) -> Result<PollResponse, PollError> {
        let vote: NewVote = body.into();
        let mut session = self.store.open().await?;

        match session.record_vote(&vote).await? {
            VoteOutcome::Recorded => {
                info!(poll_id = ?vote.poll_id, option_id = ?vote.option_id, user_id = ?vote.user_id, "vote recorded");
                Ok(PollResponse::json(
                    StatusCode::OK,
                    ResponseBody::Voted(VoteResult { success: true }),
                ))
            }
            VoteOutcome::AlreadyVoted => {
                warn!(poll_id = ?vote.poll_id, user_id = ?vote.user_id, "duplicate vote rejected");
                Ok(PollResponse::json(
                    StatusCode::BAD_REQUEST,
                    ResponseBody::Error(ErrorResult::new("Already voted")),
                ))
            }
        }
    }
}
