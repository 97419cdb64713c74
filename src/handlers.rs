// handlers.rs
use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use crate::api::{cors_headers, ErrorResult, PollRequest, PollResponse};
use crate::error::PollError;
use crate::poll::PollService;
use crate::store::PollStore;

/// Single entry point for every method and path; the service does the routing.
pub async fn dispatch<S: PollStore>(
    State(service): State<Arc<PollService<S>>>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let mut request = PollRequest::new(method).with_query(query);
    if !body.is_empty() {
        request = request.with_body(String::from_utf8_lossy(&body).into_owned());
    }

    match service.handle(request).await.and_then(render) {
        Ok(response) => response,
        Err(e) => {
            error!("Request failed: {}", e);
            internal_error(&e)
        }
    }
}

fn render(response: PollResponse) -> Result<Response, PollError> {
    let body = response.body_text()?;
    Ok((response.status, response.headers, Body::from(body)).into_response())
}

fn internal_error(e: &PollError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        cors_headers(),
        Json(ErrorResult::new(e.to_string())),
    )
        .into_response()
}
