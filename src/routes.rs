// routes.rs
use std::sync::Arc;

use axum::routing::any;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::poll::PollService;
use crate::store::PollStore;

pub fn create_routes<S: PollStore>(service: PollService<S>) -> Router {
    Router::new()
        .route("/", any(handlers::dispatch::<S>))
        .fallback(handlers::dispatch::<S>)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(service))
}
