pub mod dto;
pub mod error;
pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use gateway_core::{BatchCoordinator, SessionRegistry};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub batch: BatchCoordinator,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sessions", post(handlers::create_session).delete(handlers::delete_all_sessions))
        .route(
            "/sessions/:id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/:id/step", post(handlers::step))
        .route("/games", get(handlers::list_games))
        .route("/task-types", get(handlers::task_types))
        .route("/health", get(handlers::health))
        .with_state(state)
}
