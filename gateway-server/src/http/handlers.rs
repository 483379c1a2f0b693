//! Endpoint handlers: translate HTTP requests into core calls and core
//! results back into response bodies.

use super::dto::{
    CreateSessionRequest, DeleteAllResponse, GamesResponse, HealthResponse, SessionResponse,
    StepRequest, StepResponse, TaskTypesResponse,
};
use super::error::ApiError;
use super::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use gateway_core::{GatewayError, TaskType};

pub async fn create_session(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> Result<Json<SessionResponse>, ApiError> {
    let req: CreateSessionRequest = if body.is_empty() {
        CreateSessionRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError(GatewayError::Internal(format!("invalid request body: {e}"))))?
    };
    let task_type = req.task_type.as_deref().and_then(TaskType::from_label);
    let view = state.registry.create_session(req.game_file, task_type).await?;
    Ok(Json(view.into()))
}

pub async fn delete_all_sessions(State(state): State<AppState>) -> Json<DeleteAllResponse> {
    let deleted = state.registry.delete_all().await;
    Json(DeleteAllResponse {
        count: deleted.len(),
        deleted,
    })
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let view = state.registry.get(&id).await?;
    Ok(Json(view.into()))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.registry.delete(&id).await?;
    Ok(Json(serde_json::json!({"status": "ok"})))
}

pub async fn step(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StepRequest>,
) -> Result<Json<StepResponse>, ApiError> {
    let outcome = state.batch.submit_step(id, req.action).await?;
    Ok(Json(outcome.into()))
}

pub async fn list_games(State(state): State<AppState>) -> Json<GamesResponse> {
    let games = state.registry.game_files().to_vec();
    Json(GamesResponse {
        total: games.len(),
        games,
    })
}

pub async fn task_types() -> Json<TaskTypesResponse> {
    Json(TaskTypesResponse {
        task_types: TaskType::label_map(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_sessions: state.registry.active_count().await,
        max_sessions: state.registry.max_sessions(),
        available_games: state.registry.game_files().len(),
    })
}
