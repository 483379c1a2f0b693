//! Request and response bodies for the HTTP surface.

use gateway_core::{SessionStatus, SessionView, StepOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize, Default)]
pub struct CreateSessionRequest {
    pub game_file: Option<String>,
    pub task_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub game_file: String,
    pub observation: String,
    pub admissible_commands: Vec<String>,
    pub status: SessionStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_active_at: chrono::DateTime<chrono::Utc>,
}

impl From<SessionView> for SessionResponse {
    fn from(view: SessionView) -> Self {
        SessionResponse {
            session_id: view.session_id,
            game_file: view.game_file,
            observation: view.observation,
            admissible_commands: view.admissible_commands,
            status: view.status,
            created_at: view.created_at,
            last_active_at: view.last_active_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StepResponse {
    pub session_id: String,
    pub observation: String,
    pub score: f64,
    pub done: bool,
    pub won: bool,
    pub admissible_commands: Vec<String>,
}

impl From<StepOutcome> for StepResponse {
    fn from(outcome: StepOutcome) -> Self {
        StepResponse {
            session_id: outcome.session_id,
            observation: outcome.observation,
            score: outcome.score,
            done: outcome.done,
            won: outcome.won,
            admissible_commands: outcome.admissible_commands,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteAllResponse {
    pub deleted: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct GamesResponse {
    pub games: Vec<String>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct TaskTypesResponse {
    pub task_types: BTreeMap<u8, &'static str>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_sessions: usize,
    pub max_sessions: usize,
    pub available_games: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub error_code: &'static str,
}
