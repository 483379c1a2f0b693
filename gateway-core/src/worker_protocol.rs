//! The line-oriented JSON protocol spoken over a worker container's
//! stdin/stdout. One JSON object per line in each direction.

use serde::{Deserialize, Serialize};

/// A command sent to the worker.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum WorkerRequest {
    Init { game_file: String },
    Step { action: String },
}

/// A worker response. `init` and `step` share a status/observation shape
/// but differ in which fields are populated, so this is one permissive
/// struct rather than a tagged enum keyed on `cmd`.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerResponse {
    pub status: String,
    #[serde(default)]
    pub observation: Option<String>,
    #[serde(default)]
    pub admissible_commands: Option<Vec<String>>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub done: Option<bool>,
    #[serde(default)]
    pub won: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl WorkerResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Build the synthetic error response C2 returns in place of a parse
    /// failure or protocol violation, per the worker channel's contract.
    pub fn synthetic_error(message: String) -> Self {
        WorkerResponse {
            status: "error".to_string(),
            observation: None,
            admissible_commands: None,
            score: None,
            done: None,
            won: None,
            message: Some(message),
        }
    }
}
