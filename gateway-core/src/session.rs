//! The session record (C3 entity).
//!
//! Fields that never change after creation (`id`, `created_at`, the
//! container handle, the worker channel, the admission permit) live
//! directly on [`Session`]. Fields the batch coordinator updates after
//! every exchange are grouped in [`SessionMeta`] behind their own short
//! lived mutex, so a lookup never has to hold the registry-wide map lock
//! across a worker round-trip.

use crate::container::ContainerHandle;
use crate::worker_channel::WorkerChannel;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedSemaphorePermit};

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Done,
}

pub struct SessionMeta {
    pub game_file: String,
    pub observation: String,
    pub admissible_commands: Vec<String>,
    pub status: SessionStatus,
    pub last_active_at: DateTime<Utc>,
}

pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub container: ContainerHandle,
    pub channel: WorkerChannel,
    /// Released automatically (RAII) when the session is dropped, which
    /// is the only way a permit is ever returned to the admission semaphore.
    pub permit: OwnedSemaphorePermit,
    pub meta: Mutex<SessionMeta>,
}

/// The externally-visible projection of a session, served by every
/// endpoint that returns session data.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub game_file: String,
    pub observation: String,
    pub admissible_commands: Vec<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    pub async fn view(&self) -> SessionView {
        let meta = self.meta.lock().await;
        SessionView {
            session_id: self.id.clone(),
            game_file: meta.game_file.clone(),
            observation: meta.observation.clone(),
            admissible_commands: meta.admissible_commands.clone(),
            status: meta.status,
            created_at: self.created_at,
            last_active_at: meta.last_active_at,
        }
    }

    pub async fn is_done(&self) -> bool {
        self.meta.lock().await.status == SessionStatus::Done
    }

    pub async fn last_active_at(&self) -> DateTime<Utc> {
        self.meta.lock().await.last_active_at
    }
}
