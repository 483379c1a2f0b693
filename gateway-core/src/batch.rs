//! C5: groups step submissions that arrive within a short window and
//! dispatches each batch as a concurrent fan-out, one Worker-Channel
//! exchange per submission.

use crate::errors::{GatewayError, GatewayResult};
use crate::registry::SessionRegistry;
use crate::session::SessionStatus;
use crate::worker_protocol::WorkerRequest;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::time;
use tracing::debug;

/// The result of one successful step, returned verbatim to its caller.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub session_id: String,
    pub observation: String,
    pub score: f64,
    pub done: bool,
    pub won: bool,
    pub admissible_commands: Vec<String>,
}

struct PendingSubmission {
    session_id: String,
    action: String,
    responder: oneshot::Sender<GatewayResult<StepOutcome>>,
}

type Batch = Arc<Mutex<Vec<PendingSubmission>>>;

struct Inner {
    registry: Arc<SessionRegistry>,
    window: Duration,
    current: Mutex<Option<Batch>>,
}

/// Accepts per-session step submissions and fans each accumulated batch
/// out concurrently once its window elapses.
#[derive(Clone)]
pub struct BatchCoordinator {
    inner: Arc<Inner>,
}

impl BatchCoordinator {
    pub fn new(registry: Arc<SessionRegistry>, window: Duration) -> Self {
        BatchCoordinator {
            inner: Arc::new(Inner {
                registry,
                window,
                current: Mutex::new(None),
            }),
        }
    }

    /// Submit one step and wait for this caller's own result. Does not
    /// block on other callers' exchanges beyond the shared batch window.
    pub async fn submit_step(&self, session_id: String, action: String) -> GatewayResult<StepOutcome> {
        let (tx, rx) = oneshot::channel();
        let submission = PendingSubmission {
            session_id,
            action,
            responder: tx,
        };
        self.inner.enqueue(submission).await;
        rx.await
            .map_err(|_| GatewayError::Internal("batch dispatch dropped the response channel".into()))?
    }
}

impl Inner {
    async fn enqueue(self: &Arc<Self>, submission: PendingSubmission) {
        let mut current = self.current.lock().await;
        if let Some(batch) = current.as_ref() {
            batch.lock().await.push(submission);
            return;
        }

        let batch: Batch = Arc::new(Mutex::new(vec![submission]));
        *current = Some(Arc::clone(&batch));
        drop(current);

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            time::sleep(inner.window).await;

            let submissions = {
                let mut current = inner.current.lock().await;
                *current = None;
                let mut guard = batch.lock().await;
                std::mem::take(&mut *guard)
            };

            debug!(batch_size = submissions.len(), "dispatching step batch");
            inner.dispatch(submissions).await;
        });
    }

    async fn dispatch(&self, submissions: Vec<PendingSubmission>) {
        let mut handles = Vec::with_capacity(submissions.len());
        for submission in submissions {
            let registry = Arc::clone(&self.registry);
            handles.push(tokio::spawn(async move {
                let result = execute_step(&registry, &submission.session_id, submission.action).await;
                let _ = submission.responder.send(result);
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }
}

async fn execute_step(
    registry: &SessionRegistry,
    session_id: &str,
    action: String,
) -> GatewayResult<StepOutcome> {
    let session = registry.lookup(session_id).await?;
    if session.is_done().await {
        return Err(GatewayError::SessionAlreadyDone(session_id.to_string()));
    }

    let response = session
        .channel
        .exchange(&WorkerRequest::Step { action })
        .await?;
    if !response.is_ok() {
        return Err(GatewayError::ContainerError(
            response.message.unwrap_or_else(|| "worker step failed".into()),
        ));
    }

    let observation = response.observation.unwrap_or_default();
    let admissible_commands = response.admissible_commands.unwrap_or_default();
    let done = response.done.unwrap_or(false);
    let won = response.won.unwrap_or(false);
    let score = response.score.unwrap_or(0.0);

    {
        let mut meta = session.meta.lock().await;
        meta.last_active_at = Utc::now();
        meta.observation = observation.clone();
        meta.admissible_commands = admissible_commands.clone();
        if done {
            meta.status = SessionStatus::Done;
        }
    }

    Ok(StepOutcome {
        session_id: session_id.to_string(),
        observation,
        score,
        done,
        won,
        admissible_commands,
    })
}
