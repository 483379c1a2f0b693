//! Unified error type for the gateway coordination layer.
//!
//! Every fallible operation in this crate returns [`GatewayError`]. The
//! HTTP facade maps each variant to a stable `error_code` and status code
//! in one place, so the mapping cannot drift between handlers.

use thiserror::Error;

/// Stable, wire-facing identifier for an error kind.
///
/// Serialized verbatim into the HTTP error body's `error_code` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    SessionNotFound,
    SessionAlreadyDone,
    NoSlots,
    ContainerError,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::SessionNotFound => "session-not-found",
            ErrorCode::SessionAlreadyDone => "session-already-done",
            ErrorCode::NoSlots => "no-slots",
            ErrorCode::ContainerError => "container-error",
            ErrorCode::Internal => "internal",
        }
    }
}

/// Top-level error type for the session/worker coordination layer.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The requested session does not exist (or was already removed).
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// A step was submitted for a session that has already reached `done`.
    #[error("session already done: {0}")]
    SessionAlreadyDone(String),

    /// The admission semaphore has no free permits.
    #[error("no session slots available (max {0})")]
    NoSlots(usize),

    /// Any failure during container start, attach, init, or exchange.
    #[error("container error: {0}")]
    ContainerError(String),

    /// Unanticipated failure in gateway code.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            GatewayError::SessionAlreadyDone(_) => ErrorCode::SessionAlreadyDone,
            GatewayError::NoSlots(_) => ErrorCode::NoSlots,
            GatewayError::ContainerError(_) => ErrorCode::ContainerError,
            GatewayError::Internal(_) => ErrorCode::Internal,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
