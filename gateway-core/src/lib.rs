//! Session/worker coordination layer for the text-game container
//! gateway: the framed attach-stream codec, the per-session worker
//! channel, the session registry and admission control, the idle
//! reaper, and the batch coordinator.
//!
//! The HTTP facade and the binary entry point live in `gateway-server`;
//! this crate has no dependency on an HTTP framework.

pub mod batch;
pub mod codec;
pub mod config;
pub mod container;
pub mod errors;
pub mod gamefiles;
pub mod reaper;
pub mod registry;
pub mod session;
pub mod task_type;
pub mod worker_channel;
pub mod worker_protocol;

pub use batch::{BatchCoordinator, StepOutcome};
pub use config::GatewayConfig;
pub use errors::{ErrorCode, GatewayError, GatewayResult};
pub use reaper::IdleReaper;
pub use registry::{RandomSource, SessionRegistry, ThreadRng};
pub use session::{SessionStatus, SessionView};
pub use task_type::TaskType;
