//! The `ContainerRuntime` trait: the only surface the coordination layer
//! needs from a container engine.

pub mod docker;
pub mod mock;

use crate::errors::GatewayResult;
use crate::worker_channel::AttachedStream;
use async_trait::async_trait;

/// Opaque reference to a started container, sufficient to attach to or
/// kill it later. Retained on the session even after the container has
/// exited, until the session itself is removed.
#[derive(Debug, Clone)]
pub struct ContainerHandle {
    pub id: String,
}

/// One read-only (by convention; see `read_only`) bind mount to apply
/// when starting a worker container.
#[derive(Debug, Clone)]
pub struct BindMount {
    pub host_path: String,
    pub container_path: String,
    pub read_only: bool,
}

/// Everything needed to start one worker container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub image: String,
    pub command: Vec<String>,
    /// Attached as a label for external observability.
    pub session_id: String,
    pub mounts: Vec<BindMount>,
}

/// The three operations the session registry needs from a container
/// engine. Kept intentionally narrow so the coordination layer never
/// depends on a concrete engine's client type.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Start a detached container running `spec.command`, stdin held
    /// open, auto-removed on exit.
    async fn run(&self, spec: ContainerSpec) -> GatewayResult<ContainerHandle>;

    /// Open a duplex byte stream to the container's stdin/stdout. The
    /// returned stream carries the engine's native framing, if any; the
    /// caller (the Framed Stream Codec) owns decoding it.
    async fn attach(&self, handle: &ContainerHandle) -> GatewayResult<Box<dyn AttachedStream>>;

    /// Stop and remove the container. Must tolerate a container that is
    /// already gone.
    async fn kill(&self, handle: &ContainerHandle) -> GatewayResult<()>;
}
