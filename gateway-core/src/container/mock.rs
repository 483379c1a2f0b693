//! An in-memory `ContainerRuntime` backed by a scripted worker, for tests
//! that must run without a live container daemon.

use super::{ContainerHandle, ContainerRuntime, ContainerSpec};
use crate::codec;
use crate::errors::{GatewayError, GatewayResult};
use crate::worker_channel::AttachedStream;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::Mutex;

/// A container runtime whose "containers" are background tasks replying
/// with a fixed sequence of JSON lines, framed exactly like a real
/// attach stream. The last scripted line repeats for any request beyond
/// the script's length.
pub struct MockRuntime {
    script: Vec<String>,
    pending: Mutex<HashMap<String, DuplexStream>>,
}

impl MockRuntime {
    pub fn new(script: Vec<String>) -> Self {
        MockRuntime {
            script,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Convenience constructor for the common case: always answer `ok`
    /// with the given observation and commands.
    pub fn always_ok(observation: &str, admissible_commands: &[&str]) -> Self {
        let commands: Vec<String> = admissible_commands.iter().map(|s| s.to_string()).collect();
        let line = serde_json::json!({
            "status": "ok",
            "observation": observation,
            "admissible_commands": commands,
            "score": 0.0,
            "done": false,
            "won": false,
        })
        .to_string();
        MockRuntime::new(vec![line])
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn run(&self, spec: ContainerSpec) -> GatewayResult<ContainerHandle> {
        let id = format!("mock-{}-{}", spec.session_id, uuid::Uuid::new_v4());
        let (gateway_side, worker_side) = duplex(8192);
        tokio::spawn(run_scripted_worker(worker_side, self.script.clone()));

        let mut pending = self.pending.lock().await;
        pending.insert(id.clone(), gateway_side);
        Ok(ContainerHandle { id })
    }

    async fn attach(&self, handle: &ContainerHandle) -> GatewayResult<Box<dyn AttachedStream>> {
        let mut pending = self.pending.lock().await;
        let stream = pending
            .remove(&handle.id)
            .ok_or_else(|| GatewayError::ContainerError(format!("no pending mock container {}", handle.id)))?;
        Ok(Box::new(stream))
    }

    async fn kill(&self, handle: &ContainerHandle) -> GatewayResult<()> {
        let mut pending = self.pending.lock().await;
        pending.remove(&handle.id);
        Ok(())
    }
}

async fn run_scripted_worker(mut socket: DuplexStream, script: Vec<String>) {
    let mut idx = 0usize;
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }

        while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            buf.drain(..=pos);
            let response = script
                .get(idx)
                .or_else(|| script.last())
                .cloned()
                .unwrap_or_else(|| r#"{"status":"ok"}"#.to_string());
            idx += 1;

            let mut payload = response.into_bytes();
            payload.push(b'\n');
            let framed = codec::frame(1, &payload);
            if socket.write_all(&framed).await.is_err() {
                return;
            }
        }
    }
}
