//! The shipped `ContainerRuntime`: talks to a local Docker-compatible
//! engine.
//!
//! `run` and `kill` go through `bollard`, which already gives us a
//! well-typed lifecycle API. `attach` deliberately does **not** use
//! bollard's attach helper: that helper demultiplexes the stdout/stderr
//! framing internally and would hand us already-decoded text, hiding the
//! very framing logic this crate is built to own end-to-end. Instead we
//! open the attach endpoint ourselves as a raw Unix domain socket HTTP
//! request and hand the live socket to the Framed Stream Codec.

use super::{BindMount, ContainerHandle, ContainerRuntime, ContainerSpec};
use crate::errors::{GatewayError, GatewayResult};
use crate::worker_channel::AttachedStream;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::models::HostConfig;
use bollard::Docker;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

const SESSION_LABEL: &str = "textgame-gateway.session-id";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";
const API_VERSION: &str = "v1.43";

pub struct DockerRuntime {
    docker: Docker,
    socket_path: String,
}

impl DockerRuntime {
    /// Connect to the local Docker daemon over its default Unix socket.
    pub fn connect() -> GatewayResult<Self> {
        Self::connect_with_socket(DOCKER_SOCKET)
    }

    pub fn connect_with_socket(socket_path: &str) -> GatewayResult<Self> {
        let docker = Docker::connect_with_local_defaults().map_err(map_bollard_err)?;
        Ok(DockerRuntime {
            docker,
            socket_path: socket_path.to_string(),
        })
    }
}

fn map_bollard_err(err: BollardError) -> GatewayError {
    GatewayError::ContainerError(err.to_string())
}

fn to_bind_string(mount: &BindMount) -> String {
    let mut bind = format!("{}:{}", mount.host_path, mount.container_path);
    if mount.read_only {
        bind.push_str(":ro");
    }
    bind
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn run(&self, spec: ContainerSpec) -> GatewayResult<ContainerHandle> {
        let binds: Vec<String> = spec.mounts.iter().map(to_bind_string).collect();
        let host_config = HostConfig {
            binds: Some(binds),
            auto_remove: Some(true),
            ..Default::default()
        };

        let mut labels = std::collections::HashMap::new();
        labels.insert(SESSION_LABEL.to_string(), spec.session_id.clone());

        let config = Config {
            image: Some(spec.image.clone()),
            cmd: Some(spec.command.clone()),
            open_stdin: Some(true),
            stdin_once: Some(false),
            tty: Some(false),
            labels: Some(labels),
            host_config: Some(host_config),
            ..Default::default()
        };

        let name = format!("textgame-worker-{}", spec.session_id);
        let created = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.as_str(),
                    platform: None,
                }),
                config,
            )
            .await
            .map_err(map_bollard_err)?;

        self.docker
            .start_container::<String>(&created.id, None)
            .await
            .map_err(map_bollard_err)?;

        Ok(ContainerHandle { id: created.id })
    }

    async fn attach(&self, handle: &ContainerHandle) -> GatewayResult<Box<dyn AttachedStream>> {
        let stream = attach_raw(&self.socket_path, &handle.id).await?;
        Ok(Box::new(stream))
    }

    async fn kill(&self, handle: &ContainerHandle) -> GatewayResult<()> {
        let stop_result = self
            .docker
            .stop_container(&handle.id, Some(StopContainerOptions { t: 5 }))
            .await;
        if let Err(BollardError::DockerResponseServerError {
            status_code: 404, ..
        }) = stop_result
        {
            // already gone; fall through to remove, which is also tolerant.
        } else {
            stop_result.map_err(map_bollard_err)?;
        }

        let remove_result = self
            .docker
            .remove_container(
                &handle.id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await;
        match remove_result {
            Ok(()) => Ok(()),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(()),
            Err(e) => Err(map_bollard_err(e)),
        }
    }
}

/// Open the container's attach endpoint as a raw hijacked HTTP/1.1
/// connection over the daemon's Unix socket, consuming the response
/// headers and leaving the socket positioned at the start of the
/// multiplexed stream body.
async fn attach_raw(socket_path: &str, container_id: &str) -> GatewayResult<UnixStream> {
    let mut stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| GatewayError::ContainerError(format!("connecting to docker socket: {e}")))?;

    let path = format!(
        "/{API_VERSION}/containers/{container_id}/attach?stream=1&stdin=1&stdout=1&stderr=0"
    );
    let request = format!(
        "POST {path} HTTP/1.1\r\n\
         Host: docker\r\n\
         Connection: Upgrade\r\n\
         Upgrade: tcp\r\n\
         Content-Length: 0\r\n\
         \r\n"
    );

    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| GatewayError::ContainerError(format!("sending attach request: {e}")))?;

    consume_http_headers(&mut stream).await?;
    Ok(stream)
}

/// Read and discard bytes up through the blank line that terminates the
/// HTTP response headers, leaving any bytes read past it unused (the
/// attach endpoint does not pipeline stream data ahead of the header
/// terminator in practice, so a one-byte-at-a-time scan is sufficient and
/// keeps us from having to buffer-and-replay body bytes).
async fn consume_http_headers(stream: &mut UnixStream) -> GatewayResult<()> {
    let mut window = [0u8; 4];
    loop {
        let mut byte = [0u8; 1];
        let n = stream
            .read(&mut byte)
            .await
            .map_err(|e| GatewayError::ContainerError(format!("reading attach response: {e}")))?;
        if n == 0 {
            return Err(GatewayError::ContainerError(
                "docker closed the attach connection before sending headers".into(),
            ));
        }
        window.rotate_left(1);
        window[3] = byte[0];
        if &window == b"\r\n\r\n" {
            return Ok(());
        }
    }
}
