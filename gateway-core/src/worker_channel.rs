//! C2: per-session duplex exchange with a worker container.
//!
//! One [`WorkerChannel`] is bound to exactly one session's attached
//! stream. It serializes every exchange behind its own mutex, since the
//! worker protocol carries no correlation id and therefore tolerates at
//! most one in-flight request at a time.

use crate::codec;
use crate::errors::{GatewayError, GatewayResult};
use crate::worker_protocol::{WorkerRequest, WorkerResponse};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::time::{self, Instant};
use tracing::debug;

/// Deadline for one full `exchange`: write the request, then wait for a
/// complete response line.
pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Read calls are bounded by this sub-timeout so the overall deadline and
/// task cancellation stay observable without a dedicated thread per session.
const POLL_SUBTIMEOUT: Duration = Duration::from_secs(1);

const READ_CHUNK: usize = 8192;

/// Anything the gateway can treat as an attached container stream.
pub trait AttachedStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> AttachedStream for T {}

struct ChannelState {
    stream: Box<dyn AttachedStream>,
    /// Raw bytes held back by the frame codec (a partial frame header or payload).
    frame_carry: Vec<u8>,
    /// Decoded text held back pending a terminating newline.
    line_carry: String,
}

pub struct WorkerChannel {
    state: Mutex<ChannelState>,
}

impl WorkerChannel {
    pub fn new(stream: Box<dyn AttachedStream>) -> Self {
        WorkerChannel {
            state: Mutex::new(ChannelState {
                stream,
                frame_carry: Vec::new(),
                line_carry: String::new(),
            }),
        }
    }

    /// Write `request` as one JSON line and wait for exactly one complete
    /// response line, parsed as a worker response. Holds the channel's
    /// lock for the entire round trip.
    pub async fn exchange(&self, request: &WorkerRequest) -> GatewayResult<WorkerResponse> {
        let started = Instant::now();
        let mut state = self.state.lock().await;

        let mut line = serde_json::to_string(request)
            .map_err(|e| GatewayError::Internal(format!("encoding worker request: {e}")))?;
        line.push('\n');
        state
            .stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| GatewayError::ContainerError(format!("writing to worker stdin: {e}")))?;

        let result = read_response(&mut state).await;
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "worker exchange completed"
        );
        result
    }
}

async fn read_response(state: &mut ChannelState) -> GatewayResult<WorkerResponse> {
    let deadline = Instant::now() + EXCHANGE_TIMEOUT;
    loop {
        if let Some(line) = take_complete_line(&mut state.line_carry) {
            return Ok(parse_response(&line));
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(GatewayError::ContainerError(
                "timed out waiting for worker response".into(),
            ));
        }

        let mut buf = [0u8; READ_CHUNK];
        match time::timeout(remaining.min(POLL_SUBTIMEOUT), state.stream.read(&mut buf)).await {
            Ok(Ok(0)) => {
                return Err(GatewayError::ContainerError(
                    "worker stream closed before a response line arrived".into(),
                ))
            }
            Ok(Ok(n)) => {
                let mut pending = std::mem::take(&mut state.frame_carry);
                pending.extend_from_slice(&buf[..n]);
                let decoded = codec::decode(&pending);
                state.frame_carry = decoded.carry;
                state.line_carry.push_str(&decoded.text);
            }
            Ok(Err(e)) => {
                return Err(GatewayError::ContainerError(format!(
                    "reading from worker stdout: {e}"
                )))
            }
            Err(_) => continue, // sub-timeout tick; re-check the overall deadline
        }
    }
}

/// Pull the first `\n`-terminated line out of `carry`, if any, leaving the
/// remainder in place.
fn take_complete_line(carry: &mut String) -> Option<String> {
    let pos = carry.find('\n')?;
    let line = carry[..pos].to_string();
    carry.drain(..=pos);
    Some(line)
}

/// Parse a response line as JSON, tolerating worker debug output ahead of
/// the protocol line by retrying from the first `{`. Never panics: an
/// unparseable line becomes a synthetic error response.
fn parse_response(line: &str) -> WorkerResponse {
    if let Ok(resp) = serde_json::from_str::<WorkerResponse>(line) {
        return resp;
    }
    if let Some(start) = line.find('{') {
        if let Ok(resp) = serde_json::from_str::<WorkerResponse>(&line[start..]) {
            return resp;
        }
    }
    WorkerResponse::synthetic_error(format!("unparseable worker response line: {line:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    /// Spawn a fake worker on the other end of a duplex pipe that replies
    /// with a fixed, already-framed response to whatever it's sent.
    fn fake_worker(framed_response: Vec<u8>) -> Box<dyn AttachedStream> {
        let (client, mut server) = duplex(4096);
        tokio::spawn(async move {
            let mut scratch = [0u8; 256];
            let _ = server.read(&mut scratch).await;
            let _ = server.write_all(&framed_response).await;
        });
        Box::new(client)
    }

    #[tokio::test]
    async fn exchange_round_trips_a_framed_ok_response() {
        let mut body =
            br#"{"status":"ok","observation":"hi","admissible_commands":["go"]}"#.to_vec();
        body.push(b'\n');
        let framed = codec::frame(1, &body);

        let channel = WorkerChannel::new(fake_worker(framed));
        let resp = channel
            .exchange(&WorkerRequest::Init {
                game_file: "/data/g/game.tw-pddl".into(),
            })
            .await
            .unwrap();
        assert!(resp.is_ok());
        assert_eq!(resp.observation.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn exchange_skips_debug_output_before_json() {
        let mut payload = b"worker booting... ".to_vec();
        payload.extend_from_slice(br#"{"status":"ok","observation":"ready","admissible_commands":[]}"#);
        payload.push(b'\n');
        let framed = codec::frame(1, &payload);

        let channel = WorkerChannel::new(fake_worker(framed));
        let resp = channel
            .exchange(&WorkerRequest::Step {
                action: "look".into(),
            })
            .await
            .unwrap();
        assert!(resp.is_ok());
        assert_eq!(resp.observation.as_deref(), Some("ready"));
    }

    #[tokio::test]
    async fn unparseable_line_becomes_synthetic_error_not_a_failure() {
        let mut payload = b"not json at all".to_vec();
        payload.push(b'\n');
        let framed = codec::frame(1, &payload);

        let channel = WorkerChannel::new(fake_worker(framed));
        let resp = channel
            .exchange(&WorkerRequest::Step {
                action: "look".into(),
            })
            .await
            .unwrap();
        assert!(!resp.is_ok());
        assert!(resp.message.unwrap().contains("unparseable"));
    }

    #[tokio::test]
    async fn stream_closed_before_a_line_is_a_container_error() {
        let (client, server) = duplex(64);
        drop(server);
        let channel = WorkerChannel::new(Box::new(client));
        let result = channel
            .exchange(&WorkerRequest::Step {
                action: "look".into(),
            })
            .await;
        assert!(matches!(result, Err(GatewayError::ContainerError(_))));
    }
}
