//! Server-sent-event decoding for the realtime database streaming REST API.
//!
//! The database delivers change notifications as `text/event-stream` frames:
//! `put` and `patch` carry a JSON payload with the changed subpath and the new
//! data, `keep-alive` is a heartbeat, and `cancel`/`auth_revoked` mean the
//! server is about to drop the stream.

use serde::Deserialize;
use serde_json::Value;

/// One complete `event:`/`data:` group from the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental frame parser. Chunks from the transport may split lines and
/// frames at arbitrary byte boundaries; feed them in order and collect
/// whatever frames have completed.
#[derive(Debug, Default)]
pub struct SseParser {
    buf: Vec<u8>,
    event: String,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                // Blank line terminates the frame.
                if !self.event.is_empty() || !self.data.is_empty() {
                    frames.push(SseFrame {
                        event: std::mem::take(&mut self.event),
                        data: std::mem::take(&mut self.data).join("\n"),
                    });
                }
            } else if let Some(rest) = line.strip_prefix("event:") {
                self.event = rest.trim_start().to_string();
            } else if let Some(rest) = line.strip_prefix("data:") {
                self.data.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
            }
            // Comment lines (leading ':') and unknown fields are ignored.
        }
        frames
    }
}

/// A decoded store notification.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// New value of the watched node. `None` when the node is absent, null,
    /// or not a boolean.
    Flag(Option<bool>),
    KeepAlive,
    /// The server is closing the stream (listen cancelled or credentials
    /// revoked).
    Closed(String),
}

#[derive(Debug, Deserialize)]
struct ChangePayload {
    path: String,
    data: Value,
}

/// Maps a raw frame to a store notification. Unknown event types yield `None`.
pub fn decode_frame(frame: &SseFrame) -> Option<StoreEvent> {
    match frame.event.as_str() {
        "put" | "patch" => {
            let payload: ChangePayload = serde_json::from_str(&frame.data).ok()?;
            // Changes below the watched node can't happen for a boolean leaf;
            // only the root path carries the flag itself.
            if payload.path != "/" {
                return None;
            }
            Some(StoreEvent::Flag(payload.data.as_bool()))
        }
        "keep-alive" => Some(StoreEvent::KeepAlive),
        "cancel" | "auth_revoked" => Some(StoreEvent::Closed(frame.event.clone())),
        _ => None,
    }
}
