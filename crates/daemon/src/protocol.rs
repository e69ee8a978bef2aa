// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane protocol for daemon communication.
//!
//! Wire format: one bare JSON value per direction per connection. The
//! reader accumulates bytes and retries a full-value parse until it
//! succeeds, the peer closes, the size cap trips, or the connection
//! deadline (enforced by the listener) expires.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Maximum message size (1 MiB)
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Deadline applied to a whole connection
pub const CONNECTION_DEADLINE: std::time::Duration = std::time::Duration::from_secs(30);

/// Command from CLI to daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Command {
    /// Command type, checked against the allow-list
    #[serde(rename = "type")]
    pub kind: String,
    /// Raw arguments; each handler extracts and type-checks its own
    #[serde(default)]
    pub args: serde_json::Map<String, Value>,
}

/// Response from daemon to CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn ok_with(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Malformed(serde_json::Error),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("connection closed")]
    ConnectionClosed,
}

/// Read one JSON command from an async reader.
///
/// Bytes are accumulated until they parse as a complete value. A clean
/// close before any bytes is `ConnectionClosed`; a close mid-value or
/// bytes that can never parse is `Malformed` (the listener closes such
/// connections without a response).
pub async fn read_command<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Command, ProtocolError> {
    let mut buf: Vec<u8> = Vec::with_capacity(1024);
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            if buf.is_empty() {
                return Err(ProtocolError::ConnectionClosed);
            }
            // Peer finished writing: the buffer must be a complete value now.
            return serde_json::from_slice(&buf).map_err(ProtocolError::Malformed);
        }

        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: buf.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        match serde_json::from_slice(&buf) {
            Ok(command) => return Ok(command),
            // Incomplete value: keep reading. Anything else is garbage.
            Err(e) if e.is_eof() => continue,
            Err(e) => return Err(ProtocolError::Malformed(e)),
        }
    }
}

/// Write one JSON response to an async writer.
pub async fn write_response<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    response: &Response,
) -> Result<(), ProtocolError> {
    let data = serde_json::to_vec(response).map_err(ProtocolError::Malformed)?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
