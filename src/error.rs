// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for the VNC client library.

use std::io;
use thiserror::Error;

/// Result type for VNC operations.
pub type Result<T> = std::result::Result<T, VncError>;

/// Errors that can occur in VNC client operations.
#[derive(Debug, Error)]
pub enum VncError {
    /// I/O error occurred (includes read/write timeouts).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server sent a protocol version banner this client does not speak.
    /// The message carries the received banner bytes.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(String),

    /// The server rejected the connection during security negotiation.
    /// The message carries the server-supplied reason.
    #[error("security handshake rejected: {0}")]
    HandshakeRejected(String),

    /// VNC authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The server violated the RFB wire protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A rectangle payload could not be decoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// An operation was called in the wrong session state or with bad arguments.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,
}
