/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::fmt;

use crate::common::SchedulerError;

/// Errors reported by publishing, resolving and the transport beneath them.
///
/// Every variant is reported per call. None of them leave cached state behind, so a
/// failed operation can simply be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The requested listen address is already bound.
    AddressInUse { host: String, port: u16 },
    /// The actor to publish has already exited.
    ActorExited,
    /// No network manager is available (the scheduler could not be started or was stopped).
    NoNetworkManager,
    /// Nothing is published on this port.
    NotPublished { port: u16 },
    /// Nothing is listening at the remote endpoint.
    ConnectionRefused { host: String, port: u16 },
    /// Connecting or handshaking took longer than configured.
    Timeout { host: String, port: u16 },
    /// The remote node refused the handshake.
    HandshakeRejected(String),
    /// The remote node listens on the endpoint but no longer serves an actor there.
    NoSuchActor { host: String, port: u16 },
    /// Message type not registered in the type registry.
    UnknownMessageType(String),
    /// Serialization or deserialization failure.
    Serialization(String),
    /// Protocol error (invalid frame, unsupported version, etc.).
    Protocol(String),
    /// Connection was closed unexpectedly.
    ConnectionClosed,
    /// Socket or I/O error.
    Io(String),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressInUse { host, port } => write!(f, "Address already in use: {host}:{port}"),
            Self::ActorExited => write!(f, "Actor has already exited"),
            Self::NoNetworkManager => write!(f, "No network manager available"),
            Self::NotPublished { port } => write!(f, "Nothing published on port {port}"),
            Self::ConnectionRefused { host, port } => {
                write!(f, "Connection refused: {host}:{port}")
            }
            Self::Timeout { host, port } => write!(f, "Timed out connecting to {host}:{port}"),
            Self::HandshakeRejected(reason) => write!(f, "Handshake rejected: {reason}"),
            Self::NoSuchActor { host, port } => write!(f, "No actor published at {host}:{port}"),
            Self::UnknownMessageType(t) => write!(f, "Unknown message type: {t}"),
            Self::Serialization(e) => write!(f, "Serialization error: {e}"),
            Self::Protocol(e) => write!(f, "Protocol error: {e}"),
            Self::ConnectionClosed => write!(f, "Connection closed"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for NetworkError {}

impl From<serde_json::Error> for NetworkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::ConnectionClosed
        } else {
            Self::Io(err.to_string())
        }
    }
}

impl From<SchedulerError> for NetworkError {
    fn from(_: SchedulerError) -> Self {
        Self::NoNetworkManager
    }
}
