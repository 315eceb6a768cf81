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

//! Wire protocol for node-to-node connections.
//!
//! Every frame is length-prefixed:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ Payload Length (4 bytes, big-endian u32, excludes header)     │
//! ├───────────────────────────────────────────────────────────────┤
//! │ Protocol Version (1 byte, currently 0x01)                     │
//! ├───────────────────────────────────────────────────────────────┤
//! │ Frame Kind (1 byte)                                           │
//! │   0x01 = HELLO     (client → server, opens a handshake)       │
//! │   0x02 = WELCOME   (server → client, names the actor)         │
//! │   0x03 = REJECT    (server → client, handshake refused)       │
//! │   0x04 = DELIVER   (either way, one message for one actor)    │
//! │   0x05 = EXIT      (either way, exit request for one actor)   │
//! │   0x06 = DOWN      (either way, a watched actor has exited)   │
//! ├───────────────────────────────────────────────────────────────┤
//! │ Payload (JSON)                                                │
//! └───────────────────────────────────────────────────────────────┘
//! ```

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::NetworkError;

pub const PROTOCOL_VERSION: u8 = 0x01;

pub const FRAME_HELLO: u8 = 0x01;
pub const FRAME_WELCOME: u8 = 0x02;
pub const FRAME_REJECT: u8 = 0x03;
pub const FRAME_DELIVER: u8 = 0x04;
pub const FRAME_EXIT: u8 = 0x05;
pub const FRAME_DOWN: u8 = 0x06;

/// Header size: 4 bytes length, 1 byte version, 1 byte kind.
pub const HEADER_SIZE: usize = 6;

/// Hard upper bound on a frame payload, regardless of configuration.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// A frame as read off the wire, before its version is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub version: u8,
    pub kind: u8,
    pub payload: Vec<u8>,
}

/// Reads one frame of any protocol version.
///
/// Only the opening frame of a connection is read this way, so a peer speaking another
/// version can be told so. Payloads larger than `max_size` (or [`MAX_FRAME_SIZE`]) are
/// refused before allocation.
pub async fn read_raw_frame<R>(reader: &mut R, max_size: usize) -> Result<RawFrame, NetworkError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header).await?;

    let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let version = header[4];
    let kind = header[5];

    if !matches!(
        kind,
        FRAME_HELLO | FRAME_WELCOME | FRAME_REJECT | FRAME_DELIVER | FRAME_EXIT | FRAME_DOWN
    ) {
        return Err(NetworkError::Protocol(format!(
            "Unknown frame kind: {kind:#04x}"
        )));
    }
    let limit = max_size.min(MAX_FRAME_SIZE);
    if length > limit {
        return Err(NetworkError::Protocol(format!(
            "Frame size {length} exceeds maximum {limit}"
        )));
    }

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;
    Ok(RawFrame {
        version,
        kind,
        payload,
    })
}

/// Reads one frame of the current protocol version, returning its kind and payload.
pub async fn read_frame<R>(reader: &mut R, max_size: usize) -> Result<(u8, Vec<u8>), NetworkError>
where
    R: AsyncRead + Unpin,
{
    let frame = read_raw_frame(reader, max_size).await?;
    if frame.version != PROTOCOL_VERSION {
        return Err(NetworkError::Protocol(format!(
            "Unsupported protocol version: {}, expected {PROTOCOL_VERSION}",
            frame.version
        )));
    }
    Ok((frame.kind, frame.payload))
}

pub async fn write_frame<W>(writer: &mut W, kind: u8, payload: &[u8]) -> Result<(), NetworkError>
where
    W: AsyncWrite + Unpin,
{
    let length: u32 = payload
        .len()
        .try_into()
        .map_err(|_| NetworkError::Protocol("Payload too large for u32".to_string()))?;

    let mut header = [0u8; HEADER_SIZE];
    header[..4].copy_from_slice(&length.to_be_bytes());
    header[4] = PROTOCOL_VERSION;
    header[5] = kind;

    writer.write_all(&header).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, NetworkError> {
    Ok(serde_json::to_vec(value)?)
}

pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, NetworkError> {
    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[tokio::test]
    async fn frames_carry_kind_and_payload() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, FRAME_DELIVER, b"{\"x\":1}")
            .await
            .expect("write");
        assert_eq!(buffer.len(), HEADER_SIZE + 7);
        assert_eq!(&buffer[..4], &7u32.to_be_bytes());
        assert_eq!(buffer[4], PROTOCOL_VERSION);

        let (kind, payload) = read_frame(&mut Cursor::new(buffer), MAX_FRAME_SIZE)
            .await
            .expect("read");
        assert_eq!(kind, FRAME_DELIVER);
        assert_eq!(payload, b"{\"x\":1}");
    }

    #[tokio::test]
    async fn oversized_frames_are_refused() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, FRAME_DELIVER, &[0u8; 64]).await.expect("write");
        let result = read_frame(&mut Cursor::new(buffer), 16).await;
        assert!(matches!(result, Err(NetworkError::Protocol(_))));
    }

    #[tokio::test]
    async fn wrong_version_and_unknown_kind_are_protocol_errors() {
        let mut header = [0u8; HEADER_SIZE];
        header[4] = PROTOCOL_VERSION + 1;
        header[5] = FRAME_HELLO;
        let result = read_frame(&mut Cursor::new(header.to_vec()), MAX_FRAME_SIZE).await;
        assert!(matches!(result, Err(NetworkError::Protocol(_))));

        header[4] = PROTOCOL_VERSION;
        header[5] = 0x7f;
        let result = read_frame(&mut Cursor::new(header.to_vec()), MAX_FRAME_SIZE).await;
        assert!(matches!(result, Err(NetworkError::Protocol(_))));
    }

    #[tokio::test]
    async fn opening_frame_of_another_version_is_still_readable() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, FRAME_HELLO, b"{}").await.expect("write");
        buffer[4] = PROTOCOL_VERSION + 1;

        let frame = read_raw_frame(&mut Cursor::new(buffer), MAX_FRAME_SIZE)
            .await
            .expect("read");
        assert_eq!(frame.version, PROTOCOL_VERSION + 1);
        assert_eq!(frame.kind, FRAME_HELLO);
        assert_eq!(frame.payload, b"{}");
    }

    #[tokio::test]
    async fn truncated_stream_reads_as_closed_connection() {
        let result = read_frame(&mut Cursor::new(vec![0u8, 0]), MAX_FRAME_SIZE).await;
        assert_eq!(result, Err(NetworkError::ConnectionClosed));
    }
}
