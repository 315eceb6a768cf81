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

//! Frame payloads exchanged between nodes.

use serde::{Deserialize, Serialize};

use crate::common::{ActorAddress, ActorId, NodeId};
use crate::message::ExitReason;

/// Opens a handshake; sent by the connecting node. The frame header carries its version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    pub node: NodeId,
}

/// Accepts a handshake and names the actor published on the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Welcome {
    pub node: NodeId,
    pub actor: ActorAddress,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NoSuchActor,
    ActorExited,
    VersionMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reject {
    pub reason: RejectReason,
}

/// One message for one actor on the receiving node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliver {
    /// Sender, so the receiver can reply through a proxy.
    pub from: ActorAddress,
    pub from_name: String,
    pub to: ActorId,
    pub type_name: String,
    pub payload: serde_json::Value,
}

/// An exit request for one actor on the receiving node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitNotice {
    pub from: ActorAddress,
    pub to: ActorId,
    pub reason: ExitReason,
}

/// Tells a peer that an actor it may hold a proxy for has exited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownNotice {
    pub actor: ActorAddress,
}

/// A frame queued for a connection's writer task.
#[derive(Debug, Clone)]
pub(crate) struct OutboundFrame {
    pub kind: u8,
    pub payload: Vec<u8>,
}
