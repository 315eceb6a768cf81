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

use derive_new::new;
use mti::prelude::*;
use serde::{Deserialize, Serialize};

/// Identifies the process hosting an actor system.
///
/// Each [`ActorSystem`](crate::common::ActorSystem) draws a fresh id on launch, so two
/// systems inside one process are distinct nodes too.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub(crate) fn generate() -> Self {
        let id = "node".create_type_id::<V7>();
        Self(format!("{}@{}", id, std::process::id()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Node-local actor number, allocated by the [`ActorRegistry`](crate::common::ActorRegistry).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub(crate) u64);

impl ActorId {
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The location-independent identity of an actor: its node plus its node-local id.
///
/// Handles compare equal exactly when their addresses do, whether they are local
/// handles or proxies.
#[derive(new, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorAddress {
    pub(crate) node: NodeId,
    pub(crate) id: ActorId,
}

impl ActorAddress {
    pub const fn node(&self) -> &NodeId {
        &self.node
    }

    pub const fn id(&self) -> ActorId {
        self.id
    }
}

impl fmt::Display for ActorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.node, self.id)
    }
}
