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

use std::hash::{Hash, Hasher};

use acton_ern::Ern;
use derive_new::new;

use crate::common::{ActorAddress, ActorSender};

/// The routable address of an actor.
///
/// For a local actor the `outbox` feeds its inbox directly. For a remote actor it feeds the
/// proxy forwarder that serializes messages onto the connection to the owning node.
/// Equality and hashing use the [`ActorAddress`] only.
#[derive(new, Clone, Debug)]
pub struct MessageAddress {
    pub(crate) address: ActorAddress,
    pub(crate) name: Ern,
    pub(crate) outbox: ActorSender,
}

impl MessageAddress {
    /// Returns the node-qualified actor address.
    #[inline]
    pub const fn address(&self) -> &ActorAddress {
        &self.address
    }

    /// Returns the display name of the addressed actor.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.root.as_str()
    }

    /// Returns `true` once the addressed inbox no longer accepts messages.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.outbox.is_closed()
    }
}

impl PartialEq for MessageAddress {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for MessageAddress {}

impl Hash for MessageAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}
