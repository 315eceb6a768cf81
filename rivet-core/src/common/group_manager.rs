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

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::common::ActorHandle;
use crate::traits::RivetMessage;

/// Named groups of actors.
#[derive(Debug, Default)]
pub struct GroupManager {
    groups: DashMap<String, Arc<Group>>,
}

impl GroupManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the group called `name`, creating it if needed.
    pub fn get(&self, name: &str) -> Arc<Group> {
        if let Some(group) = self.groups.get(name) {
            return Arc::clone(group.value());
        }
        Arc::clone(
            self.groups
                .entry(name.to_string())
                .or_insert_with(|| {
                    debug!(group = name, "Creating group");
                    Arc::new(Group::new(name.to_string()))
                })
                .value(),
        )
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.get(name).map(|group| Arc::clone(group.value()))
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.remove(name).map(|(_, group)| group)
    }
}

/// A named set of actors that can be messaged together.
#[derive(Debug)]
pub struct Group {
    name: String,
    members: DashMap<ActorHandle, ()>,
}

impl Group {
    fn new(name: String) -> Self {
        Self {
            name,
            members: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds `member`; returns `false` if it was already present.
    pub fn join(&self, member: &ActorHandle) -> bool {
        self.members.insert(member.clone(), ()).is_none()
    }

    pub fn leave(&self, member: &ActorHandle) -> bool {
        self.members.remove(member).is_some()
    }

    pub fn members(&self) -> Vec<ActorHandle> {
        self.members.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sends one shared copy of `message` to every member.
    ///
    /// Members receive the payload in shared mode: a handler that mutates it works on its own
    /// copy and the others keep seeing the original.
    pub async fn broadcast(&self, sender: &ActorHandle, message: impl RivetMessage + 'static) {
        let message: Arc<dyn RivetMessage> = Arc::new(message);
        let members = self.members();
        trace!(group = %self.name, members = members.len(), "Broadcasting");
        for member in members {
            sender.create_envelope(Some(member.reply_address())).send_arc(Arc::clone(&message)).await;
        }
    }
}
