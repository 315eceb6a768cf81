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

use acton_ern::Ern;
use derive_new::new;

/// Creation-time settings for a [`ManagedActor`](crate::actor::ManagedActor).
#[derive(new, Clone, Debug)]
pub struct ActorConfig {
    id: Ern,
    #[new(default)]
    inbox_capacity: Option<usize>,
}

impl ActorConfig {
    /// Overrides the configured `limits.actor_inbox_capacity` for this actor only.
    #[must_use]
    pub fn with_inbox_capacity(mut self, capacity: usize) -> Self {
        self.inbox_capacity = Some(capacity.max(1));
        self
    }

    #[inline]
    pub const fn id(&self) -> &Ern {
        &self.id
    }

    #[inline]
    pub const fn inbox_capacity(&self) -> Option<usize> {
        self.inbox_capacity
    }
}
