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

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::watch;
use tracing::trace;

use crate::common::{ActorHandle, ActorId};

/// Tracks the actors of one system: id allocation, lookup by id, and the running count that
/// shutdown drains on.
#[derive(Debug)]
pub struct ActorRegistry {
    actors: DashMap<ActorId, ActorHandle>,
    next_id: AtomicU64,
    running: watch::Sender<usize>,
}

impl Default for ActorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorRegistry {
    pub fn new() -> Self {
        let (running, _) = watch::channel(0);
        Self {
            actors: DashMap::new(),
            next_id: AtomicU64::new(1),
            running,
        }
    }

    /// Allocates a fresh node-local actor id.
    pub fn next_id(&self) -> ActorId {
        ActorId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn put(&self, handle: ActorHandle) {
        trace!(actor = %handle.address(), "Registering actor");
        self.actors.insert(handle.address().id(), handle);
    }

    pub fn get(&self, id: ActorId) -> Option<ActorHandle> {
        self.actors.get(&id).map(|entry| entry.value().clone())
    }

    pub fn erase(&self, id: ActorId) -> Option<ActorHandle> {
        self.actors.remove(&id).map(|(_, handle)| handle)
    }

    /// Number of registered actors.
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn inc_running(&self) {
        self.running.send_modify(|count| *count += 1);
    }

    pub fn dec_running(&self) {
        self.running
            .send_modify(|count| *count = count.saturating_sub(1));
    }

    pub fn running_count(&self) -> usize {
        *self.running.borrow()
    }

    /// Waits until exactly `expected` actors are running.
    pub async fn await_running_count_equal(&self, expected: usize) {
        let mut watcher = self.running.subscribe();
        // The sender lives as long as `self`, so the wait only ends on a matching count.
        let _ = watcher.wait_for(|count| *count == expected).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn ids_are_unique() {
        let registry = ActorRegistry::new();
        let a = registry.next_id();
        let b = registry.next_id();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn drain_waits_for_the_last_actor() {
        let registry = Arc::new(ActorRegistry::new());
        for _ in 0..3 {
            registry.inc_running();
        }
        let waiter = tokio::spawn({
            let registry = Arc::clone(&registry);
            async move { registry.await_running_count_equal(0).await }
        });

        registry.dec_running();
        registry.dec_running();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        registry.dec_running();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("drain completes")
            .expect("waiter task");
        assert_eq!(registry.running_count(), 0);
    }
}
