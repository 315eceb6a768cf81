//! The runtime context owning exactly one instance of each subsystem.
//!
//! Every subsystem lives in a [`SingletonCell`]: an atomically published slot that is filled
//! at most once by a construct-then-compare-and-swap race and emptied only by
//! [`Singletons::shutdown`]. The passive kinds (registries, name maps, the empty sentinel)
//! are created lazily on first access. The scheduler and network manager are created as a
//! pair, either by an explicit [`Singletons::install_scheduler`] or by bootstrapping defaults
//! the first time either is requested.

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
use std::sync::atomic::{fence, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use tracing::{debug, info, instrument, trace, warn};

use crate::common::config::RivetConfig;
use crate::common::net::{NetworkError, NetworkManager};
use crate::common::scoped_actor::ScopedContext;
use crate::common::{
    ActorId, ActorRegistry, DecoratedNamesMap, ExitError, GroupManager, NodeId, Scheduler,
    SchedulerError, SchedulerRef, ShutdownError, ThreadPoolScheduler, TypeRegistry,
};
use crate::message::{EmptyMessage, ExitReason};

/// Upper bound on bootstrap retries when racing other installers or a concurrent shutdown.
const BOOTSTRAP_ATTEMPTS: usize = 64;

/// A slot holding at most one shared instance of `T`.
///
/// Readers never observe a partially built value: candidates are fully constructed before the
/// single-winner compare-and-swap publishes them. Losers drop their candidate and adopt the
/// winner.
pub struct SingletonCell<T> {
    slot: ArcSwapOption<T>,
}

impl<T> Default for SingletonCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SingletonCell<T> {
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
        }
    }

    /// Returns the published instance, if any.
    #[inline]
    pub fn load(&self) -> Option<Arc<T>> {
        self.slot.load_full()
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.slot.load().is_some()
    }

    /// Returns the published instance, constructing and publishing one with `make` if the
    /// slot is empty.
    ///
    /// `make` runs at most once per call, and only while the slot looks empty. When several
    /// callers race, all of them return the same instance.
    pub fn get_or_create(&self, make: impl FnOnce() -> T) -> Arc<T> {
        if let Some(existing) = self.load() {
            return existing;
        }
        match self.try_install(Arc::new(make())) {
            Ok(published) => published,
            Err(winner) => {
                trace!("lost singleton construction race; adopting winner");
                winner
            }
        }
    }

    /// Publishes `candidate` if the slot is empty.
    ///
    /// Returns `Ok(candidate)` when it won, or `Err(existing)` with the instance that was
    /// already published. The losing candidate is dropped by the caller.
    pub fn try_install(&self, candidate: Arc<T>) -> Result<Arc<T>, Arc<T>> {
        let empty: Option<Arc<T>> = None;
        let previous = self
            .slot
            .compare_and_swap(&empty, Some(Arc::clone(&candidate)));
        match &*previous {
            None => Ok(candidate),
            Some(existing) => Err(Arc::clone(existing)),
        }
    }

    /// Empties the slot, returning what it held.
    pub fn take(&self) -> Option<Arc<T>> {
        self.slot.swap(None)
    }
}

impl<T> fmt::Debug for SingletonCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonCell")
            .field("set", &self.is_set())
            .finish()
    }
}

/// The kinds of subsystem owned by [`Singletons`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SingletonKind {
    ActorRegistry,
    GroupManager,
    TypeRegistry,
    Scheduler,
    NetworkManager,
    DecoratedNamesMap,
    EmptyMessage,
}

impl SingletonKind {
    pub const ALL: [Self; 7] = [
        Self::ActorRegistry,
        Self::GroupManager,
        Self::TypeRegistry,
        Self::Scheduler,
        Self::NetworkManager,
        Self::DecoratedNamesMap,
        Self::EmptyMessage,
    ];
}

impl fmt::Display for SingletonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ActorRegistry => "actor_registry",
            Self::GroupManager => "group_manager",
            Self::TypeRegistry => "type_registry",
            Self::Scheduler => "scheduler",
            Self::NetworkManager => "network_manager",
            Self::DecoratedNamesMap => "decorated_names",
            Self::EmptyMessage => "empty_message",
        };
        f.write_str(name)
    }
}

/// The runtime context of one actor system.
///
/// Owned through an `Arc` by the [`ActorSystem`](crate::common::ActorSystem) and every
/// subsystem that needs to reach its siblings.
pub struct Singletons {
    node: NodeId,
    config: RivetConfig,
    actor_registry: SingletonCell<ActorRegistry>,
    group_manager: SingletonCell<GroupManager>,
    type_registry: SingletonCell<TypeRegistry>,
    decorated_names: SingletonCell<DecoratedNamesMap>,
    empty_message: SingletonCell<EmptyMessage>,
    scheduler: SingletonCell<Box<dyn Scheduler>>,
    network_manager: SingletonCell<NetworkManager>,
    scopes: DashMap<ActorId, Weak<ScopedContext>>,
}

impl Singletons {
    pub fn new(config: RivetConfig) -> Arc<Self> {
        let node = NodeId::generate();
        debug!(node = %node, "Creating runtime context");
        Arc::new(Self {
            node,
            config,
            actor_registry: SingletonCell::new(),
            group_manager: SingletonCell::new(),
            type_registry: SingletonCell::new(),
            decorated_names: SingletonCell::new(),
            empty_message: SingletonCell::new(),
            scheduler: SingletonCell::new(),
            network_manager: SingletonCell::new(),
            scopes: DashMap::new(),
        })
    }

    pub const fn node(&self) -> &NodeId {
        &self.node
    }

    pub const fn config(&self) -> &RivetConfig {
        &self.config
    }

    pub fn actor_registry(&self) -> Arc<ActorRegistry> {
        self.actor_registry.get_or_create(ActorRegistry::new)
    }

    pub fn group_manager(&self) -> Arc<GroupManager> {
        self.group_manager.get_or_create(GroupManager::new)
    }

    pub fn type_registry(&self) -> Arc<TypeRegistry> {
        self.type_registry
            .get_or_create(|| TypeRegistry::new(self.decorated_names()))
    }

    pub fn decorated_names(&self) -> Arc<DecoratedNamesMap> {
        self.decorated_names.get_or_create(DecoratedNamesMap::new)
    }

    /// The shared empty-message sentinel.
    ///
    /// Shutdown releases the context's reference; the value itself lives until the last
    /// holder drops it.
    pub fn empty_message(&self) -> Arc<EmptyMessage> {
        self.empty_message.get_or_create(EmptyMessage::default)
    }

    /// Returns the installed scheduler, installing the default one if none is.
    pub fn scheduler(self: &Arc<Self>) -> Result<SchedulerRef, SchedulerError> {
        for _ in 0..BOOTSTRAP_ATTEMPTS {
            if let Some(scheduler) = self.scheduler.load() {
                return Ok(scheduler);
            }
            self.install_default_scheduler();
        }
        warn!("Scheduler bootstrap did not converge");
        Err(SchedulerError::NotStarted)
    }

    /// Installs `scheduler` as this system's scheduler and brings up the network manager on it.
    ///
    /// Succeeds at most once. On a second call the supplied scheduler is dropped unstarted,
    /// the installed one is left untouched, and `false` is returned.
    #[instrument(skip(self, scheduler), fields(node = %self.node))]
    pub fn install_scheduler(self: &Arc<Self>, scheduler: Box<dyn Scheduler>) -> bool {
        let scheduler = match self.scheduler.try_install(Arc::new(scheduler)) {
            Ok(installed) => installed,
            Err(_) => {
                debug!("Scheduler already installed; discarding candidate");
                return false;
            }
        };
        scheduler.start();
        info!(scheduler = ?scheduler, "Scheduler installed");
        self.attach_network_manager(scheduler);
        true
    }

    /// Returns the network manager, bootstrapping the default scheduler pair if needed.
    pub fn network_manager(self: &Arc<Self>) -> Result<Arc<NetworkManager>, NetworkError> {
        for _ in 0..BOOTSTRAP_ATTEMPTS {
            if let Some(manager) = self.network_manager.load() {
                return Ok(manager);
            }
            match self.scheduler.load() {
                // An installer is between its two claims, or a shutdown removed only the
                // manager so far. Either way the pair completes with one manager.
                Some(scheduler) => {
                    self.attach_network_manager(scheduler);
                }
                None => {
                    self.install_default_scheduler();
                }
            }
        }
        warn!("Network manager bootstrap did not converge");
        Err(NetworkError::NoNetworkManager)
    }

    /// Reports whether `kind` currently has a published instance.
    pub fn is_initialized(&self, kind: SingletonKind) -> bool {
        match kind {
            SingletonKind::ActorRegistry => self.actor_registry.is_set(),
            SingletonKind::GroupManager => self.group_manager.is_set(),
            SingletonKind::TypeRegistry => self.type_registry.is_set(),
            SingletonKind::Scheduler => self.scheduler.is_set(),
            SingletonKind::NetworkManager => self.network_manager.is_set(),
            SingletonKind::DecoratedNamesMap => self.decorated_names.is_set(),
            SingletonKind::EmptyMessage => self.empty_message.is_set(),
        }
    }

    /// Creates the instance of `kind` if it does not exist yet.
    ///
    /// Returns `false` only when the scheduler pair could not be bootstrapped.
    pub fn ensure(self: &Arc<Self>, kind: SingletonKind) -> bool {
        match kind {
            SingletonKind::ActorRegistry => drop(self.actor_registry()),
            SingletonKind::GroupManager => drop(self.group_manager()),
            SingletonKind::TypeRegistry => drop(self.type_registry()),
            SingletonKind::DecoratedNamesMap => drop(self.decorated_names()),
            SingletonKind::EmptyMessage => drop(self.empty_message()),
            SingletonKind::Scheduler => return self.scheduler().is_ok(),
            SingletonKind::NetworkManager => return self.network_manager().is_ok(),
        }
        true
    }

    /// Tears the context down.
    ///
    /// 1. Quits every scoped actor that is still live.
    /// 2. Waits until the actor registry counts no running actors. With a configured drain
    ///    timeout, expiry returns [`ShutdownError::DrainTimeout`] and nothing is torn down.
    /// 3. Stops the network manager, then the scheduler.
    /// 4. Fences, so every thread observes both stops.
    /// 5. Releases the passive subsystems.
    ///
    /// Kinds that were never created are skipped, and calling this again is a no-op.
    #[instrument(skip(self), fields(node = %self.node))]
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        let live: Vec<Arc<ScopedContext>> = self
            .scopes
            .iter()
            .filter_map(|entry| entry.value().upgrade())
            .collect();
        for scope in live {
            match scope.quit(ExitReason::Normal) {
                Ok(()) => trace!(actor = %scope.address(), "Quit scoped actor"),
                Err(ExitError::AlreadyExited) => trace!("Scoped actor had already exited"),
            }
        }

        if let Some(registry) = self.actor_registry.load() {
            let running = registry.running_count();
            debug!(running, "Draining running actors");
            match self.config.shutdown_drain_timeout() {
                Some(limit) => {
                    if tokio::time::timeout(limit, registry.await_running_count_equal(0))
                        .await
                        .is_err()
                    {
                        let running = registry.running_count();
                        warn!(running, "Shutdown drain timed out; leaving subsystems running");
                        return Err(ShutdownError::DrainTimeout { running });
                    }
                }
                None => registry.await_running_count_equal(0).await,
            }
        }

        if let Some(manager) = self.network_manager.take() {
            manager.stop();
        }
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop().await;
        }

        fence(Ordering::SeqCst);

        self.scopes.clear();
        drop(self.actor_registry.take());
        drop(self.group_manager.take());
        drop(self.empty_message.take());
        drop(self.type_registry.take());
        drop(self.decorated_names.take());
        info!("Runtime context shut down");
        Ok(())
    }

    pub(crate) fn enter_scope(&self, scope: &Arc<ScopedContext>) {
        self.scopes
            .insert(scope.address().id(), Arc::downgrade(scope));
    }

    /// Ids restart after a shutdown, so only the entry for this very context is removed.
    pub(crate) fn leave_scope(&self, scope: &ScopedContext) {
        self.scopes.remove_if(&scope.address().id(), |_, entry| {
            std::ptr::eq(entry.as_ptr(), scope)
        });
    }

    fn install_default_scheduler(self: &Arc<Self>) {
        let scheduler = ThreadPoolScheduler::new(self.config.scheduler.clone());
        self.install_scheduler(Box::new(scheduler));
    }

    /// Second half of the paired install. A duplicate manager is discarded, never the
    /// published one.
    fn attach_network_manager(self: &Arc<Self>, scheduler: SchedulerRef) {
        let candidate = Arc::new(NetworkManager::new(
            self.node.clone(),
            Arc::downgrade(self),
            scheduler,
            self.config.clone(),
        ));
        match self.network_manager.try_install(candidate) {
            Ok(manager) => {
                manager.start();
                debug!("Network manager started");
            }
            Err(_) => trace!("Network manager already present; discarding duplicate"),
        }
    }
}

impl fmt::Debug for Singletons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Singletons");
        debug.field("node", &self.node);
        for kind in SingletonKind::ALL {
            debug.field(&kind.to_string(), &self.is_initialized(kind));
        }
        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;

    use super::*;

    struct Counted {
        drops: Arc<AtomicUsize>,
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn racing_get_or_create_publishes_exactly_one_instance() {
        const RACERS: usize = 16;
        let cell = Arc::new(SingletonCell::<Counted>::new());
        let built = Arc::new(AtomicUsize::new(0));
        let drops = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(RACERS));

        let workers: Vec<_> = (0..RACERS)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let built = Arc::clone(&built);
                let drops = Arc::clone(&drops);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cell.get_or_create(|| {
                        built.fetch_add(1, Ordering::SeqCst);
                        Counted { drops }
                    })
                })
            })
            .collect();
        let seen: Vec<Arc<Counted>> = workers
            .into_iter()
            .map(|worker| worker.join().expect("racer panicked"))
            .collect();

        let published = cell.load().expect("slot filled");
        assert!(seen.iter().all(|instance| Arc::ptr_eq(instance, &published)));
        // every losing candidate was dropped; only the winner survives
        let built = built.load(Ordering::SeqCst);
        assert_eq!(drops.load(Ordering::SeqCst), built - 1);

        drop(seen);
        drop(published);
        drop(cell.take());
        assert_eq!(drops.load(Ordering::SeqCst), built);
    }

    #[test]
    fn try_install_reports_the_existing_winner() {
        let cell = SingletonCell::new();
        let first = cell.try_install(Arc::new(1)).expect("empty slot");
        let second = cell.try_install(Arc::new(2)).expect_err("slot taken");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*cell.take().expect("set"), 1);
        assert!(!cell.is_set());
        assert!(cell.take().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn install_scheduler_succeeds_once() {
        let context = Singletons::new(RivetConfig::default());
        assert!(context.install_scheduler(Box::new(ThreadPoolScheduler::new(
            Default::default()
        ))));
        let installed = context.scheduler().expect("installed");
        assert!(context.is_initialized(SingletonKind::NetworkManager));

        for _ in 0..3 {
            assert!(!context.install_scheduler(Box::new(ThreadPoolScheduler::new(
                Default::default()
            ))));
        }
        assert!(Arc::ptr_eq(&installed, &context.scheduler().expect("still installed")));
        context.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn network_manager_bootstraps_the_scheduler_pair() {
        let context = Singletons::new(RivetConfig::default());
        assert!(!context.is_initialized(SingletonKind::Scheduler));
        let manager = context.network_manager().expect("bootstrapped");
        assert!(context.is_initialized(SingletonKind::Scheduler));
        assert!(Arc::ptr_eq(&manager, &context.network_manager().expect("same")));
        context.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_empties_every_slot_and_allows_fresh_instances() {
        let context = Singletons::new(RivetConfig::default());
        for kind in SingletonKind::ALL {
            assert!(context.ensure(kind), "{kind} should initialize");
        }
        let registry = context.actor_registry();

        context.shutdown().await.expect("clean shutdown");
        for kind in SingletonKind::ALL {
            assert!(!context.is_initialized(kind), "{kind} should be released");
        }
        context.shutdown().await.expect("second shutdown is a no-op");

        let fresh = context.actor_registry();
        assert!(!Arc::ptr_eq(&registry, &fresh));
        context.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn empty_sentinel_outlives_shutdown_while_held() {
        let context = Singletons::new(RivetConfig::default());
        let sentinel = context.empty_message();
        assert!(Arc::ptr_eq(&sentinel, &context.empty_message()));
        context.shutdown().await.expect("clean shutdown");

        assert_eq!(Arc::strong_count(&sentinel), 1);
        assert!(!Arc::ptr_eq(&sentinel, &context.empty_message()));
    }
}
