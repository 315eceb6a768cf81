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

use std::fmt::Debug;
use std::sync::Arc;

use acton_ern::Ern;
use tracing::{instrument, trace};

use crate::actor::{ActorConfig, Idle, ManagedActor};
use crate::common::config::{RivetConfig, CONFIG};
use crate::common::net::NetworkError;
use crate::common::{
    ActorHandle, Group, NodeId, Scheduler, ScopedActor, ShutdownError, SingletonKind, Singletons,
    TypeRegistry,
};
use crate::message::EmptyMessage;

/// Entry point for bringing up an actor system.
#[derive(Default, Debug, Clone)]
pub struct RivetApp;

impl RivetApp {
    /// Launches an actor system configured from the XDG config file (or defaults).
    pub fn launch() -> ActorSystem {
        Self::launch_with_config(CONFIG.clone())
    }

    pub fn launch_with_config(config: RivetConfig) -> ActorSystem {
        trace!("Launching actor system");
        ActorSystem(Singletons::new(config))
    }
}

/// A running actor system: one node with its own subsystems.
///
/// Cheap to clone. Subsystems are created on first use; the scheduler and network manager
/// come up together, either through [`install_scheduler`](Self::install_scheduler) or with
/// defaults the first time an actor starts or a network operation runs.
#[derive(Debug, Clone)]
pub struct ActorSystem(pub(crate) Arc<Singletons>);

impl ActorSystem {
    pub fn node(&self) -> &NodeId {
        self.0.node()
    }

    pub fn config(&self) -> &RivetConfig {
        self.0.config()
    }

    /// The runtime context owning this system's subsystems.
    pub fn singletons(&self) -> &Arc<Singletons> {
        &self.0
    }

    pub fn is_initialized(&self, kind: SingletonKind) -> bool {
        self.0.is_initialized(kind)
    }

    /// Creates a new actor named `actor`.
    pub fn new_actor<Model>(&self) -> ManagedActor<Idle, Model>
    where
        Model: Default + Send + Debug + 'static,
    {
        self.new_actor_with_config(ActorConfig::new(Ern::with_root("actor").unwrap_or_default()))
    }

    /// Creates a new actor with the given name.
    pub fn new_actor_with_name<Model>(
        &self,
        name: impl Into<String>,
    ) -> anyhow::Result<ManagedActor<Idle, Model>>
    where
        Model: Default + Send + Debug + 'static,
    {
        let id = Ern::with_root(name.into())?;
        Ok(self.new_actor_with_config(ActorConfig::new(id)))
    }

    pub fn new_actor_with_config<Model>(&self, config: ActorConfig) -> ManagedActor<Idle, Model>
    where
        Model: Default + Send + Debug + 'static,
    {
        ManagedActor::new(self, &config)
    }

    /// Creates a scoped actor, which also becomes the system's current scoped actor.
    pub fn scoped_actor(&self) -> ScopedActor {
        ScopedActor::new(&self.0)
    }

    /// Installs a custom scheduler. See [`Singletons::install_scheduler`].
    pub fn install_scheduler(&self, scheduler: impl Scheduler) -> bool {
        self.0.install_scheduler(Box::new(scheduler))
    }

    /// Makes `actor` reachable at `host:port` and returns the bound port.
    ///
    /// Port 0 picks a free port. `host` defaults to the configured `network.default_host`.
    /// An actor may be published on several ports at once.
    #[instrument(skip(self, actor), fields(actor = %actor.address()))]
    pub async fn publish(
        &self,
        actor: &ActorHandle,
        port: u16,
        host: Option<&str>,
    ) -> Result<u16, NetworkError> {
        let host = host.unwrap_or(&self.config().network.default_host).to_string();
        self.0.network_manager()?.publish(actor, &host, port).await
    }

    /// Stops accepting connections on `port`.
    pub async fn unpublish(&self, port: u16) -> Result<(), NetworkError> {
        self.0.network_manager()?.unpublish(port)
    }

    /// Returns a handle for the actor published at `host:port`.
    ///
    /// Repeated calls with the same arguments return the same handle. An endpoint published
    /// by this very system resolves to the actor's local handle.
    #[instrument(skip(self))]
    pub async fn resolve(&self, host: &str, port: u16) -> Result<ActorHandle, NetworkError> {
        self.0.network_manager()?.resolve(host, port).await
    }

    pub fn type_registry(&self) -> Arc<TypeRegistry> {
        self.0.type_registry()
    }

    /// Returns the group called `name`, creating it if needed.
    pub fn group(&self, name: &str) -> Arc<Group> {
        self.0.group_manager().get(name)
    }

    /// The shared empty-message sentinel.
    pub fn empty_message(&self) -> Arc<EmptyMessage> {
        self.0.empty_message()
    }

    pub fn running_count(&self) -> usize {
        self.0.actor_registry().running_count()
    }

    /// Shuts the system down. See [`Singletons::shutdown`].
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        self.0.shutdown().await
    }
}
