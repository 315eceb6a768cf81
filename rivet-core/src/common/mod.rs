//! Shared components of the runtime.
//!
//! *   [`Singletons`]: the runtime context owning one instance of each subsystem, with
//!     lazy creation and ordered shutdown.
//! *   [`RivetApp`] / [`ActorSystem`]: launching a system and working with it.
//! *   [`ActorHandle`]: the clonable, location-transparent handle to an actor.
//! *   [`Scheduler`] / [`ThreadPoolScheduler`]: where actors and network tasks run.
//! *   [`ActorRegistry`], [`GroupManager`], [`TypeRegistry`], [`DecoratedNamesMap`]: the
//!     passive subsystems.
//! *   [`ScopedActor`]: a mailbox for non-actor code.

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

pub use actor_handle::ActorHandle;
pub use actor_registry::ActorRegistry;
pub use actor_system::{ActorSystem, RivetApp};
pub use decorated_names::DecoratedNamesMap;
pub use errors::{ExitError, ReceiveError, SchedulerError, ShutdownError};
pub use group_manager::{Group, GroupManager};
pub use node_id::{ActorAddress, ActorId, NodeId};
pub use reply::Reply;
pub use scheduler::{RunnableUnit, Scheduler, SchedulerRef, ThreadPoolScheduler};
pub use scoped_actor::ScopedActor;
pub use singletons::{SingletonCell, SingletonKind, Singletons};
pub use types::*;

mod actor_handle;
mod actor_registry;
mod actor_system;
mod decorated_names;
mod errors;
mod group_manager;
mod node_id;
mod reply;
mod scheduler;
pub(crate) mod scoped_actor;
mod singletons;
mod type_registry;
/// Defines common internal type aliases.
mod types;

/// Configuration loaded from XDG-compliant locations.
pub mod config;
/// TCP transport, endpoint publication and remote identity resolution.
pub mod net;

pub use type_registry::TypeRegistry;
