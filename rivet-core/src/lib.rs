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

#![forbid(unsafe_code)]

//! # Rivet Core
//!
//! The runtime foundation of the Rivet actor framework, built on Tokio.
//!
//! ## Key Concepts
//!
//! - **Singletons (`Singletons`)**: one explicitly owned context per actor system holding
//!   the actor registry, group manager, type registry, scheduler and network manager.
//!   Each subsystem is created at most once, published with a compare-and-swap, and torn
//!   down in a fixed order by [`Singletons::shutdown`](crate::common::Singletons::shutdown).
//! - **Copy-on-write parameters (`Param`)**: handlers receive their message argument as a
//!   `Param<T>` that reads without copying and only clones the value when a handler
//!   mutates a message other holders can still see.
//! - **Actors (`ManagedActor`)**: type-state (`Idle`, `Started`) wrappers around user state
//!   with `mutate_on` handlers and lifecycle hooks.
//! - **Remote identity**: `publish` exposes a local actor on a TCP port and `resolve` turns a
//!   `(host, port)` pair into a cached [`ActorHandle`](crate::common::ActorHandle).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rivet_core::prelude::*;
//!
//! #[rivet_message]
//! struct Greeting {
//!     text: String,
//! }
//!
//! let system = RivetApp::launch();
//! let mut greeter = system.new_actor::<()>();
//! greeter.mutate_on::<Greeting>(|_actor, ctx| {
//!     tracing::info!("hello {}", ctx.message().text);
//!     Reply::ready()
//! });
//! let handle = greeter.start().await;
//! ```

extern crate self as rivet_core;

/// Runtime context, subsystems and the network layer.
pub(crate) mod common;

/// Defines the managed actor type-state machine.
pub(crate) mod actor;

/// Defines message types, envelopes and the copy-on-write parameter.
pub(crate) mod message;

/// Defines the core traits shared across the crate.
pub(crate) mod traits;

/// Networking types needed to publish and resolve actors across processes.
pub mod net {
    pub use crate::common::net::{protocol, wire, NetworkError, NetworkManager};
}

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## Macros (from `rivet-macro`)
/// *   [`rivet_macro::rivet_message`]: Attribute macro for defining messages.
///
/// ## External Crates
/// *   [`acton_ern::*`](https://docs.rs/acton-ern): resource names used to label actors.
/// *   [`async_trait::async_trait`]: needed to implement [`Scheduler`](crate::common::Scheduler).
pub mod prelude {
    pub use rivet_macro::*;

    pub use acton_ern::*;
    pub use async_trait::async_trait;

    pub use crate::actor::{ActorConfig, Idle, ManagedActor, Started};
    pub use crate::common::config::{RivetConfig, CONFIG};
    pub use crate::common::net::{NetworkError, NetworkManager};
    pub use crate::common::{
        ActorAddress, ActorHandle, ActorId, ActorRegistry, ActorSystem, DecoratedNamesMap,
        ExitError, FutureBox, Group, GroupManager, NodeId, ReceiveError, Reply, RivetApp,
        RunnableUnit, Scheduler, SchedulerError, SchedulerRef, ScopedActor, ShutdownError,
        SingletonCell, SingletonKind, Singletons, ThreadPoolScheduler, TypeRegistry,
    };
    pub use crate::message::{
        Access, EmptyMessage, ExitReason, MessageAddress, MessageContext, OutboundEnvelope, Param,
        SystemSignal,
    };
    pub use crate::traits::{HandlerArg, RivetMessage};
}
