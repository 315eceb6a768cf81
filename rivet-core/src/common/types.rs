//! Defines common internal type aliases used within `rivet-core`.

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

use std::any::TypeId;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc::Sender;

use crate::actor::{ManagedActor, Started};
use crate::message::Envelope;

/// Crate-internal: Map storing message handlers (`TypeId` -> handler).
///
/// Populated while the actor is `Idle`, then read-only for the lifetime of its wake loop.
pub type ReactorMap<Model> = HashMap<TypeId, Box<FutureHandler<Model>>>;

/// Crate-internal: signature of a type-erased message handler.
pub type FutureHandler<Model> = dyn for<'a> Fn(&'a mut ManagedActor<Started, Model>, Envelope) -> FutureBox
    + Send
    + Sync
    + 'static;

/// A pinned, boxed future with `Output = ()`, the return type of handlers and lifecycle hooks.
pub type FutureBox = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Crate-internal: the sending half of an actor inbox.
pub type ActorSender = Sender<Envelope>;

/// Crate-internal: an optional asynchronous lifecycle hook.
pub type AsyncLifecycleHandler<Model> =
    Option<Box<dyn Fn(&ManagedActor<Started, Model>) -> FutureBox + Send + Sync + 'static>>;
