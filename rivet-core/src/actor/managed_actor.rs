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
use std::fmt::Debug;
use std::fmt::Formatter;
use std::marker::PhantomData;
use std::sync::Arc;

use acton_ern::Ern;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub use idle::Idle;
pub use started::Started;

use crate::common::{
    ActorHandle, ActorId, ActorRegistry, ActorSystem, AsyncLifecycleHandler, ReactorMap,
};
use crate::message::{Envelope, ExitReason};

mod idle;
mod started;

/// An actor whose lifecycle and message processing are driven by the runtime.
///
/// `ManagedActor` wraps user state (`Model`) and uses a type-state parameter to separate
/// configuration ([`Idle`]: register handlers and hooks) from processing ([`Started`]:
/// handlers run one message at a time with exclusive access to `model`).
///
/// Once started the actor is reached through its [`ActorHandle`].
pub struct ManagedActor<ActorState, Model: Default + Send + Debug + 'static> {
    pub(crate) handle: ActorHandle,

    pub(crate) id: Ern,

    /// The system the actor was created in.
    pub(crate) system: ActorSystem,

    /// The user-defined state of this actor.
    ///
    /// Handlers registered with `mutate_on` and the lifecycle hooks operate on it.
    pub model: Model,

    pub(crate) tracker: TaskTracker,

    pub(crate) inbox: Receiver<Envelope>,
    pub(crate) after_start: AsyncLifecycleHandler<Model>,
    pub(crate) before_stop: AsyncLifecycleHandler<Model>,
    pub(crate) after_stop: AsyncLifecycleHandler<Model>,
    pub(crate) message_handlers: ReactorMap<Model>,

    pub(crate) cancellation_token: CancellationToken,

    /// Set by `quit`; the wake loop stops after the current handler returns.
    pub(crate) exit_reason: Option<ExitReason>,

    _actor_state: PhantomData<ActorState>,
}

impl<ActorState, Model: Default + Send + Debug + 'static> ManagedActor<ActorState, Model> {
    #[inline]
    pub const fn id(&self) -> &Ern {
        &self.id
    }

    /// Returns the root name segment of the actor's identifier.
    #[inline]
    pub fn name(&self) -> &str {
        self.id.root.as_str()
    }

    /// Returns the actor's [`ActorHandle`].
    #[inline]
    pub const fn handle(&self) -> &ActorHandle {
        &self.handle
    }

    /// Returns the [`ActorSystem`] this actor belongs to.
    #[inline]
    pub const fn system(&self) -> &ActorSystem {
        &self.system
    }

    /// The reason passed to `quit`, or the exit signal that stopped the actor.
    #[inline]
    pub const fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }
}

impl<ActorState, Model: Default + Send + Debug + 'static> Debug
    for ManagedActor<ActorState, Model>
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedActor")
            .field("id", &self.id)
            .field("address", self.handle.address())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Keeps an actor counted as running and registered until the wake loop ends.
pub(crate) struct RunningGuard {
    registry: Arc<ActorRegistry>,
    id: ActorId,
}

impl RunningGuard {
    pub(crate) fn enter(registry: Arc<ActorRegistry>, handle: &ActorHandle) -> Self {
        registry.put(handle.clone());
        registry.inc_running();
        Self {
            registry,
            id: handle.address().id(),
        }
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.registry.erase(self.id);
        self.registry.dec_running();
    }
}
