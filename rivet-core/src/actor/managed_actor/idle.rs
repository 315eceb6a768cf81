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
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;

use tokio::sync::mpsc::channel;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, instrument, trace};

use crate::actor::managed_actor::RunningGuard;
use crate::actor::{ActorConfig, ManagedActor, Started};
use crate::common::{ActorAddress, ActorHandle, ActorSystem, FutureBox};
use crate::message::{Envelope, MessageContext, OutboundEnvelope};
use crate::traits::HandlerArg;

/// Type-state marker for an actor that is being configured and has not started yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Idle;

impl<Model: Default + Send + Debug + 'static> ManagedActor<Idle, Model> {
    /// Registers a handler for messages of type `M`.
    ///
    /// The handler gets exclusive access to the actor and a [`MessageContext`] whose
    /// argument is `M::Arg`. For most messages that is a [`Param<M>`](crate::message::Param)
    /// sharing the payload with the envelope: reading costs nothing, and mutating copies
    /// only when another recipient can still see the original.
    ///
    /// Registering a second handler for the same type replaces the first.
    pub fn mutate_on<M>(
        &mut self,
        message_processor: impl for<'a> Fn(&'a mut ManagedActor<Started, Model>, &'a mut MessageContext<M>) -> FutureBox
            + Send
            + Sync
            + 'static,
    ) -> &mut Self
    where
        M: HandlerArg,
    {
        let type_id = TypeId::of::<M>();
        trace!(type_name = std::any::type_name::<M>(), type_id = ?type_id, "Adding message handler");
        let handler_box = Box::new(
            move |actor: &mut ManagedActor<Started, Model>, envelope: Envelope| -> FutureBox {
                let Envelope {
                    message,
                    reply_to,
                    recipient,
                    ..
                } = envelope;
                // The envelope's reference moves into the downcast, so a payload nobody else
                // holds reaches the handler as exclusive.
                match message.into_any_arc().downcast::<M>() {
                    Ok(concrete) => {
                        let cancellation_token = actor.handle.cancellation_token.clone();
                        let origin_envelope = OutboundEnvelope::new_with_recipient(
                            reply_to.clone(),
                            recipient.clone(),
                            cancellation_token.clone(),
                        );
                        let reply_envelope =
                            OutboundEnvelope::new_with_recipient(recipient, reply_to, cancellation_token);
                        let mut msg_context = MessageContext {
                            message: M::into_arg(concrete),
                            origin_envelope,
                            reply_envelope,
                        };
                        message_processor(actor, &mut msg_context)
                    }
                    Err(_) => {
                        error!(
                            type_name = std::any::type_name::<M>(),
                            "Message handler called with incompatible message type (downcast failed)"
                        );
                        Box::pin(async {})
                    }
                }
            },
        );
        self.message_handlers.insert(type_id, handler_box);
        self
    }

    /// Sets a hook that runs once the actor is scheduled, before its first message.
    pub fn after_start<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: for<'b> Fn(&'b ManagedActor<Started, Model>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.after_start = Some(Box::new(
            move |actor: &ManagedActor<Started, Model>| -> FutureBox { Box::pin(f(actor)) },
        ));
        self
    }

    /// Sets a hook that runs when the actor is asked to stop, before its inbox closes.
    pub fn before_stop<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: for<'b> Fn(&'b ManagedActor<Started, Model>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.before_stop = Some(Box::new(
            move |actor: &ManagedActor<Started, Model>| -> FutureBox { Box::pin(f(actor)) },
        ));
        self
    }

    /// Sets a hook that runs after the last message has been processed.
    pub fn after_stop<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: for<'b> Fn(&'b ManagedActor<Started, Model>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.after_stop = Some(Box::new(
            move |actor: &ManagedActor<Started, Model>| -> FutureBox { Box::pin(f(actor)) },
        ));
        self
    }

    pub(crate) fn new(system: &ActorSystem, config: &ActorConfig) -> Self {
        let singletons = system.singletons();
        let address = ActorAddress::new(
            singletons.node().clone(),
            singletons.actor_registry().next_id(),
        );
        let capacity = config
            .inbox_capacity()
            .unwrap_or(system.config().limits.actor_inbox_capacity);
        let (outbox, inbox) = channel(capacity.max(1));
        let tracker = TaskTracker::new();
        let cancellation_token = CancellationToken::new();
        let id = config.id().clone();
        let handle = ActorHandle::local(
            id.clone(),
            address,
            outbox,
            tracker.clone(),
            cancellation_token.clone(),
        );

        trace!(actor = %handle.address(), name = %id, "NEW ACTOR");
        Self {
            handle,
            id,
            system: system.clone(),
            model: Model::default(),
            tracker,
            inbox,
            after_start: None,
            before_stop: None,
            after_stop: None,
            message_handlers: Default::default(),
            cancellation_token,
            exit_reason: None,
            _actor_state: PhantomData,
        }
    }

    /// Starts the actor and returns its handle.
    ///
    /// The actor is registered and counted as running before this returns; its wake loop
    /// runs as one unit on the system scheduler, which comes up here if nothing else has
    /// started it yet. If the scheduler is unavailable the actor is dropped and the handle
    /// reports [`is_closed`](ActorHandle::is_closed).
    #[instrument(skip(self), fields(actor = %self.handle.address()))]
    pub async fn start(mut self) -> ActorHandle {
        trace!("Model state before start: {:?}", self.model);

        let message_handlers = mem::take(&mut self.message_handlers);
        let actor_ref = self.handle.clone();
        let tracker = self.tracker.clone();
        let singletons = Arc::clone(self.system.singletons());
        let guard = RunningGuard::enter(singletons.actor_registry(), &actor_ref);

        let active_actor: ManagedActor<Started, Model> = self.into();
        match singletons.scheduler() {
            Ok(scheduler) => {
                let unit = tracker.track_future(active_actor.wake(message_handlers, guard));
                if let Err(e) = scheduler.enqueue(Box::pin(unit)) {
                    error!("Failed to schedule actor: {}", e);
                }
            }
            Err(e) => {
                error!("No scheduler available for actor: {}", e);
            }
        }
        tracker.close();

        trace!("Actor started");
        actor_ref
    }
}

impl<Model: Default + Send + Debug + 'static> From<ManagedActor<Idle, Model>>
    for ManagedActor<Started, Model>
{
    fn from(value: ManagedActor<Idle, Model>) -> Self {
        Self {
            handle: value.handle,
            id: value.id,
            system: value.system,
            model: value.model,
            tracker: value.tracker,
            inbox: value.inbox,
            after_start: value.after_start,
            before_stop: value.before_stop,
            after_stop: value.after_stop,
            message_handlers: value.message_handlers,
            cancellation_token: value.cancellation_token,
            exit_reason: value.exit_reason,
            _actor_state: PhantomData,
        }
    }
}
