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

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use acton_ern::Ern;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace};

use crate::common::{
    ActorAddress, ActorHandle, ActorRegistry, ExitError, ReceiveError, Singletons,
};
use crate::message::{Envelope, ExitReason, MessageAddress, SystemSignal};
use crate::traits::RivetMessage;

/// The exit state shared between a [`ScopedActor`] and the runtime context.
///
/// Shutdown quits live scoped actors through this, without owning their mailboxes.
#[derive(Debug)]
pub(crate) struct ScopedContext {
    address: ActorAddress,
    registry: Arc<ActorRegistry>,
    exited: AtomicBool,
    cancellation_token: CancellationToken,
}

impl ScopedContext {
    pub(crate) fn quit(&self, reason: ExitReason) -> Result<(), ExitError> {
        if self.exited.swap(true, Ordering::AcqRel) {
            return Err(ExitError::AlreadyExited);
        }
        self.registry.erase(self.address.id());
        self.registry.dec_running();
        self.cancellation_token.cancel();
        debug!(actor = %self.address, %reason, "Scoped actor exited");
        Ok(())
    }

    pub(crate) const fn address(&self) -> &ActorAddress {
        &self.address
    }

    pub(crate) fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }
}

/// A mailbox for code that is not itself an actor, such as `main` or a test.
///
/// It is registered like an actor and counts as running until it quits, so
/// [`ActorSystem::shutdown`](crate::common::ActorSystem::shutdown) quits every live one
/// before draining. Messages that do not match the type asked for by
/// [`receive`](Self::receive) are kept for later calls.
#[derive(Debug)]
pub struct ScopedActor {
    handle: ActorHandle,
    inbox: mpsc::Receiver<Envelope>,
    stash: VecDeque<Envelope>,
    context: Arc<ScopedContext>,
    singletons: Arc<Singletons>,
}

impl ScopedActor {
    pub(crate) fn new(singletons: &Arc<Singletons>) -> Self {
        let registry = singletons.actor_registry();
        let address = ActorAddress::new(singletons.node().clone(), registry.next_id());
        let (outbox, inbox) = mpsc::channel(singletons.config().limits.actor_inbox_capacity);
        let cancellation_token = CancellationToken::new();
        let tracker = TaskTracker::new();
        tracker.close();

        let handle = ActorHandle::local(
            Ern::with_root("scoped").unwrap_or_default(),
            address.clone(),
            outbox,
            tracker,
            cancellation_token.clone(),
        );
        registry.put(handle.clone());
        registry.inc_running();

        let context = Arc::new(ScopedContext {
            address,
            registry,
            exited: AtomicBool::new(false),
            cancellation_token,
        });
        singletons.enter_scope(&context);
        trace!(actor = %handle.address(), "Scoped actor created");

        Self {
            handle,
            inbox,
            stash: VecDeque::new(),
            context,
            singletons: Arc::clone(singletons),
        }
    }

    pub const fn handle(&self) -> &ActorHandle {
        &self.handle
    }

    pub fn reply_address(&self) -> MessageAddress {
        self.handle.reply_address()
    }

    /// Sends `message` to `target` with this scoped actor as the sender.
    pub async fn send(&self, target: &ActorHandle, message: impl RivetMessage + 'static) {
        self.handle
            .create_envelope(Some(target.reply_address()))
            .send(message)
            .await;
    }

    /// Sends an exit request to `target`.
    pub async fn send_exit(&self, target: &ActorHandle, reason: ExitReason) {
        self.handle
            .create_envelope(Some(target.reply_address()))
            .send_exit(reason)
            .await;
    }

    /// Waits up to `timeout` for a message of type `M`.
    pub async fn receive<M>(&mut self, timeout: Duration) -> Result<M, ReceiveError>
    where
        M: RivetMessage + Clone + 'static,
    {
        self.receive_from::<M>(timeout)
            .await
            .map(|(message, _)| message)
    }

    /// Like [`receive`](Self::receive), also returning the sender's address.
    ///
    /// An exit request or terminate signal quits the scoped actor and yields
    /// [`ReceiveError::Closed`].
    pub async fn receive_from<M>(
        &mut self,
        timeout: Duration,
    ) -> Result<(M, MessageAddress), ReceiveError>
    where
        M: RivetMessage + Clone + 'static,
    {
        let mut skipped = VecDeque::with_capacity(self.stash.len());
        while let Some(envelope) = self.stash.pop_front() {
            match downcast::<M>(envelope) {
                Ok(found) => {
                    skipped.append(&mut self.stash);
                    self.stash = skipped;
                    return Ok(found);
                }
                Err(envelope) => skipped.push_back(envelope),
            }
        }
        self.stash = skipped;

        if self.context.has_exited() {
            return Err(ReceiveError::Closed);
        }
        let deadline = Instant::now() + timeout;
        loop {
            let envelope = tokio::select! {
                biased;
                () = self.context.cancellation_token.cancelled() => {
                    self.inbox.close();
                    return Err(ReceiveError::Closed);
                }
                received = tokio::time::timeout_at(deadline, self.inbox.recv()) => match received {
                    Err(_) => return Err(ReceiveError::Timeout),
                    Ok(None) => return Err(ReceiveError::Closed),
                    Ok(Some(envelope)) => envelope,
                },
            };

            if let Some(signal) = (*envelope.message).as_any().downcast_ref::<SystemSignal>() {
                let reason = match signal {
                    SystemSignal::Exit(reason) => *reason,
                    _ => ExitReason::Normal,
                };
                trace!(actor = %self.handle.address(), ?signal, "Scoped actor received a system signal");
                let _ = self.quit(reason);
                return Err(ReceiveError::Closed);
            }

            match downcast::<M>(envelope) {
                Ok(found) => return Ok(found),
                Err(envelope) => self.stash.push_back(envelope),
            }
        }
    }

    /// Leaves the system. Fails if this scoped actor has already exited.
    pub fn quit(&mut self, reason: ExitReason) -> Result<(), ExitError> {
        self.inbox.close();
        self.singletons.leave_scope(&self.context);
        self.context.quit(reason)
    }
}

impl Drop for ScopedActor {
    fn drop(&mut self) {
        if !self.context.has_exited() {
            let _ = self.quit(ExitReason::Normal);
        }
    }
}

fn downcast<M>(envelope: Envelope) -> Result<(M, MessageAddress), Envelope>
where
    M: RivetMessage + Clone + 'static,
{
    match Arc::clone(&envelope.message).into_any_arc().downcast::<M>() {
        Ok(message) => {
            let Envelope {
                message: original,
                reply_to,
                ..
            } = envelope;
            drop(original);
            Ok((Arc::unwrap_or_clone(message), reply_to))
        }
        Err(_) => Err(envelope),
    }
}
