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

use tracing::{instrument, trace};

use crate::actor::managed_actor::RunningGuard;
use crate::actor::ManagedActor;
use crate::common::ReactorMap;
use crate::message::{ExitReason, MessageAddress, OutboundEnvelope, SystemSignal};

/// Type-state marker for an actor whose wake loop is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Started;

impl<Model: Default + Send + Debug + 'static> ManagedActor<Started, Model> {
    /// Creates an envelope from this actor to `recipient`.
    pub fn new_envelope(&self, recipient: &MessageAddress) -> OutboundEnvelope {
        self.handle.create_envelope(Some(recipient.clone()))
    }

    /// Stops the actor once the running handler returns.
    ///
    /// Messages still queued are dropped. Calling it again only replaces the reason.
    pub fn quit(&mut self, reason: ExitReason) {
        trace!(actor = %self.handle.address(), %reason, "Actor quitting");
        self.exit_reason = Some(reason);
    }

    async fn begin_stop(&mut self) {
        if let Some(hook) = &self.before_stop {
            let fut = hook(&*self);
            fut.await;
        }
        self.inbox.close();
    }

    #[instrument(skip(self, reactors, guard), fields(actor = %self.handle.address()))]
    pub(crate) async fn wake(mut self, reactors: ReactorMap<Model>, guard: RunningGuard) {
        if let Some(hook) = &self.after_start {
            let fut = hook(&self);
            fut.await;
        }

        while let Some(envelope) = self.inbox.recv().await {
            let type_id = (*envelope.message).as_any().type_id();
            trace!(sender = %envelope.reply_to.address, "Received envelope");

            if let Some(handler) = reactors.get(&type_id) {
                let fut = handler(&mut self, envelope);
                fut.await;
                if self.exit_reason.is_some() {
                    self.begin_stop().await;
                    break;
                }
            } else if let Some(signal) = (*envelope.message).as_any().downcast_ref::<SystemSignal>()
            {
                match *signal {
                    SystemSignal::Terminate => {
                        trace!("Terminate signal received. Closing inbox.");
                        // Messages already queued are still processed.
                        self.begin_stop().await;
                    }
                    SystemSignal::Exit(reason) => {
                        trace!(%reason, "Exit signal received");
                        self.exit_reason = Some(reason);
                        self.begin_stop().await;
                        break;
                    }
                }
            } else {
                trace!(type_id = ?type_id, "No handler found for message type");
            }
        }

        if let Some(hook) = &self.after_stop {
            let fut = hook(&self);
            fut.await;
        }
        self.cancellation_token.cancel();
        trace!("Actor stopped");
        // The inbox closes before the actor stops counting as running.
        drop(self);
        drop(guard);
    }
}
