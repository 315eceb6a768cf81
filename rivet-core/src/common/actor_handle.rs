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

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use acton_ern::Ern;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{instrument, trace, warn};

use crate::common::config::CONFIG;
use crate::common::{ActorAddress, ActorSender};
use crate::message::{ExitReason, MessageAddress, OutboundEnvelope, SystemSignal};
use crate::traits::RivetMessage;

/// A clonable handle for interacting with an actor, local or remote.
///
/// A remote handle is a proxy: its outbox feeds a forwarder that ships messages over the
/// connection to the node hosting the actor. Both kinds are used the same way.
///
/// Equality and hashing are based solely on the actor's [`ActorAddress`], so the proxy for
/// an actor and the actor's own local handle compare equal.
#[derive(Debug, Clone)]
pub struct ActorHandle {
    pub(crate) id: Ern,
    pub(crate) address: ActorAddress,
    pub(crate) outbox: ActorSender,
    tracker: TaskTracker,
    pub(crate) cancellation_token: CancellationToken,
    remote: bool,
}

impl PartialEq for ActorHandle {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for ActorHandle {}

impl Hash for ActorHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl ActorHandle {
    pub(crate) const fn local(
        id: Ern,
        address: ActorAddress,
        outbox: ActorSender,
        tracker: TaskTracker,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            id,
            address,
            outbox,
            tracker,
            cancellation_token,
            remote: false,
        }
    }

    pub(crate) fn remote(
        id: Ern,
        address: ActorAddress,
        outbox: ActorSender,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            id,
            address,
            outbox,
            tracker: TaskTracker::new(),
            cancellation_token,
            remote: true,
        }
    }

    /// The actor's name, as given at creation on its home node.
    #[inline]
    pub fn id(&self) -> Ern {
        self.id.clone()
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.id.root.as_str()
    }

    #[inline]
    pub const fn address(&self) -> &ActorAddress {
        &self.address
    }

    /// `true` for a proxy to an actor hosted by another node.
    #[inline]
    pub const fn is_remote(&self) -> bool {
        self.remote
    }

    /// `true` once the actor can no longer take messages.
    ///
    /// A proxy closes when its node reports the actor down or the connection is lost.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.outbox.is_closed()
    }

    /// Reference identity: same actor and the very same delivery channel.
    ///
    /// Two proxies for one actor obtained through the same cached resolution are the same;
    /// a proxy and the actor's local handle are equal but not the same.
    pub fn is_same(&self, other: &Self) -> bool {
        self.address == other.address && self.outbox.same_channel(&other.outbox)
    }

    /// Returns the [`MessageAddress`] of this actor, used as a reply-to or recipient address.
    #[inline]
    pub fn reply_address(&self) -> MessageAddress {
        MessageAddress::new(self.address.clone(), self.id.clone(), self.outbox.clone())
    }

    /// Creates an [`OutboundEnvelope`] with this actor as the return address.
    #[instrument(skip(self, recipient_address), level = "trace")]
    pub fn create_envelope(&self, recipient_address: Option<MessageAddress>) -> OutboundEnvelope {
        let return_address = self.reply_address();
        match recipient_address {
            Some(recipient) => OutboundEnvelope::new_with_recipient(
                return_address,
                recipient,
                self.cancellation_token.clone(),
            ),
            None => OutboundEnvelope::new(return_address, self.cancellation_token.clone()),
        }
    }

    /// Sends `message` to this actor, with the actor itself as the sender.
    pub async fn send(&self, message: impl RivetMessage + 'static) {
        self.create_envelope(None).send(message).await;
    }

    /// Sends an already shared message to this actor.
    ///
    /// The receiving handler sees the payload as shared while the caller keeps its `Arc`.
    pub async fn send_arc(&self, message: Arc<dyn RivetMessage>) {
        self.create_envelope(None).send_arc(message).await;
    }

    /// Sends `message` to this actor on behalf of `sender`, so replies go to `sender`.
    pub async fn send_from(&self, sender: &Self, message: impl RivetMessage + 'static) {
        sender
            .create_envelope(Some(self.reply_address()))
            .send(message)
            .await;
    }

    /// Sends an exit request carrying `reason`.
    pub async fn send_exit(&self, reason: ExitReason) {
        self.create_envelope(None).send_exit(reason).await;
    }

    /// Stops the actor.
    ///
    /// For a local actor this sends [`SystemSignal::Terminate`] and waits for the actor to
    /// finish its queued messages and its `after_stop` hook. For a proxy it forwards an exit
    /// request to the remote node and returns once it is queued.
    pub async fn stop(&self) -> anyhow::Result<()> {
        if self.remote {
            trace!(actor = %self.address, "Requesting remote actor exit");
            self.send_exit(ExitReason::UserShutdown).await;
            return Ok(());
        }

        trace!(actor = %self.address, "Sending Terminate signal");
        self.create_envelope(None).send(SystemSignal::Terminate).await;

        let limit = CONFIG.actor_shutdown_timeout();
        if tokio::time::timeout(limit, self.tracker.wait()).await.is_err() {
            warn!(actor = %self.address, "Actor did not stop in time");
            anyhow::bail!("actor {} did not stop within {:?}", self.address, limit);
        }
        trace!(actor = %self.address, "Actor terminated successfully.");
        Ok(())
    }

    /// Waits until the actor has finished.
    ///
    /// For a proxy this waits until the forwarder shuts down, which happens when the remote
    /// node reports the actor down or the connection is lost.
    pub async fn join(&self) {
        if self.remote {
            self.outbox.closed().await;
        } else {
            self.tracker.wait().await;
        }
    }
}
