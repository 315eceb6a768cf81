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

use tokio_util::sync::CancellationToken;
use tracing::{error, instrument, trace, warn};

use crate::message::{Envelope, ExitReason, MessageAddress, SystemSignal};
use crate::traits::RivetMessage;

/// A message ready to be sent: the sender's address plus an optional explicit recipient.
///
/// When no recipient is set the message goes back to `return_address`.
/// Equality and hashing are based solely on the `return_address`.
#[derive(Clone, Debug)]
pub struct OutboundEnvelope {
    pub(crate) return_address: MessageAddress,
    pub(crate) recipient_address: Option<MessageAddress>,
    pub(crate) cancellation_token: CancellationToken,
}

impl PartialEq for OutboundEnvelope {
    fn eq(&self, other: &Self) -> bool {
        self.return_address == other.return_address
    }
}

impl Eq for OutboundEnvelope {}

impl Hash for OutboundEnvelope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.return_address.hash(state);
    }
}

impl OutboundEnvelope {
    /// Creates an envelope addressed back to its own sender.
    pub fn new(return_address: MessageAddress, cancellation_token: CancellationToken) -> Self {
        trace!(sender = %return_address.address, "Creating new OutboundEnvelope");
        Self {
            return_address,
            recipient_address: None,
            cancellation_token,
        }
    }

    pub(crate) fn new_with_recipient(
        return_address: MessageAddress,
        recipient_address: MessageAddress,
        cancellation_token: CancellationToken,
    ) -> Self {
        trace!(
            sender = %return_address.address,
            recipient = %recipient_address.address,
            "Creating new OutboundEnvelope with recipient"
        );
        Self {
            return_address,
            recipient_address: Some(recipient_address),
            cancellation_token,
        }
    }

    /// Returns a clone of the sender's [`MessageAddress`].
    #[inline]
    #[must_use]
    pub fn reply_to(&self) -> MessageAddress {
        self.return_address.clone()
    }

    /// Returns the explicit recipient, if one was set.
    #[inline]
    #[must_use]
    pub const fn recipient(&self) -> &Option<MessageAddress> {
        &self.recipient_address
    }

    /// Sends `message` to the recipient.
    ///
    /// Delivery failures (a closed inbox, a cancelled sender) are logged, never returned:
    /// sending to a dead actor is not an error for the sender.
    pub async fn send(&self, message: impl RivetMessage + 'static) {
        self.send_arc(Arc::new(message)).await;
    }

    /// Sends an already shared message without allocating a new payload.
    ///
    /// Group broadcast relies on this to hand one allocation to every member.
    #[instrument(skip(self, message), level = "trace")]
    pub async fn send_arc(&self, message: Arc<dyn RivetMessage>) {
        let target = self
            .recipient_address
            .as_ref()
            .unwrap_or(&self.return_address);

        if target.outbox.is_closed() {
            warn!(recipient = %target.address, "Recipient inbox is closed; dropping message");
            return;
        }

        let envelope = Envelope::new(message, self.return_address.clone(), target.clone());
        trace!(
            sender = %self.return_address.address,
            recipient = %target.address,
            "Dispatching envelope"
        );
        tokio::select! {
            () = self.cancellation_token.cancelled() => {
                warn!(sender = %self.return_address.address, "Sender cancelled before message was delivered");
            }
            result = target.outbox.send(envelope) => {
                if let Err(e) = result {
                    error!(recipient = %target.address, "Failed to deliver message: {}", e);
                }
            }
        }
    }

    /// Sends an exit signal carrying `reason` to the recipient.
    pub async fn send_exit(&self, reason: ExitReason) {
        self.send(SystemSignal::Exit(reason)).await;
    }
}
