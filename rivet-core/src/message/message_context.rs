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

use static_assertions::assert_impl_all;

use crate::message::{MessageAddress, OutboundEnvelope};
use crate::traits::HandlerArg;

/// What a handler receives: its argument plus the routing details of the delivery.
///
/// The argument is the message's [`HandlerArg::Arg`], usually a [`Param`](crate::message::Param)
/// that shares the payload with every other recipient until the handler mutates it.
pub struct MessageContext<M: HandlerArg> {
    pub(crate) message: M::Arg,
    pub(crate) origin_envelope: OutboundEnvelope,
    pub(crate) reply_envelope: OutboundEnvelope,
}

impl<M: HandlerArg> MessageContext<M> {
    /// Returns a clone of the envelope the message arrived in.
    pub fn origin_envelope(&self) -> OutboundEnvelope {
        self.origin_envelope.clone()
    }

    /// Returns an envelope addressed to the sender.
    pub fn reply_envelope(&self) -> OutboundEnvelope {
        self.reply_envelope.clone()
    }

    /// Creates an envelope for `recipient` that keeps this actor as the return address.
    pub fn new_envelope(&self, recipient: &MessageAddress) -> OutboundEnvelope {
        OutboundEnvelope::new_with_recipient(
            self.reply_envelope.return_address.clone(),
            recipient.clone(),
            self.origin_envelope.cancellation_token.clone(),
        )
    }

    /// Returns the handler argument.
    pub const fn message(&self) -> &M::Arg {
        &self.message
    }

    /// Returns the handler argument mutably.
    ///
    /// For [`Param`](crate::message::Param) arguments, mutation through the returned value
    /// copies the payload first when other recipients still share it.
    pub fn message_mut(&mut self) -> &mut M::Arg {
        &mut self.message
    }

    /// Consumes the context and returns the handler argument.
    pub fn into_message(self) -> M::Arg {
        self.message
    }
}

impl<M: HandlerArg> fmt::Debug for MessageContext<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageContext")
            .field("message_type", &std::any::type_name::<M>())
            .field("sender", &self.origin_envelope.return_address.address)
            .finish_non_exhaustive()
    }
}

assert_impl_all!(MessageContext<i32>: Send);
assert_impl_all!(MessageContext<String>: Send);
