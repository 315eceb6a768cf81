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

use std::sync::Arc;
use std::time::Instant;

use crate::message::MessageAddress;
use crate::traits::RivetMessage;

/// The unit carried through actor inboxes.
///
/// The payload is shared (`Arc`) so that broadcasting one message to many actors costs one
/// allocation; each recipient's `Param` later decides whether it may mutate in place.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub(crate) message: Arc<dyn RivetMessage>,
    pub(crate) timestamp: Instant,
    pub(crate) reply_to: MessageAddress,
    pub(crate) recipient: MessageAddress,
}

impl Envelope {
    pub(crate) fn new(
        message: Arc<dyn RivetMessage>,
        reply_to: MessageAddress,
        recipient: MessageAddress,
    ) -> Self {
        Self {
            message,
            timestamp: Instant::now(),
            reply_to,
            recipient,
        }
    }

    /// The moment the envelope was created.
    pub const fn timestamp(&self) -> &Instant {
        &self.timestamp
    }
}
