//! Message types and the plumbing that carries them between actors.
//!
//! *   [`OutboundEnvelope`]: a message ready to be sent, carrying sender and recipient.
//! *   [`MessageAddress`]: the routable address of an actor, local or remote.
//! *   [`MessageContext`]: what a handler receives alongside the message.
//! *   [`Param`]: the copy-on-write wrapper most handlers receive their argument in.
//! *   [`SystemSignal`] and [`ExitReason`]: lifecycle control messages.
//! *   [`EmptyMessage`]: the payload-free marker with a shared per-system sentinel.

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

pub use empty::EmptyMessage;
pub(crate) use empty::EMPTY_TYPE_NAME;
pub use envelope::Envelope;
pub use message_address::MessageAddress;
pub use message_context::MessageContext;
pub use outbound_envelope::OutboundEnvelope;
pub use param::{Access, Param};
pub use signal::{ExitReason, SystemSignal};

mod empty;
/// Defines the internal `Envelope` used for channel communication.
mod envelope;
mod message_address;
/// Defines [`MessageContext`] passed to message handlers.
mod message_context;
mod outbound_envelope;
mod param;
mod signal;
