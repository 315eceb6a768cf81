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

//! Shorthands for the boxed futures handlers and lifecycle hooks return.
//!
//! ```ignore
//! actor.mutate_on::<Tick>(|actor, _ctx| {
//!     actor.model.ticks += 1;
//!     Reply::ready()
//! });
//!
//! actor.mutate_on::<i32>(|_actor, ctx| {
//!     let reply = ctx.reply_envelope();
//!     let next = *ctx.message() + 1;
//!     Reply::pending(async move {
//!         reply.send(next).await;
//!     })
//! });
//! ```

use std::future::Future;

use crate::common::FutureBox;

/// Namespace for building handler return values.
pub struct Reply;

impl Reply {
    /// A handler result with no asynchronous work left to do.
    #[inline]
    pub fn ready() -> FutureBox {
        Box::pin(async {})
    }

    /// Boxes `future` as the handler result. It runs before the actor takes its next message.
    #[inline]
    pub fn pending<F>(future: F) -> FutureBox
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Box::pin(future)
    }
}
