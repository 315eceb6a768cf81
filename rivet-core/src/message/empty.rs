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

use serde::{Deserialize, Serialize};

/// Wire name of [`EmptyMessage`]. Receivers substitute their own node's sentinel.
pub(crate) const EMPTY_TYPE_NAME: &str = "@empty";

/// A message with no payload.
///
/// Every actor system keeps one shared sentinel instance of this message
/// (see [`ActorSystem::empty_message`](crate::common::ActorSystem::empty_message)).
/// Payload-free replies reuse it instead of allocating.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmptyMessage;
