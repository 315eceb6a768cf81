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

use serde::{Deserialize, Serialize};

/// Lifecycle control messages understood by every actor.
///
/// Handlers cannot be registered for these; the wake loop intercepts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SystemSignal {
    /// Stop after finishing the messages already queued.
    Terminate,
    /// Stop immediately; queued messages are discarded.
    Exit(ExitReason),
}

/// Why an actor or a scoped context left the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    Normal,
    UserShutdown,
    Kill,
    /// The connection to the node hosting the actor went away.
    ConnectionLost,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Normal => "normal",
            Self::UserShutdown => "user_shutdown",
            Self::Kill => "kill",
            Self::ConnectionLost => "connection_lost",
        };
        f.write_str(text)
    }
}
