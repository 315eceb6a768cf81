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

/// Errors returned by a [`Scheduler`](crate::common::Scheduler).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// No scheduler is installed and none could be bootstrapped.
    NotStarted,
    /// The scheduler has been stopped and accepts no further work.
    Stopped,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "no scheduler is running"),
            Self::Stopped => write!(f, "scheduler has been stopped"),
        }
    }
}

impl std::error::Error for SchedulerError {}

/// Errors returned by [`ActorSystem::shutdown`](crate::common::ActorSystem::shutdown).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownError {
    /// Actors were still running when the configured drain timeout elapsed.
    /// Nothing was torn down.
    DrainTimeout {
        /// Number of actors still counted as running.
        running: usize,
    },
}

impl fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DrainTimeout { running } => {
                write!(f, "timed out waiting for {running} running actor(s) to finish")
            }
        }
    }
}

impl std::error::Error for ShutdownError {}

/// Returned when quitting a context that has already exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitError {
    AlreadyExited,
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExited => write!(f, "context has already exited"),
        }
    }
}

impl std::error::Error for ExitError {}

/// Errors returned by [`ScopedActor::receive`](crate::common::ScopedActor::receive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveError {
    /// No matching message arrived in time.
    Timeout,
    /// The inbox was closed.
    Closed,
}

impl fmt::Display for ReceiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out waiting for a message"),
            Self::Closed => write!(f, "inbox closed"),
        }
    }
}

impl std::error::Error for ReceiveError {}
