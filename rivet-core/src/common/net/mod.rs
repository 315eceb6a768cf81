//! TCP transport between nodes: publishing actors on ports and resolving endpoints to
//! stable handles.
//!
//! *   [`NetworkManager`]: owned by the runtime context, created together with the scheduler.
//! *   [`protocol`]: the length-prefixed frame format.
//! *   [`NetworkError`]: what publishing and resolving report.

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

pub use error::NetworkError;
pub use network_manager::NetworkManager;

mod error;
/// Connections to peer nodes, proxies, and inbound delivery.
mod link;
/// Accepting connections on published ports.
mod listener;
mod network_manager;
pub mod protocol;
/// Frame payloads.
pub mod wire;
