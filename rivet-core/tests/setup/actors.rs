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
#![allow(dead_code)]

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use parking_lot::Mutex;
use rivet_core::prelude::*;

#[rivet_actor]
pub struct Counter {
    pub count: usize,
}

/// Records everything it sees into a shared log the test can read afterwards.
#[rivet_actor]
pub struct Recorder {
    pub seen: Arc<Mutex<Vec<i32>>>,
}

/// Shared state a test hands to its actors' handlers.
#[derive(Debug, Clone, Default)]
pub struct Witness {
    pub stopped: Arc<AtomicUsize>,
    pub accesses: Arc<Mutex<Vec<Access>>>,
    pub results: Arc<Mutex<Vec<Vec<i32>>>>,
}
