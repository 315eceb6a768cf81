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

use rivet_core::prelude::*;

#[rivet_message]
pub struct Tick;

#[rivet_message]
pub struct Finish;

#[rivet_message(by_value)]
pub struct Stop;

/// A batch of readings, handed to handlers as a copy-on-write `Param`.
#[rivet_message(remote)]
#[derive(PartialEq)]
pub struct Readings {
    pub values: Vec<i64>,
}
