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

//! Test support for Rivet actors.
//!
//! `#[rivet_test]` turns an `async fn` into a test running on a multi-threaded Tokio
//! runtime inside a `rivet_test` tracing span, with panics from any task reported
//! against the test.
//!
//! ```ignore
//! #[rivet_test(timeout_ms = 5000)]
//! async fn publishes_and_resolves() -> anyhow::Result<()> {
//!     Ok(())
//! }
//! ```

pub use rivet_test_macro::rivet_test;

#[doc(hidden)]
pub mod __private {
    pub use parking_lot;
    pub use tokio;
    pub use tracing;
}
