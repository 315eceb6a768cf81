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

//! Copy-on-write handler parameters.
//!
//! A [`Param<T>`] is how most handlers see their message. It starts out either `Shared`
//! (other envelopes or recipients still hold the same allocation) or `Exclusive` (the
//! handler's envelope is the only holder). Reads never copy. The first mutable access to a
//! `Shared` value clones it into a `Private` box owned by the wrapper, so the other
//! holders keep observing the original. `Exclusive` values are mutated in place.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// The ownership mode of a [`Param`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// The value lives in a message other holders may still read; mutation requires a copy.
    Shared,
    /// The value lives in a message with exactly one owner; mutation happens in place.
    Exclusive,
    /// The value is a copy owned by the wrapper alone.
    Private,
}

enum Slot<T> {
    Shared(Arc<T>),
    Exclusive(Arc<T>),
    Private(Box<T>),
}

/// A message argument that defers copying until a handler mutates a shared value.
///
/// `Param` is deliberately not `Clone`: duplicating the wrapper would duplicate ambiguous
/// ownership of a `Private` copy. Move it, or call [`Param::get`] and clone the value.
///
/// # Examples
///
/// ```rust,ignore
/// let shared = Arc::new(vec![3, 1, 2]);
/// let mut param = Param::new(shared.clone(), true);
/// param.get_mut().sort();
/// assert_eq!(*param, vec![1, 2, 3]);
/// assert_eq!(*shared, vec![3, 1, 2]);
/// ```
pub struct Param<T> {
    slot: Slot<T>,
}

impl<T: Clone> Param<T> {
    /// Wraps a message value, fixing the initial mode from `is_shared`.
    pub fn new(value: Arc<T>, is_shared: bool) -> Self {
        let slot = if is_shared {
            Slot::Shared(value)
        } else {
            Slot::Exclusive(value)
        };
        Self { slot }
    }

    /// Wraps a message value, treating it as shared while any other `Arc` or `Weak`
    /// points at the same allocation.
    pub fn from_arc(value: Arc<T>) -> Self {
        let is_shared = Arc::strong_count(&value) > 1 || Arc::weak_count(&value) > 0;
        Self::new(value, is_shared)
    }

    /// Wraps a value the caller already owns outright.
    pub fn private(value: T) -> Self {
        Self {
            slot: Slot::Private(Box::new(value)),
        }
    }

    /// Returns the current ownership mode.
    #[inline]
    pub fn access(&self) -> Access {
        match self.slot {
            Slot::Shared(_) => Access::Shared,
            Slot::Exclusive(_) => Access::Exclusive,
            Slot::Private(_) => Access::Private,
        }
    }

    /// Returns an immutable view of the value. Never copies.
    #[inline]
    pub fn get(&self) -> &T {
        match &self.slot {
            Slot::Shared(value) | Slot::Exclusive(value) => &**value,
            Slot::Private(value) => &**value,
        }
    }

    /// Returns a mutable reference that no other holder can observe.
    ///
    /// A `Shared` value is cloned into a `Private` copy on the first call; later calls reuse
    /// that copy. `Exclusive` and `Private` values are returned in place.
    pub fn get_mut(&mut self) -> &mut T {
        if let Slot::Shared(value) = &self.slot {
            let copy = Box::new(T::clone(value));
            self.slot = Slot::Private(copy);
        }
        match &mut self.slot {
            // Exclusive values are unique unless the caller lied about sharing, in which
            // case make_mut copies instead of aliasing.
            Slot::Shared(value) | Slot::Exclusive(value) => Arc::make_mut(value),
            Slot::Private(value) => &mut **value,
        }
    }

    /// Moves the value out, leaving `T::default()` behind in the wrapper.
    ///
    /// Equivalent to [`Param::get_mut`] followed by a move, so an exclusive value is
    /// forwarded without any copy.
    pub fn take(&mut self) -> T
    where
        T: Default,
    {
        std::mem::take(self.get_mut())
    }

    /// Consumes the wrapper and returns an owned value, copying only if the value is
    /// still shared with another holder.
    pub fn into_inner(self) -> T {
        match self.slot {
            Slot::Shared(value) | Slot::Exclusive(value) => Arc::unwrap_or_clone(value),
            Slot::Private(value) => *value,
        }
    }
}

impl<T: Clone> Deref for Param<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.get()
    }
}

impl<T: Clone> AsRef<T> for Param<T> {
    fn as_ref(&self) -> &T {
        self.get()
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Param<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("access", &self.access())
            .field("value", self.get())
            .finish()
    }
}

impl<T: Clone + PartialEq> PartialEq<T> for Param<T> {
    fn eq(&self, other: &T) -> bool {
        self.get() == other
    }
}
