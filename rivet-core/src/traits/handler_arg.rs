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

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;

use crate::message::{EmptyMessage, Param};
use crate::traits::RivetMessage;

/// Decides how a message reaches a handler registered with `mutate_on`.
///
/// The dispatcher downcasts the envelope's shared allocation to `Arc<Self>` and hands it to
/// [`HandlerArg::into_arg`]. Heavier values are wrapped in a copy-on-write [`Param`], which
/// shares the allocation with the envelope and any other recipients. Small `Copy` values and
/// framework markers are passed by value since the wrapper would cost more than the copy.
///
/// Implemented here for the primitive types, `String` and the standard collections.
/// User messages get an implementation from `#[rivet_message]`.
pub trait HandlerArg: RivetMessage + Clone {
    /// The type handed to the handler inside its `MessageContext`.
    type Arg: Send + 'static;

    /// Converts the shared message into the handler argument.
    fn into_arg(message: Arc<Self>) -> Self::Arg;
}

macro_rules! by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HandlerArg for $ty {
                type Arg = Self;

                #[inline]
                fn into_arg(message: Arc<Self>) -> Self::Arg {
                    *message
                }
            }
        )*
    };
}

by_value!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char, (),
    EmptyMessage,
);

impl HandlerArg for String {
    type Arg = Param<Self>;

    fn into_arg(message: Arc<Self>) -> Self::Arg {
        Param::from_arc(message)
    }
}

impl<T> HandlerArg for Vec<T>
where
    T: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    type Arg = Param<Self>;

    fn into_arg(message: Arc<Self>) -> Self::Arg {
        Param::from_arc(message)
    }
}

impl<T> HandlerArg for VecDeque<T>
where
    T: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    type Arg = Param<Self>;

    fn into_arg(message: Arc<Self>) -> Self::Arg {
        Param::from_arc(message)
    }
}

impl<K, V> HandlerArg for HashMap<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    type Arg = Param<Self>;

    fn into_arg(message: Arc<Self>) -> Self::Arg {
        Param::from_arc(message)
    }
}

impl<K, V> HandlerArg for BTreeMap<K, V>
where
    K: Clone + Ord + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    type Arg = Param<Self>;

    fn into_arg(message: Arc<Self>) -> Self::Arg {
        Param::from_arc(message)
    }
}

impl<T> HandlerArg for HashSet<T>
where
    T: Clone + Eq + Hash + Send + Sync + std::fmt::Debug + 'static,
{
    type Arg = Param<Self>;

    fn into_arg(message: Arc<Self>) -> Self::Arg {
        Param::from_arc(message)
    }
}

impl<T> HandlerArg for BTreeSet<T>
where
    T: Clone + Ord + Send + Sync + std::fmt::Debug + 'static,
{
    type Arg = Param<Self>;

    fn into_arg(message: Arc<Self>) -> Self::Arg {
        Param::from_arc(message)
    }
}
