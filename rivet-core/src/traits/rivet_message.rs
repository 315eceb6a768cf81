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

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use dyn_clone::DynClone;

/// A marker trait for types that can travel through actor mailboxes.
///
/// Messages are stored type-erased as `Arc<dyn RivetMessage>` inside envelopes. The
/// `as_any` family restores the concrete type at dispatch time, and `into_any_arc`
/// converts the shared allocation itself so a handler can take part in its ownership
/// instead of copying the value out.
///
/// A blanket implementation covers every `Clone + Debug + Send + Sync + 'static` type.
///
/// When holding an `Arc<dyn RivetMessage>`, dereference before calling `as_any`
/// (`(*message).as_any()`); the `Arc` itself is also a message and would answer for itself.
pub trait RivetMessage: DynClone + Any + Send + Sync + Debug {
    /// Returns the message as a dynamic [`Any`] reference.
    fn as_any(&self) -> &dyn Any;

    /// Returns the message as a mutable dynamic [`Any`] reference.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Converts the shared allocation into an `Arc<dyn Any>` for downcasting.
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

dyn_clone::clone_trait_object!(RivetMessage);

impl<T> RivetMessage for T
where
    T: Any + Send + Sync + Debug + DynClone + 'static,
{
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    #[inline]
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erased_message_downcasts_without_copying() {
        let original = Arc::new(vec![1, 2, 3]);
        let erased: Arc<dyn RivetMessage> = original.clone();
        assert!((*erased).as_any().is::<Vec<i32>>());

        let restored = erased
            .into_any_arc()
            .downcast::<Vec<i32>>()
            .expect("downcast to the original type");
        assert!(Arc::ptr_eq(&original, &restored));
    }

    #[test]
    fn boxed_messages_clone_dynamically() {
        let boxed: Box<dyn RivetMessage> = Box::new(String::from("ping"));
        let copy = boxed.clone();
        assert_eq!((*copy).as_any().downcast_ref::<String>(), Some(&"ping".to_string()));
    }
}
