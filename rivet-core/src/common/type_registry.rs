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

//! The type-info map: portable names and JSON (de)serializers for message types.

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::common::net::NetworkError;
use crate::common::DecoratedNamesMap;
use crate::message::EmptyMessage;
use crate::traits::RivetMessage;

type DeserializerFn =
    Arc<dyn Fn(serde_json::Value) -> Result<Arc<dyn RivetMessage>, String> + Send + Sync>;

type SerializerFn = Arc<dyn Fn(&dyn RivetMessage) -> Result<serde_json::Value, String> + Send + Sync>;

/// Registry mapping portable type names to deserializers, and message types back to names
/// and serializers.
///
/// Only registered types can travel between nodes. Primitives, `String`, `()` and
/// [`EmptyMessage`] are registered from the start under their decorated names and are
/// reported by [`TypeRegistry::is_builtin`].
pub struct TypeRegistry {
    decorated: Arc<DecoratedNamesMap>,
    deserializers: DashMap<String, DeserializerFn>,
    type_id_to_name: DashMap<TypeId, String>,
    serializers: DashMap<TypeId, SerializerFn>,
    builtins: HashSet<TypeId>,
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("registered_types", &self.deserializers.len())
            .field("builtins", &self.builtins.len())
            .finish()
    }
}

macro_rules! builtins {
    ($registry:ident, $set:ident; $($ty:ty),* $(,)?) => {
        $(
            $registry.register_with_type_name::<$ty>();
            $set.insert(TypeId::of::<$ty>());
        )*
    };
}

impl TypeRegistry {
    pub fn new(decorated: Arc<DecoratedNamesMap>) -> Self {
        let mut registry = Self {
            decorated,
            deserializers: DashMap::new(),
            type_id_to_name: DashMap::new(),
            serializers: DashMap::new(),
            builtins: HashSet::new(),
        };
        let mut builtins = HashSet::new();
        builtins!(registry, builtins;
            i8, i16, i32, i64, i128, isize,
            u8, u16, u32, u64, u128, usize,
            f32, f64, bool, char, (), String, EmptyMessage,
        );
        registry.builtins = builtins;
        registry
    }

    /// Registers `M` under `name` and returns its type id.
    ///
    /// Both nodes of an exchange must register the type under the same name.
    pub fn register<M>(&self, name: &str) -> TypeId
    where
        M: RivetMessage + Serialize + DeserializeOwned + 'static,
    {
        let deserializer: DeserializerFn = Arc::new(|value: serde_json::Value| {
            let message: M = serde_json::from_value(value).map_err(|e| e.to_string())?;
            Ok(Arc::new(message) as Arc<dyn RivetMessage>)
        });
        self.deserializers.insert(name.to_string(), deserializer);

        let type_id = TypeId::of::<M>();
        self.type_id_to_name.insert(type_id, name.to_string());

        let serializer: SerializerFn = Arc::new(|message: &dyn RivetMessage| {
            let concrete = message
                .as_any()
                .downcast_ref::<M>()
                .ok_or_else(|| "Type mismatch during serialization".to_string())?;
            serde_json::to_value(concrete).map_err(|e| e.to_string())
        });
        self.serializers.insert(type_id, serializer);
        trace!(name, "Registered message type");
        type_id
    }

    /// Registers `M` under its decorated name (`Vec<i32>` becomes `@vec<@i32>`).
    pub fn register_with_type_name<M>(&self) -> TypeId
    where
        M: RivetMessage + Serialize + DeserializeOwned + 'static,
    {
        let name = self.decorated.of::<M>();
        self.register::<M>(&name)
    }

    /// Deserializes `value` as the type registered under `type_name`.
    pub fn deserialize(
        &self,
        type_name: &str,
        value: serde_json::Value,
    ) -> Result<Arc<dyn RivetMessage>, NetworkError> {
        let deserializer = self
            .deserializers
            .get(type_name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| NetworkError::UnknownMessageType(type_name.to_string()))?;
        deserializer(value).map_err(NetworkError::Serialization)
    }

    /// Serializes `message`, returning its registered name and JSON form.
    pub fn serialize(
        &self,
        message: &dyn RivetMessage,
    ) -> Result<(String, serde_json::Value), NetworkError> {
        let type_id = message.as_any().type_id();
        let name = self
            .type_name_of(&type_id)
            .ok_or_else(|| NetworkError::UnknownMessageType(format!("{message:?}")))?;
        let value = self
            .serialize_by_type_id(&type_id, message)
            .map_err(NetworkError::Serialization)?;
        Ok((name, value))
    }

    pub fn serialize_by_type_id(
        &self,
        type_id: &TypeId,
        message: &dyn RivetMessage,
    ) -> Result<serde_json::Value, String> {
        let serializer = self
            .serializers
            .get(type_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| "Type not registered for serialization".to_string())?;
        serializer(message)
    }

    #[must_use]
    pub fn type_name_of(&self, type_id: &TypeId) -> Option<String> {
        self.type_id_to_name.get(type_id).map(|name| name.clone())
    }

    /// Reports whether `type_id` is one of the pre-registered built-in types.
    #[must_use]
    pub fn is_builtin(&self, type_id: &TypeId) -> bool {
        self.builtins.contains(type_id)
    }

    #[must_use]
    pub fn is_registered(&self, type_name: &str) -> bool {
        self.deserializers.contains_key(type_name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.deserializers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deserializers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    struct Quote {
        symbol: String,
        price: f64,
    }

    fn registry() -> TypeRegistry {
        TypeRegistry::new(Arc::new(DecoratedNamesMap::new()))
    }

    #[test]
    fn builtins_are_preregistered() {
        let registry = registry();
        assert!(registry.is_registered("@i32"));
        assert!(registry.is_registered("@str"));
        assert!(registry.is_registered("@empty"));
        assert!(registry.is_builtin(&TypeId::of::<u64>()));
        assert!(registry.is_builtin(&TypeId::of::<EmptyMessage>()));
        assert!(!registry.is_builtin(&TypeId::of::<Quote>()));
        assert!(!registry.is_builtin(&TypeId::of::<Vec<i32>>()));
    }

    #[test]
    fn registered_types_survive_serialization() {
        let registry = registry();
        let id = registry.register::<Quote>("Quote");
        assert_eq!(id, TypeId::of::<Quote>());

        let quote = Quote {
            symbol: "RVT".to_string(),
            price: 12.5,
        };
        let (name, value) = registry.serialize(&quote).expect("serializable");
        assert_eq!(name, "Quote");

        let restored = registry.deserialize(&name, value).expect("deserializable");
        assert_eq!((*restored).as_any().downcast_ref::<Quote>(), Some(&quote));
    }

    #[test]
    fn decorated_registration_uses_portable_names() {
        let registry = registry();
        registry.register_with_type_name::<Vec<i32>>();
        assert!(registry.is_registered("@vec<@i32>"));
        assert_eq!(
            registry.type_name_of(&TypeId::of::<Vec<i32>>()).as_deref(),
            Some("@vec<@i32>")
        );
    }

    #[test]
    fn unknown_and_malformed_payloads_are_distinct_errors() {
        let registry = registry();
        assert!(matches!(
            registry.deserialize("Nope", serde_json::json!({})),
            Err(NetworkError::UnknownMessageType(_))
        ));
        assert!(matches!(
            registry.deserialize("@i32", serde_json::json!("seven")),
            Err(NetworkError::Serialization(_))
        ));
        assert!(matches!(
            registry.serialize(&Quote { symbol: String::new(), price: 0.0 }),
            Err(NetworkError::UnknownMessageType(_))
        ));
    }
}
