use serde::{Deserialize, Serialize};

use crate::document::DocumentKey;

/// A document whose body is represented as a typed value.
///
/// Entities read from a store are `JsonEntity<Option<T>>`: a missing or
/// deleted document has `entity: None`. Writing an entity whose value
/// serializes to JSON `null` deletes the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonEntity<T> {
    pub id: DocumentKey,
    pub entity: T,
    pub version: i64,
}

impl<T> JsonEntity<T> {
    pub fn new(id: DocumentKey, entity: T, version: i64) -> Self {
        Self {
            id,
            entity,
            version,
        }
    }

    /// Creates an entity that has never been written (version `0`).
    pub fn create(partition_key: impl Into<String>, sort_key: impl Into<String>, entity: T) -> Self {
        Self::new(DocumentKey::new(partition_key, sort_key), entity, 0)
    }

    /// Maps the value, keeping the ID and the base version.
    pub fn modify<U>(self, f: impl FnOnce(T) -> U) -> JsonEntity<U> {
        JsonEntity {
            id: self.id,
            entity: f(self.entity),
            version: self.version,
        }
    }
}

impl<T> JsonEntity<Option<T>> {
    /// Narrows the entity to an existing value, or `None` if it is absent.
    pub fn if_exists(self) -> Option<JsonEntity<T>> {
        let Self {
            id,
            entity,
            version,
        } = self;
        entity.map(|entity| JsonEntity::new(id, entity, version))
    }
}
