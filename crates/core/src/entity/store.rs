use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::document::{Document, DocumentKey, DocumentStore, Result};

use super::{BatchBuilder, JsonEntity, JsonSerializer, SerdeJsonSerializer};

/// Service object used to retrieve and modify documents represented as
/// [`JsonEntity`] values.
#[derive(Debug, Clone)]
pub struct EntityStore<S, J = SerdeJsonSerializer> {
    documents: S,
    serializer: J,
}

impl<S: DocumentStore> EntityStore<S> {
    /// Creates an entity store using `serde_json` for bodies.
    pub fn new(documents: S) -> Self {
        Self::with_serializer(documents, SerdeJsonSerializer)
    }
}

impl<S: DocumentStore, J: JsonSerializer> EntityStore<S, J> {
    pub fn with_serializer(documents: S, serializer: J) -> Self {
        Self {
            documents,
            serializer,
        }
    }

    /// The underlying document store.
    pub fn documents(&self) -> &S {
        &self.documents
    }

    pub fn serializer(&self) -> &J {
        &self.serializer
    }

    /// Starts an empty batch against this store.
    pub fn batch(&self) -> BatchBuilder<'_, S, J> {
        BatchBuilder::new(self)
    }

    /// Updates atomically multiple entities.
    ///
    /// Entities in `checked` only have their version asserted; their values
    /// are never serialized.
    pub async fn update_entities<T, U>(
        &self,
        updated: &[JsonEntity<T>],
        checked: &[JsonEntity<U>],
    ) -> Result<()>
    where
        T: Serialize,
        U: Sync,
    {
        let updated = updated
            .iter()
            .map(|entity| self.serializer.to_document(entity))
            .collect::<Result<Vec<_>>>()?;

        let checked: Vec<Document> = checked
            .iter()
            .map(|entity| Document::new(entity.id.clone(), None, entity.version))
            .collect();

        self.documents.update_documents(&updated, &checked).await
    }

    /// Updates a single entity.
    pub async fn update_entity<T: Serialize>(&self, entity: &JsonEntity<T>) -> Result<()> {
        self.update_entities::<T, ()>(std::slice::from_ref(entity), &[])
            .await
    }

    /// Submits documents that were already serialized by a batch.
    pub(crate) async fn update_serialized(
        &self,
        updated: &[Document],
        checked: &[Document],
    ) -> Result<()> {
        self.documents.update_documents(updated, checked).await
    }

    /// Retrieves multiple entities given their IDs, in the requested order.
    pub async fn get_entities<T: DeserializeOwned>(
        &self,
        ids: &[DocumentKey],
    ) -> Result<Vec<JsonEntity<Option<T>>>> {
        self.documents
            .get_documents(ids)
            .await?
            .into_iter()
            .map(|document| self.serializer.from_document(document))
            .collect()
    }

    /// Retrieves a single entity.
    pub async fn get_entity<T: DeserializeOwned>(
        &self,
        id: &DocumentKey,
    ) -> Result<JsonEntity<Option<T>>> {
        let document = self.documents.get_document(id).await?;
        self.serializer.from_document(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        stored: HashMap<DocumentKey, Document>,
        updates: Mutex<Vec<(Vec<Document>, Vec<Document>)>>,
        reads: Mutex<Vec<Vec<DocumentKey>>>,
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn update_documents(&self, updated: &[Document], checked: &[Document]) -> Result<()> {
            self.updates
                .lock()
                .unwrap()
                .push((updated.to_vec(), checked.to_vec()));
            Ok(())
        }

        async fn get_documents(&self, ids: &[DocumentKey]) -> Result<Vec<Document>> {
            self.reads.lock().unwrap().push(ids.to_vec());
            Ok(ids
                .iter()
                .map(|id| {
                    self.stored
                        .get(id)
                        .cloned()
                        .unwrap_or_else(|| Document::absent(id.clone()))
                })
                .collect())
        }
    }

    fn ids() -> Vec<DocumentKey> {
        (0..3).map(|i| DocumentKey::new(format!("PK{}", i), "SK")).collect()
    }

    #[tokio::test]
    async fn test_update_entities_serializes_updated_only() {
        let store = EntityStore::new(RecordingStore::default());
        let ids = ids();

        store
            .update_entities(
                &[JsonEntity::new(ids[0].clone(), "abc", 1)],
                &[JsonEntity::new(ids[1].clone(), "ignored", 4)],
            )
            .await
            .unwrap();

        let updates = store.documents().updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0].0,
            vec![Document::new(ids[0].clone(), Some("\"abc\"".to_string()), 1)]
        );
        assert_eq!(updates[0].1, vec![Document::new(ids[1].clone(), None, 4)]);
    }

    #[tokio::test]
    async fn test_update_entity_with_none_deletes() {
        let store = EntityStore::new(RecordingStore::default());
        let ids = ids();

        store
            .update_entity(&JsonEntity::<Option<String>>::new(ids[0].clone(), None, 2))
            .await
            .unwrap();

        let updates = store.documents().updates.lock().unwrap();
        assert_eq!(updates[0].0, vec![Document::new(ids[0].clone(), None, 2)]);
        assert!(updates[0].1.is_empty());
    }

    #[tokio::test]
    async fn test_get_entities_preserves_order_and_absent() {
        let ids = ids();
        let mut backend = RecordingStore::default();
        backend.stored.insert(
            ids[1].clone(),
            Document::new(ids[1].clone(), Some("{\"n\":7}".to_string()), 3),
        );
        let store = EntityStore::new(backend);

        let entities: Vec<JsonEntity<Option<serde_json::Value>>> = store
            .get_entities(&[ids[1].clone(), ids[0].clone(), ids[1].clone()])
            .await
            .unwrap();

        assert_eq!(entities.len(), 3);
        assert_eq!(entities[0].entity, Some(serde_json::json!({ "n": 7 })));
        assert_eq!(entities[0].version, 3);
        assert_eq!(entities[1], JsonEntity::new(ids[0].clone(), None, 0));
        assert_eq!(entities[2].id, ids[1]);
    }

    #[tokio::test]
    async fn test_get_entity_absent() {
        let store = EntityStore::new(RecordingStore::default());
        let id = DocumentKey::new("PK", "SK");

        let entity: JsonEntity<Option<String>> = store.get_entity(&id).await.unwrap();

        assert_eq!(entity, JsonEntity::new(id.clone(), None, 0));
        assert_eq!(*store.documents().reads.lock().unwrap(), vec![vec![id]]);
    }
}
