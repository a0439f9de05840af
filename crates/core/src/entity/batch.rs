use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;

use crate::document::{Document, DocumentError, DocumentKey, DocumentStore, Result};

use super::{EntityStore, JsonEntity, JsonSerializer};

/// Accumulates the writes and version checks of one atomic transaction.
///
/// A key is either modified once or checked at a single version per batch.
/// Every call validates all of its entities before changing any state, so a
/// failing call leaves the batch as it was. After a failed [`submit`] the
/// batch should be discarded.
///
/// Documents are submitted in the order their keys were first added, so a
/// conflict names the earliest declared stale key.
///
/// [`submit`]: BatchBuilder::submit
pub struct BatchBuilder<'a, S, J> {
    store: &'a EntityStore<S, J>,
    checked: IndexMap<DocumentKey, Document>,
    modified: IndexMap<DocumentKey, Document>,
}

impl<'a, S: DocumentStore, J: JsonSerializer> BatchBuilder<'a, S, J> {
    pub fn new(store: &'a EntityStore<S, J>) -> Self {
        Self {
            store,
            checked: IndexMap::new(),
            modified: IndexMap::new(),
        }
    }

    /// Adds entities to be written.
    ///
    /// An entity already checked at the same version is moved from the
    /// checked set to the modified set.
    pub fn modify<T: Serialize>(&mut self, entities: &[JsonEntity<T>]) -> Result<()> {
        let mut staged: IndexMap<DocumentKey, Document> = IndexMap::new();
        let mut promoted: HashSet<DocumentKey> = HashSet::new();

        for entity in entities {
            if self.modified.contains_key(&entity.id) || staged.contains_key(&entity.id) {
                return Err(DocumentError::AlreadyModified(entity.id.clone()));
            }

            if let Some(existing) = self.checked.get(&entity.id) {
                if existing.version != entity.version {
                    return Err(DocumentError::VersionMismatch {
                        id: entity.id.clone(),
                        state: "checked",
                    });
                }
                promoted.insert(entity.id.clone());
            }

            let document = self.store.serializer().to_document(entity)?;
            staged.insert(entity.id.clone(), document);
        }

        for id in &promoted {
            self.checked.shift_remove(id);
        }
        self.modified.extend(staged);

        Ok(())
    }

    /// Maps an entity and adds the result to the batch.
    pub fn modify_with<T, U: Serialize>(
        &mut self,
        entity: JsonEntity<T>,
        f: impl FnOnce(T) -> U,
    ) -> Result<()> {
        self.modify(&[entity.modify(f)])
    }

    /// Adds entities whose version must be unchanged when the batch is
    /// submitted, without writing them.
    pub fn check<T>(&mut self, entities: &[JsonEntity<T>]) -> Result<()> {
        let mut staged: IndexMap<DocumentKey, Document> = IndexMap::new();

        for entity in entities {
            let known = self
                .checked
                .get(&entity.id)
                .or_else(|| staged.get(&entity.id))
                .map(|document| (document.version, "checked"))
                .or_else(|| {
                    self.modified
                        .get(&entity.id)
                        .map(|document| (document.version, "modified"))
                });

            match known {
                Some((version, _)) if version == entity.version => continue,
                Some((_, state)) => {
                    return Err(DocumentError::VersionMismatch {
                        id: entity.id.clone(),
                        state,
                    })
                }
                None => {
                    staged.insert(
                        entity.id.clone(),
                        Document::new(entity.id.clone(), None, entity.version),
                    );
                }
            }
        }

        self.checked.extend(staged);

        Ok(())
    }

    /// Returns true if nothing has been added to the batch.
    pub fn is_empty(&self) -> bool {
        self.checked.is_empty() && self.modified.is_empty()
    }

    /// Documents that will be written, in insertion order.
    pub fn modified(&self) -> impl Iterator<Item = &Document> {
        self.modified.values()
    }

    /// Documents whose version will be asserted, in insertion order.
    pub fn checked(&self) -> impl Iterator<Item = &Document> {
        self.checked.values()
    }

    /// Submits the batch as one atomic update and clears it on success.
    pub async fn submit(&mut self) -> Result<()> {
        let updated: Vec<Document> = self.modified.values().cloned().collect();
        let checked: Vec<Document> = self.checked.values().cloned().collect();

        self.store.update_serialized(&updated, &checked).await?;

        self.checked.clear();
        self.modified.clear();

        Ok(())
    }
}
