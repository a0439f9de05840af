use std::sync::Arc;

use async_trait::async_trait;

use super::{Document, DocumentKey, Result};

/// Service object used to retrieve and modify documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Updates atomically the body of multiple documents.
    ///
    /// Every document in `updated` is written with its version incremented,
    /// and every document in `checked` only has its version asserted. The
    /// whole set is applied as a single transaction, or not at all. A version
    /// mismatch fails with [`DocumentError::Conflict`] naming the first
    /// mismatching key, `updated` before `checked`, each in the given order.
    ///
    /// [`DocumentError::Conflict`]: super::DocumentError::Conflict
    async fn update_documents(&self, updated: &[Document], checked: &[Document]) -> Result<()>;

    /// Retrieves multiple documents given their IDs.
    ///
    /// Returns exactly one document per requested ID, in the same order.
    /// Missing documents are returned with no body and version `0`.
    async fn get_documents(&self, ids: &[DocumentKey]) -> Result<Vec<Document>>;

    /// Updates a single document.
    async fn update_document(&self, document: &Document) -> Result<()> {
        self.update_documents(std::slice::from_ref(document), &[])
            .await
    }

    /// Retrieves a single document.
    async fn get_document(&self, id: &DocumentKey) -> Result<Document> {
        let mut documents = self.get_documents(std::slice::from_ref(id)).await?;
        Ok(documents
            .pop()
            .unwrap_or_else(|| Document::absent(id.clone())))
    }
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn update_documents(&self, updated: &[Document], checked: &[Document]) -> Result<()> {
        (**self).update_documents(updated, checked).await
    }

    async fn get_documents(&self, ids: &[DocumentKey]) -> Result<Vec<Document>> {
        (**self).get_documents(ids).await
    }
}

#[async_trait]
impl<'a, T: DocumentStore + ?Sized> DocumentStore for &'a T {
    async fn update_documents(&self, updated: &[Document], checked: &[Document]) -> Result<()> {
        (**self).update_documents(updated, checked).await
    }

    async fn get_documents(&self, ids: &[DocumentKey]) -> Result<Vec<Document>> {
        (**self).get_documents(ids).await
    }
}
