use thiserror::Error;

use super::DocumentKey;

/// Boxed error raised by a storage backend.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur when reading or updating documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The expected version of a document did not match the stored version.
    #[error("The object {0} has been modified.")]
    Conflict(DocumentKey),
    #[error("{0}")]
    MalformedDocument(String),
    #[error("The document cannot use the special attribute \"{0}\".")]
    ReservedAttribute(String),
    #[error("Document {0} is already being modified.")]
    AlreadyModified(DocumentKey),
    #[error("A different version of document {id} is already being {state}.")]
    VersionMismatch {
        id: DocumentKey,
        state: &'static str,
    },
    #[error("Key {0} is missing in the map.")]
    MissingAttribute(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Any other failure reported by the backend, kept as-is in `source()`.
    #[error("Backend error: {0}")]
    Backend(#[source] BackendError),
}

impl DocumentError {
    /// Wraps a backend failure without interpreting it.
    pub fn backend(err: impl Into<BackendError>) -> Self {
        Self::Backend(err.into())
    }

    /// Returns true for an optimistic concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns the conflicting key, if this is a conflict.
    pub fn conflict_key(&self) -> Option<&DocumentKey> {
        match self {
            Self::Conflict(id) => Some(id),
            _ => None,
        }
    }
}

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn key() -> DocumentKey {
        DocumentKey::new("PK", "SK")
    }

    #[test]
    fn test_conflict_display() {
        let error = DocumentError::Conflict(key());
        assert_eq!(error.to_string(), "The object (\"PK\", \"SK\") has been modified.");
        assert!(error.is_conflict());
        assert_eq!(error.conflict_key(), Some(&key()));
    }

    #[test]
    fn test_reserved_attribute_display() {
        let error = DocumentError::ReservedAttribute("version".to_string());
        assert_eq!(
            error.to_string(),
            "The document cannot use the special attribute \"version\"."
        );
        assert!(!error.is_conflict());
    }

    #[test]
    fn test_already_modified_display() {
        let error = DocumentError::AlreadyModified(key());
        assert_eq!(
            error.to_string(),
            "Document (\"PK\", \"SK\") is already being modified."
        );
    }

    #[test]
    fn test_version_mismatch_display() {
        let error = DocumentError::VersionMismatch {
            id: key(),
            state: "checked",
        };
        assert_eq!(
            error.to_string(),
            "A different version of document (\"PK\", \"SK\") is already being checked."
        );
    }

    #[test]
    fn test_missing_attribute_display() {
        let error = DocumentError::MissingAttribute("sort_key".to_string());
        assert_eq!(error.to_string(), "Key sort_key is missing in the map.");
    }

    #[test]
    fn test_backend_keeps_source() {
        let error = DocumentError::backend("throughput exceeded");

        assert_eq!(error.to_string(), "Backend error: throughput exceeded");
        assert_eq!(
            error.source().map(|s| s.to_string()),
            Some("throughput exceeded".to_string())
        );
        assert_eq!(error.conflict_key(), None);
    }
}
