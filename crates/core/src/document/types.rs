use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{DocumentError, Result};

/// A key uniquely identifying a document in a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKey {
    pub partition_key: String,
    pub sort_key: String,
}

impl DocumentKey {
    /// Creates a key from its partition and sort components.
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(\"{}\", \"{}\")", self.partition_key, self.sort_key)
    }
}

/// A versioned JSON document.
///
/// `body` holds the JSON object text, or `None` when the document does not
/// exist or has been deleted. `version` is `0` for a document that has never
/// been written; every successful write stores `version + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// The unique identifier of the document.
    pub id: DocumentKey,
    /// The JSON body of the document, or `None` if the document does not exist.
    pub body: Option<String>,
    /// The current version of the document.
    pub version: i64,
}

impl Document {
    pub fn new(id: DocumentKey, body: Option<String>, version: i64) -> Self {
        Self { id, body, version }
    }

    /// The placeholder returned for a key with no stored record.
    pub fn absent(id: DocumentKey) -> Self {
        Self {
            id,
            body: None,
            version: 0,
        }
    }

    /// Returns true if the document has a body.
    pub fn exists(&self) -> bool {
        self.body.is_some()
    }

    /// The version stored by a successful write of this document.
    pub fn next_version(&self) -> Result<i64> {
        self.version.checked_add(1).ok_or_else(|| {
            DocumentError::InvalidData(format!("Version of document {} overflows", self.id))
        })
    }
}
