use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::document::{Document, DocumentError, Result};

use super::JsonEntity;

/// Pluggable conversion between typed values and JSON text.
pub trait JsonSerializer: Send + Sync {
    /// Serializes a value to JSON text.
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<String>;

    /// Deserializes JSON text into a value.
    fn deserialize<T: DeserializeOwned>(&self, json: &str) -> Result<T>;

    /// Converts an entity to its document form.
    ///
    /// A value serializing to JSON `null` produces a document without body.
    fn to_document<T: Serialize>(&self, entity: &JsonEntity<T>) -> Result<Document> {
        let json = self.serialize(&entity.entity)?;
        let body = if json.trim() == "null" { None } else { Some(json) };

        Ok(Document::new(entity.id.clone(), body, entity.version))
    }

    /// Converts a document to an entity, with `None` for a missing body.
    fn from_document<T: DeserializeOwned>(&self, document: Document) -> Result<JsonEntity<Option<T>>> {
        let entity = document
            .body
            .as_deref()
            .map(|body| self.deserialize(body))
            .transpose()?;

        Ok(JsonEntity::new(document.id, entity, document.version))
    }
}

/// [`JsonSerializer`] backed by `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerdeJsonSerializer;

impl JsonSerializer for SerdeJsonSerializer {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        serde_json::to_string(value).map_err(|e| DocumentError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, json: &str) -> Result<T> {
        serde_json::from_str(json).map_err(|e| DocumentError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentKey;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Account {
        owner: String,
        balance: i64,
        nickname: Option<String>,
    }

    fn id() -> DocumentKey {
        DocumentKey::new("PK", "SK")
    }

    fn account() -> Account {
        Account {
            owner: "alice".to_string(),
            balance: 42,
            nickname: None,
        }
    }

    #[test]
    fn test_to_document_with_value() {
        let document = SerdeJsonSerializer
            .to_document(&JsonEntity::new(id(), account(), 3))
            .unwrap();

        assert_eq!(document.id, id());
        assert_eq!(document.version, 3);
        assert_eq!(
            document.body.as_deref(),
            Some("{\"owner\":\"alice\",\"balance\":42,\"nickname\":null}")
        );
    }

    #[test]
    fn test_to_document_with_none() {
        let entity: JsonEntity<Option<Account>> = JsonEntity::new(id(), None, 3);

        let document = SerdeJsonSerializer.to_document(&entity).unwrap();

        assert_eq!(document, Document::new(id(), None, 3));
    }

    #[test]
    fn test_from_document_with_body() {
        let document = Document::new(
            id(),
            Some("{\"owner\":\"alice\",\"balance\":42}".to_string()),
            5,
        );

        let entity: JsonEntity<Option<Account>> =
            SerdeJsonSerializer.from_document(document).unwrap();

        assert_eq!(entity, JsonEntity::new(id(), Some(account()), 5));
    }

    #[test]
    fn test_from_document_without_body() {
        let entity: JsonEntity<Option<Account>> = SerdeJsonSerializer
            .from_document(Document::absent(id()))
            .unwrap();

        assert_eq!(entity, JsonEntity::new(id(), None, 0));
    }

    #[test]
    fn test_from_document_invalid_body() {
        let document = Document::new(id(), Some("{\"owner\":1}".to_string()), 1);

        let result: Result<JsonEntity<Option<Account>>> =
            SerdeJsonSerializer.from_document(document);

        assert!(matches!(result, Err(DocumentError::Serialization(_))));
    }
}
