//! Mapping between [`Document`]s and DynamoDB items.
//!
//! An item holds the document key, its version and either the body fields at
//! top level or a `deleted` tombstone carrying an epoch-seconds expiry that
//! DynamoDB's TTL uses to remove the item.

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_dynamodb::types::AttributeValue;
use dynadoc_core::document::{
    is_reserved_attribute, parse_body, DEFAULT_TOMBSTONE_RETENTION, DELETED, PARTITION_KEY,
    SORT_KEY, VERSION,
};
use dynadoc_core::{Clock, Document, DocumentError, DocumentKey, Result, SystemClock};
use serde_json::Value;

use super::conversions::{attributes_to_json, get_i64, get_string, json_to_attribute, Item};

/// Converts documents to DynamoDB items and back.
#[derive(Debug, Clone)]
pub struct AttributeMapper {
    retention: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for AttributeMapper {
    fn default() -> Self {
        Self::new(DEFAULT_TOMBSTONE_RETENTION)
    }
}

impl AttributeMapper {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            clock: Arc::new(SystemClock),
        }
    }

    /// Uses `clock` to compute tombstone expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Builds the item stored for `document`, at version `document.version + 1`.
    pub fn from_document(&self, document: &Document) -> Result<Item> {
        let fields = document.body.as_deref().map(parse_body).transpose()?;

        let mut item = self.to_key_attributes(&document.id);
        item.insert(
            VERSION.to_string(),
            AttributeValue::N(document.next_version()?.to_string()),
        );

        match fields {
            Some(fields) => {
                for (name, value) in &fields {
                    item.insert(name.clone(), json_to_attribute(value));
                }
            }
            None => {
                item.insert(
                    DELETED.to_string(),
                    AttributeValue::N(self.tombstone_expiry().to_string()),
                );
            }
        }

        Ok(item)
    }

    /// Reads a document back from a stored item.
    pub fn to_document(&self, item: &Item) -> Result<Document> {
        let id = self.from_key_attributes(item)?;
        let version = get_i64(item, VERSION)?;

        if item.contains_key(DELETED) {
            return Ok(Document::new(id, None, version));
        }

        let fields = attributes_to_json(
            item.iter()
                .filter(|(name, _)| !is_reserved_attribute(name)),
        )?;
        let body = serde_json::to_string(&Value::Object(fields))
            .map_err(|e| DocumentError::Serialization(e.to_string()))?;

        Ok(Document::new(id, Some(body), version))
    }

    /// Projects a key to its DynamoDB key attributes.
    pub fn to_key_attributes(&self, id: &DocumentKey) -> Item {
        Item::from([
            (
                PARTITION_KEY.to_string(),
                AttributeValue::S(id.partition_key.clone()),
            ),
            (SORT_KEY.to_string(), AttributeValue::S(id.sort_key.clone())),
        ])
    }

    pub fn from_key_attributes(&self, item: &Item) -> Result<DocumentKey> {
        Ok(DocumentKey::new(
            get_string(item, PARTITION_KEY)?,
            get_string(item, SORT_KEY)?,
        ))
    }

    fn tombstone_expiry(&self) -> i64 {
        let retention = i64::try_from(self.retention.as_secs()).unwrap_or(i64::MAX);
        self.clock.now().timestamp().saturating_add(retention)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dynadoc_core::FixedClock;
    use proptest::prelude::*;
    use serde_json::json;

    fn id() -> DocumentKey {
        DocumentKey::new("PK", "SK")
    }

    fn mapper() -> AttributeMapper {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        AttributeMapper::new(Duration::from_secs(3600)).with_clock(Arc::new(FixedClock::new(now)))
    }

    fn parse(body: &str) -> Value {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_from_document_with_body() {
        let document = Document::new(id(), Some(r#"{"a":1,"b":"x"}"#.to_string()), 3);

        let item = mapper().from_document(&document).unwrap();

        assert_eq!(item.len(), 5);
        assert_eq!(item[PARTITION_KEY], AttributeValue::S("PK".to_string()));
        assert_eq!(item[SORT_KEY], AttributeValue::S("SK".to_string()));
        assert_eq!(item[VERSION], AttributeValue::N("4".to_string()));
        assert_eq!(item["a"], AttributeValue::N("1".to_string()));
        assert_eq!(item["b"], AttributeValue::S("x".to_string()));
    }

    #[test]
    fn test_from_document_tombstone() {
        let document = Document::new(id(), None, 3);

        let item = mapper().from_document(&document).unwrap();

        assert_eq!(item.len(), 4);
        assert_eq!(item[VERSION], AttributeValue::N("4".to_string()));
        // 2024-01-01T00:00:00Z plus one hour.
        assert_eq!(item[DELETED], AttributeValue::N("1704070800".to_string()));
    }

    #[test]
    fn test_from_document_not_an_object() {
        let document = Document::new(id(), Some("[1, 2]".to_string()), 0);

        let result = mapper().from_document(&document);

        assert!(matches!(result, Err(DocumentError::MalformedDocument(_))));
    }

    #[test]
    fn test_from_document_invalid_json() {
        let document = Document::new(id(), Some("{".to_string()), 0);

        let result = mapper().from_document(&document);

        assert!(matches!(result, Err(DocumentError::MalformedDocument(_))));
    }

    #[test]
    fn test_from_document_reserved_attribute() {
        for reserved in [PARTITION_KEY, SORT_KEY, VERSION, DELETED] {
            let body = format!(r#"{{"a":1,"{}":2}}"#, reserved);
            let document = Document::new(id(), Some(body), 0);

            let result = mapper().from_document(&document);

            assert!(
                matches!(&result, Err(DocumentError::ReservedAttribute(name)) if name == reserved),
                "unexpected result for {}: {:?}",
                reserved,
                result
            );
        }
    }

    #[test]
    fn test_from_document_version_overflow() {
        let document = Document::new(id(), Some(r#"{"a":1}"#.to_string()), i64::MAX);

        let err = mapper().from_document(&document).unwrap_err();

        assert!(matches!(err, DocumentError::InvalidData(_)));
    }

    #[test]
    fn test_to_document_tombstone() {
        let item = mapper()
            .from_document(&Document::new(id(), None, 7))
            .unwrap();

        let document = mapper().to_document(&item).unwrap();

        assert_eq!(document, Document::new(id(), None, 8));
    }

    #[test]
    fn test_to_document_missing_version() {
        let item = mapper().to_key_attributes(&id());

        let result = mapper().to_document(&item);

        assert!(matches!(result, Err(DocumentError::MissingAttribute(name)) if name == VERSION));
    }

    #[test]
    fn test_to_document_missing_key() {
        let mut item = mapper().to_key_attributes(&id());
        item.remove(SORT_KEY);
        item.insert(VERSION.to_string(), AttributeValue::N("1".to_string()));

        let result = mapper().to_document(&item);

        assert!(matches!(result, Err(DocumentError::MissingAttribute(name)) if name == SORT_KEY));
    }

    #[test]
    fn test_to_document_empty_body() {
        let item = mapper()
            .from_document(&Document::new(id(), Some("{}".to_string()), 0))
            .unwrap();

        let document = mapper().to_document(&item).unwrap();

        assert_eq!(document.body.as_deref(), Some("{}"));
        assert_eq!(document.version, 1);
    }

    #[test]
    fn test_key_attributes_round_trip() {
        let mapper = mapper();

        let key = mapper.from_key_attributes(&mapper.to_key_attributes(&id())).unwrap();

        assert_eq!(key, id());
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            (any::<i32>(), 1u32..1_000_000).prop_map(|(int, frac)| {
                serde_json::from_str(&format!("{}.{}", int, frac)).unwrap()
            }),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
        ];

        leaf.prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..6)
                    .prop_map(|fields| Value::Object(fields.into_iter().collect())),
            ]
        })
    }

    fn arb_body() -> impl Strategy<Value = Value> {
        prop::collection::btree_map("[a-z_]{1,10}", arb_json(), 0..8).prop_map(|fields| {
            Value::Object(
                fields
                    .into_iter()
                    .filter(|(name, _)| !is_reserved_attribute(name))
                    .collect(),
            )
        })
    }

    proptest! {
        #[test]
        fn test_document_round_trip(body in arb_body(), version in 0i64..1_000_000) {
            let mapper = mapper();
            let document = Document::new(id(), Some(body.to_string()), version);

            let item = mapper.from_document(&document).unwrap();
            let result = mapper.to_document(&item).unwrap();

            prop_assert_eq!(&result.id, &document.id);
            prop_assert_eq!(result.version, version + 1);
            prop_assert_eq!(parse(result.body.as_deref().unwrap()), body);
        }
    }
}
