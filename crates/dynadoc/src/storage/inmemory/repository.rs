//! In-memory document store implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use dynadoc_core::document::{parse_body, DEFAULT_TOMBSTONE_RETENTION};
use dynadoc_core::{
    Clock, Document, DocumentError, DocumentKey, DocumentStore, Result, SystemClock,
};

/// Maximum number of items in one transaction, as enforced by DynamoDB.
pub const MAX_TRANSACTION_ITEMS: usize = 100;

#[derive(Debug, Clone)]
struct Record {
    body: Option<String>,
    version: i64,
    /// Epoch seconds after which a tombstone is gone.
    expires_at: Option<i64>,
}

impl Record {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory storage backend for testing.
///
/// Uses a HashMap wrapped in `Arc<RwLock<_>>` for thread-safe access; clones
/// share the same data. Data is not persisted and will be lost when the last
/// clone is dropped.
#[derive(Debug, Clone)]
pub struct InMemoryDocumentStore {
    records: Arc<RwLock<HashMap<DocumentKey, Record>>>,
    retention: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            retention: DEFAULT_TOMBSTONE_RETENTION,
            clock: Arc::new(SystemClock),
        }
    }

    /// Sets how long tombstones are kept.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> i64 {
        self.clock.now().timestamp()
    }

    /// Validates a request and returns the canonical body and next version of
    /// each updated document.
    fn validate_request(
        updated: &[Document],
        checked: &[Document],
    ) -> Result<Vec<(Option<String>, i64)>> {
        let count = updated.len() + checked.len();
        if count > MAX_TRANSACTION_ITEMS {
            return Err(DocumentError::backend(format!(
                "Transaction request cannot include more than {} items, got {}",
                MAX_TRANSACTION_ITEMS, count
            )));
        }

        let mut seen = HashSet::with_capacity(count);
        if let Some(duplicate) = updated
            .iter()
            .chain(checked)
            .find(|document| !seen.insert(&document.id))
        {
            return Err(DocumentError::backend(format!(
                "Transaction request cannot include multiple operations on one item: {}",
                duplicate.id
            )));
        }

        updated
            .iter()
            .map(|document| {
                let body = document
                    .body
                    .as_deref()
                    .map(|body| {
                        let fields = parse_body(body)?;
                        serde_json::to_string(&Value::Object(fields))
                            .map_err(|e| DocumentError::Serialization(e.to_string()))
                    })
                    .transpose()?;
                Ok((body, document.next_version()?))
            })
            .collect()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn update_documents(&self, updated: &[Document], checked: &[Document]) -> Result<()> {
        if updated.is_empty() && checked.is_empty() {
            return Ok(());
        }

        let writes = Self::validate_request(updated, checked)?;

        let mut records = self.records.write().await;
        let now = self.now();

        for document in updated.iter().chain(checked) {
            let current = records
                .get(&document.id)
                .filter(|record| !record.is_expired(now))
                .map(|record| record.version);

            let matches = match current {
                None => document.version == 0,
                Some(version) => document.version != 0 && version == document.version,
            };

            if !matches {
                tracing::debug!(id = %document.id, "Transaction cancelled by a version conflict");
                return Err(DocumentError::Conflict(document.id.clone()));
            }
        }

        let retention = i64::try_from(self.retention.as_secs()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(retention);
        for (document, (body, version)) in updated.iter().zip(writes) {
            let record = Record {
                expires_at: body.is_none().then_some(expires_at),
                body,
                version,
            };
            records.insert(document.id.clone(), record);
        }

        tracing::debug!(
            updated = updated.len(),
            checked = checked.len(),
            "Committed document transaction"
        );
        Ok(())
    }

    async fn get_documents(&self, ids: &[DocumentKey]) -> Result<Vec<Document>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let records = self.records.read().await;
        let now = self.now();

        tracing::trace!(requested = ids.len(), "Fetched documents");

        Ok(ids
            .iter()
            .map(|id| match records.get(id) {
                Some(record) if !record.is_expired(now) => {
                    Document::new(id.clone(), record.body.clone(), record.version)
                }
                _ => Document::absent(id.clone()),
            })
            .collect())
    }
}
