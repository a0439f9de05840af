//! DynamoDB document store implementation.
//!
//! Implements [`DocumentStore`] on top of `TransactWriteItems` and
//! `BatchGetItem`.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use aws_sdk_dynamodb::operation::query::builders::QueryFluentBuilder;
use aws_sdk_dynamodb::operation::scan::builders::ScanFluentBuilder;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, ConditionCheck, KeySchemaElement, KeyType,
    KeysAndAttributes, Put, ScalarAttributeType, TableStatus, TimeToLiveSpecification,
    TransactWriteItem,
};
use aws_sdk_dynamodb::Client;
use futures_util::Stream;

use dynadoc_core::document::{DELETED, PARTITION_KEY, SORT_KEY};
use dynadoc_core::{Document, DocumentError, DocumentKey, DocumentStore, Result};

use super::attributes::AttributeMapper;
use super::config::{create_client, DynamoDbConfig};
use super::conversions::Item;
use super::error::{map_sdk_error, map_transact_write_error};

/// Maximum number of keys DynamoDB accepts in one `BatchGetItem` request.
pub const MAX_BATCH_GET_KEYS: usize = 100;

/// Attempts made to fetch unprocessed keys before giving up.
const MAX_UNPROCESSED_RETRIES: u32 = 8;

const TABLE_ACTIVE_ATTEMPTS: u32 = 60;
const TABLE_ACTIVE_DELAY: Duration = Duration::from_secs(1);

/// DynamoDB-based document store.
#[derive(Debug, Clone)]
pub struct DynamoDbDocumentStore {
    client: Client,
    table_name: String,
    mapper: AttributeMapper,
}

impl DynamoDbDocumentStore {
    /// Creates a new store with the given DynamoDB client and table name.
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            mapper: AttributeMapper::default(),
        }
    }

    /// Replaces the attribute mapper (tombstone retention and clock).
    pub fn with_mapper(mut self, mapper: AttributeMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Creates a new store from explicit configuration.
    pub async fn from_config(config: &DynamoDbConfig) -> Self {
        let client = create_client(config).await;
        Self::new(client, config.table_name.clone())
            .with_mapper(AttributeMapper::new(config.tombstone_retention))
    }

    /// Creates a new store from environment configuration.
    ///
    /// See [`DynamoDbConfig::default`] for the variables read.
    pub async fn from_env() -> Self {
        Self::from_config(&DynamoDbConfig::default()).await
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn mapper(&self) -> &AttributeMapper {
        &self.mapper
    }

    /// Runs a query and streams the matching documents, following pagination.
    ///
    /// `configure` receives a request with the table name already set.
    pub fn query(
        &self,
        configure: impl FnOnce(QueryFluentBuilder) -> QueryFluentBuilder,
    ) -> impl Stream<Item = Result<Document>> + '_ {
        let request = configure(self.client.query().table_name(&self.table_name));
        let mapper = &self.mapper;

        try_stream! {
            let mut start_key: Option<Item> = None;
            loop {
                let output = request
                    .clone()
                    .set_exclusive_start_key(start_key.take())
                    .send()
                    .await
                    .map_err(map_sdk_error)?;

                for item in output.items.unwrap_or_default() {
                    yield mapper.to_document(&item)?;
                }

                start_key = output.last_evaluated_key.filter(|key| !key.is_empty());
                if start_key.is_none() {
                    break;
                }
            }
        }
    }

    /// Scans the table and streams every document, following pagination.
    pub fn scan(
        &self,
        configure: impl FnOnce(ScanFluentBuilder) -> ScanFluentBuilder,
    ) -> impl Stream<Item = Result<Document>> + '_ {
        let request = configure(self.client.scan().table_name(&self.table_name));
        let mapper = &self.mapper;

        try_stream! {
            let mut start_key: Option<Item> = None;
            loop {
                let output = request
                    .clone()
                    .set_exclusive_start_key(start_key.take())
                    .send()
                    .await
                    .map_err(map_sdk_error)?;

                for item in output.items.unwrap_or_default() {
                    yield mapper.to_document(&item)?;
                }

                start_key = output.last_evaluated_key.filter(|key| !key.is_empty());
                if start_key.is_none() {
                    break;
                }
            }
        }
    }

    /// Creates the documents table and enables TTL on the tombstone attribute.
    pub async fn create_table(&self) -> Result<()> {
        let key_schema = vec![
            KeySchemaElement::builder()
                .attribute_name(PARTITION_KEY)
                .key_type(KeyType::Hash)
                .build()
                .map_err(DocumentError::backend)?,
            KeySchemaElement::builder()
                .attribute_name(SORT_KEY)
                .key_type(KeyType::Range)
                .build()
                .map_err(DocumentError::backend)?,
        ];

        let attribute_definitions = vec![
            AttributeDefinition::builder()
                .attribute_name(PARTITION_KEY)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(DocumentError::backend)?,
            AttributeDefinition::builder()
                .attribute_name(SORT_KEY)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(DocumentError::backend)?,
        ];

        self.client
            .create_table()
            .table_name(&self.table_name)
            .set_key_schema(Some(key_schema))
            .set_attribute_definitions(Some(attribute_definitions))
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(map_sdk_error)?;

        self.wait_for_table_active().await?;

        let ttl = TimeToLiveSpecification::builder()
            .enabled(true)
            .attribute_name(DELETED)
            .build()
            .map_err(DocumentError::backend)?;

        self.client
            .update_time_to_live()
            .table_name(&self.table_name)
            .time_to_live_specification(ttl)
            .send()
            .await
            .map_err(map_sdk_error)?;

        tracing::info!(table = %self.table_name, "Created documents table");
        Ok(())
    }

    async fn wait_for_table_active(&self) -> Result<()> {
        for _ in 0..TABLE_ACTIVE_ATTEMPTS {
            let output = self
                .client
                .describe_table()
                .table_name(&self.table_name)
                .send()
                .await
                .map_err(map_sdk_error)?;

            let status = output.table().and_then(|table| table.table_status());
            if status == Some(&TableStatus::Active) {
                return Ok(());
            }

            tokio::time::sleep(TABLE_ACTIVE_DELAY).await;
        }

        Err(DocumentError::backend(format!(
            "Timeout waiting for table {} to become active",
            self.table_name
        )))
    }

    /// Fetches items for up to [`MAX_BATCH_GET_KEYS`] keys, re-requesting
    /// unprocessed keys with exponential backoff.
    async fn batch_get(&self, keys: Vec<Item>) -> Result<Vec<Item>> {
        let mut items = Vec::with_capacity(keys.len());
        let mut pending = keys;
        let mut attempt: u32 = 0;

        loop {
            let request = KeysAndAttributes::builder()
                .set_keys(Some(pending))
                .consistent_read(true)
                .build()
                .map_err(DocumentError::backend)?;

            let output = self
                .client
                .batch_get_item()
                .request_items(&self.table_name, request)
                .send()
                .await
                .map_err(map_sdk_error)?;

            if let Some(found) = output
                .responses
                .and_then(|mut responses| responses.remove(&self.table_name))
            {
                items.extend(found);
            }

            pending = output
                .unprocessed_keys
                .and_then(|mut unprocessed| unprocessed.remove(&self.table_name))
                .map(|request| request.keys)
                .unwrap_or_default();

            if pending.is_empty() {
                return Ok(items);
            }

            attempt += 1;
            if attempt > MAX_UNPROCESSED_RETRIES {
                tracing::warn!(
                    unprocessed = pending.len(),
                    attempts = attempt,
                    "Giving up on unprocessed keys"
                );
                return Err(DocumentError::backend(format!(
                    "{} keys left unprocessed after {} attempts",
                    pending.len(),
                    attempt
                )));
            }

            let delay = backoff(attempt);
            tracing::debug!(
                unprocessed = pending.len(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying unprocessed keys"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl DocumentStore for DynamoDbDocumentStore {
    async fn update_documents(&self, updated: &[Document], checked: &[Document]) -> Result<()> {
        if updated.is_empty() && checked.is_empty() {
            return Ok(());
        }

        let (items, keys) =
            build_transact_items(&self.table_name, &self.mapper, updated, checked)?;

        self.client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(|err| map_transact_write_error(err, &keys, &self.mapper))?;

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

        let mut seen = HashSet::new();
        let unique: Vec<&DocumentKey> = ids.iter().filter(|id| seen.insert(*id)).collect();

        let mut found: HashMap<DocumentKey, Document> = HashMap::with_capacity(unique.len());
        for chunk in unique.chunks(MAX_BATCH_GET_KEYS) {
            let keys = chunk
                .iter()
                .map(|id| self.mapper.to_key_attributes(id))
                .collect();

            for item in self.batch_get(keys).await? {
                let document = self.mapper.to_document(&item)?;
                found.insert(document.id.clone(), document);
            }
        }

        tracing::trace!(
            requested = ids.len(),
            found = found.len(),
            "Fetched documents"
        );

        Ok(ids
            .iter()
            .map(|id| {
                found
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| Document::absent(id.clone()))
            })
            .collect())
    }
}

/// Builds the transaction items for an update, paired with the key of each
/// item. Updated documents come first, then checked ones, each in caller order.
fn build_transact_items(
    table_name: &str,
    mapper: &AttributeMapper,
    updated: &[Document],
    checked: &[Document],
) -> Result<(Vec<TransactWriteItem>, Vec<Item>)> {
    let mut items = Vec::with_capacity(updated.len() + checked.len());
    let mut keys = Vec::with_capacity(updated.len() + checked.len());

    for document in updated {
        let put = Put::builder()
            .table_name(table_name)
            .set_item(Some(mapper.from_document(document)?))
            .condition_expression(condition_expression(document.version))
            .set_expression_attribute_values(condition_values(document.version))
            .build()
            .map_err(DocumentError::backend)?;

        items.push(TransactWriteItem::builder().put(put).build());
        keys.push(mapper.to_key_attributes(&document.id));
    }

    for document in checked {
        let key = mapper.to_key_attributes(&document.id);
        let check = ConditionCheck::builder()
            .table_name(table_name)
            .set_key(Some(key.clone()))
            .condition_expression(condition_expression(document.version))
            .set_expression_attribute_values(condition_values(document.version))
            .build()
            .map_err(DocumentError::backend)?;

        items.push(TransactWriteItem::builder().condition_check(check).build());
        keys.push(key);
    }

    Ok((items, keys))
}

/// Condition asserting the stored version, or absence for version `0`.
fn condition_expression(version: i64) -> String {
    if version == 0 {
        format!("attribute_not_exists({})", PARTITION_KEY)
    } else {
        "version = :version".to_string()
    }
}

fn condition_values(version: i64) -> Option<Item> {
    (version != 0).then(|| {
        Item::from([(
            ":version".to_string(),
            AttributeValue::N(version.to_string()),
        )])
    })
}

fn backoff(attempt: u32) -> Duration {
    let millis = 50u64.saturating_mul(1 << attempt.min(10));
    Duration::from_millis(millis).min(Duration::from_secs(5))
}
