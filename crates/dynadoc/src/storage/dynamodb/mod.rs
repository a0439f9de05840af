//! DynamoDB storage backend implementation.
//!
//! Documents are stored one item per key in a single table keyed by
//! `partition_key` (HASH) and `sort_key` (RANGE). Updates go through
//! `TransactWriteItems` with a version condition per item; reads use
//! strongly consistent `BatchGetItem`.

mod attributes;
mod config;
mod conversions;
mod error;
mod repository;

pub use attributes::AttributeMapper;
pub use config::{create_client, DynamoDbConfig, DEFAULT_REGION, DEFAULT_TABLE_NAME};
pub use conversions::{attribute_to_json, json_to_attribute, Item};
pub use error::CONDITIONAL_CHECK_FAILED;
pub use repository::{DynamoDbDocumentStore, MAX_BATCH_GET_KEYS};
