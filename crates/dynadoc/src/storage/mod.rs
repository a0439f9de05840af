//! Storage backend implementations.
//!
//! This module provides concrete implementations of the
//! `dynadoc_core::DocumentStore` trait. The implementations are selected at
//! compile time via feature flags.
//!
//! # Feature Flags
//!
//! - `dynamodb` (default): AWS DynamoDB backend using `aws-sdk-dynamodb`
//! - `inmemory` (default): in-process backend with the same semantics, for tests
//!
//! Both backends can be enabled at the same time.

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "dynamodb")]
pub use dynamodb::{AttributeMapper, DynamoDbConfig, DynamoDbDocumentStore};

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryDocumentStore;
