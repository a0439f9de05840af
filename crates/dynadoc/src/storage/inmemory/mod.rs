//! In-memory storage backend for testing.
//!
//! This module provides an in-memory implementation of `DocumentStore` that
//! keeps every record in a `HashMap` wrapped in `Arc<RwLock<_>>`. It follows
//! the DynamoDB backend's rules (version conditions, tombstones, reserved
//! attributes, transaction limits) so code can be tested without DynamoDB.
//!
//! # Example
//!
//! ```rust,ignore
//! use dynadoc::storage::inmemory::InMemoryDocumentStore;
//! use dynadoc::EntityStore;
//!
//! let store = EntityStore::new(InMemoryDocumentStore::new());
//! // Use store for testing...
//! ```

mod repository;

pub use repository::{InMemoryDocumentStore, MAX_TRANSACTION_ITEMS};
