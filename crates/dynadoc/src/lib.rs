//! Versioned JSON documents over DynamoDB.
//!
//! `dynadoc` stores JSON object bodies under a `(partition_key, sort_key)`
//! key together with a version counter, and updates them with optimistic
//! concurrency control: every write asserts the version it was based on and
//! fails with [`DocumentError::Conflict`] when another writer got there first.
//!
//! The backend-independent pieces ([`DocumentStore`], [`EntityStore`],
//! [`BatchBuilder`], retry policies) come from `dynadoc_core` and are
//! re-exported here; [`storage`] holds the backends.
//!
//! ```rust,ignore
//! use dynadoc::storage::DynamoDbDocumentStore;
//! use dynadoc::{EntityStore, RetryConflicts};
//!
//! let store = EntityStore::new(DynamoDbDocumentStore::from_env().await);
//! store
//!     .transaction(&RetryConflicts::new(3), async |batch| {
//!         let account = store.get_entity::<Account>(&id).await?;
//!         if let Some(account) = account.if_exists() {
//!             batch.modify_with(account, |account| account.deposit(10))?;
//!         }
//!         Ok::<_, dynadoc::DocumentError>(())
//!     })
//!     .await?;
//! ```

pub mod storage;

pub use dynadoc_core::document;
pub use dynadoc_core::entity;
pub use dynadoc_core::{
    BatchBuilder, Clock, Document, DocumentError, DocumentKey, DocumentStore, EntityStore,
    FixedClock, JsonEntity, JsonSerializer, NoRetry, Result, RetryConflicts, RetryPolicy,
    SerdeJsonSerializer, SystemClock,
};
