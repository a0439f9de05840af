//! Typed entities on top of the document layer.
//!
//! [`EntityStore`] converts between [`JsonEntity`] values and raw documents
//! through a pluggable [`JsonSerializer`]. [`BatchBuilder`] accumulates the
//! writes and version checks of one atomic transaction, and
//! [`EntityStore::transaction`] re-runs a unit of work on conflicts according
//! to a [`RetryPolicy`].

mod batch;
mod json_entity;
mod serializer;
mod store;
mod transaction;

pub use batch::BatchBuilder;
pub use json_entity::JsonEntity;
pub use serializer::{JsonSerializer, SerdeJsonSerializer};
pub use store::EntityStore;
pub use transaction::{NoRetry, RetryConflicts, RetryPolicy};
