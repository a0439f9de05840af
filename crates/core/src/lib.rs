//! Core types for the dynadoc document store.
//!
//! This crate holds everything that does not talk to a backend: the versioned
//! [`Document`] model, the [`DocumentStore`] contract, the typed
//! [`EntityStore`] layer and the batching/retry machinery built on top of it.
//! Backends live in the `dynadoc` crate.

pub mod document;
pub mod entity;

pub use document::{
    Clock, Document, DocumentError, DocumentKey, DocumentStore, FixedClock, Result, SystemClock,
};
pub use entity::{
    BatchBuilder, EntityStore, JsonEntity, JsonSerializer, NoRetry, RetryConflicts, RetryPolicy,
    SerdeJsonSerializer,
};
