//! The [`DocumentStore`] trait.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::{
    batch::{BatchOutcome, WriteBatch},
    error::{StoreError, StoreResult},
    id::DocumentId,
    query::{Filter, Update},
};

/// Field that carries a document's store-assigned identity.
pub const ID_FIELD: &str = "_id";

/// A stored record: a JSON object keyed by [`ID_FIELD`] plus its attributes.
pub type Document = Map<String, Value>;

/// Counts reported by [`DocumentStore::update_one`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Documents that satisfied the filter (0 or 1).
    pub matched: u64,
    /// Documents whose content actually changed.
    pub modified: u64,
}

/// Counts reported by [`DocumentStore::delete_one`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted: u64,
}

/// Collection-scoped persistence primitives.
///
/// Each single-document call is atomic on its own. [`DocumentStore::commit`] extends
/// that guarantee to an ordered batch of writes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Logical database name, for logs.
    fn name(&self) -> &str;

    /// First document (in insertion order) matching `filter`.
    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>>;

    /// Every document matching `filter`. Callers must not rely on the order.
    async fn find_many(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>>;

    /// Insert `document`, assigning and returning a fresh identity.
    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<DocumentId>;

    /// Apply `update` to the first document matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateResult>;

    /// Remove the first document matching `filter`.
    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<DeleteResult>;

    /// Apply every step of `batch` or none of them.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<BatchOutcome>;
}

/// Serialize `value` into a document body. `value` must serialize to a JSON object.
pub fn to_document<T: Serialize>(collection: &str, value: &T) -> StoreResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::invalid_document(
            collection,
            format!("expected an object, got {other}"),
        )),
    }
}

/// Decode a stored document.
pub fn from_document<T: DeserializeOwned>(document: Document) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(document))?)
}
