//! Atomic multi-step writes.

use crate::{
    id::DocumentId,
    query::{Filter, Update},
    store::Document,
};

/// One step of a [`WriteBatch`].
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Insert a document; the store assigns its identity.
    Insert {
        collection: String,
        document: Document,
    },
    /// Update the first document matching `filter`.
    ///
    /// When `required`, the batch aborts unless a document is modified.
    Update {
        collection: String,
        filter: Filter,
        update: Update,
        required: bool,
    },
    /// Delete the first document matching `filter`.
    ///
    /// When `required`, the batch aborts unless a document is removed.
    Delete {
        collection: String,
        filter: Filter,
        required: bool,
    },
}

/// Ordered list of writes applied all-or-nothing by [`crate::DocumentStore::commit`].
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, collection: &str, document: Document) -> Self {
        self.ops.push(WriteOp::Insert {
            collection: collection.to_string(),
            document,
        });
        self
    }

    /// Update that must modify a document for the batch to commit.
    pub fn update_required(mut self, collection: &str, filter: Filter, update: Update) -> Self {
        self.ops.push(WriteOp::Update {
            collection: collection.to_string(),
            filter,
            update,
            required: true,
        });
        self
    }

    pub fn delete(self, collection: &str, filter: Filter) -> Self {
        self.push_delete(collection, filter, false)
    }

    /// Delete that must remove a document for the batch to commit.
    pub fn delete_required(self, collection: &str, filter: Filter) -> Self {
        self.push_delete(collection, filter, true)
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub(crate) fn len(&self) -> usize {
        self.ops.len()
    }

    fn push_delete(mut self, collection: &str, filter: Filter, required: bool) -> Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.to_string(),
            filter,
            required,
        });
        self
    }
}

/// Effect of a single committed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    Inserted(DocumentId),
    Updated { matched: u64, modified: u64 },
    Deleted(u64),
}

/// Result of committing a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every step was applied; results are in step order.
    Committed(Vec<WriteResult>),
    /// The required step at index `step` matched nothing; no step was applied.
    Aborted { step: usize },
}

impl BatchOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}
