//! In-memory [`DocumentStore`] with optional JSON snapshot persistence.

use std::{collections::BTreeMap, fs, path::Path};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    batch::{BatchOutcome, WriteBatch, WriteOp, WriteResult},
    error::{StoreError, StoreResult},
    id::DocumentId,
    query::{Filter, Update},
    store::{DeleteResult, Document, DocumentStore, UpdateResult, ID_FIELD},
};

type Collections = BTreeMap<String, Vec<Document>>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    database: String,
    collections: Collections,
}

/// Document store held entirely in memory.
///
/// Collections keep insertion order. All writes, including whole batches, run under
/// one write lock, so every conditional update is linearizable.
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: RwLock::new(Collections::new()),
        }
    }

    /// Number of documents currently in `collection`.
    pub fn count(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, Vec::len)
    }

    /// Replace the contents of the store with the snapshot at `path`.
    ///
    /// A missing file leaves the store empty. Returns the number of documents loaded.
    pub fn load_snapshot(&self, path: &Path) -> StoreResult<usize> {
        if !path.exists() {
            tracing::info!(target: "shelf-db", path = %path.display(), "no snapshot found, starting empty");
            return Ok(0);
        }

        let raw = fs::read(path)?;
        let snapshot: Snapshot = serde_json::from_slice(&raw)?;

        for (collection, documents) in &snapshot.collections {
            for document in documents {
                let valid = document
                    .get(ID_FIELD)
                    .and_then(Value::as_str)
                    .is_some_and(|token| DocumentId::parse(token).is_ok());
                if !valid {
                    return Err(StoreError::invalid_document(
                        collection,
                        "snapshot document without a valid identity",
                    ));
                }
            }
        }

        let loaded = snapshot.collections.values().map(Vec::len).sum();
        if snapshot.database != self.name {
            tracing::warn!(
                target: "shelf-db",
                expected = %self.name,
                found = %snapshot.database,
                "snapshot was written by a different database"
            );
        }
        *self.collections.write() = snapshot.collections;

        tracing::info!(target: "shelf-db", path = %path.display(), documents = loaded, "snapshot loaded");
        Ok(loaded)
    }

    /// Write the current contents to `path`, replacing it atomically.
    pub fn save_snapshot(&self, path: &Path) -> StoreResult<()> {
        let snapshot = Snapshot {
            database: self.name.clone(),
            collections: self.collections.read().clone(),
        };
        let encoded = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let staging = path.with_extension("tmp");
        fs::write(&staging, encoded)?;
        fs::rename(&staging, path)?;

        tracing::info!(target: "shelf-db", path = %path.display(), "snapshot written");
        Ok(())
    }
}

fn insert(collections: &mut Collections, collection: &str, mut document: Document) -> StoreResult<DocumentId> {
    if document.contains_key(ID_FIELD) {
        return Err(StoreError::ImmutableField {
            field: ID_FIELD.to_string(),
        });
    }
    let id = DocumentId::generate();
    document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    collections.entry(collection.to_string()).or_default().push(document);
    Ok(id)
}

fn update(
    collections: &mut Collections,
    collection: &str,
    filter: &Filter,
    update: &Update,
) -> StoreResult<UpdateResult> {
    let Some(document) = collections
        .get_mut(collection)
        .and_then(|docs| docs.iter_mut().find(|doc| filter.matches(doc)))
    else {
        return Ok(UpdateResult::default());
    };

    let mut next = document.clone();
    let changed = update.apply(collection, &mut next)?;
    if changed {
        *document = next;
    }
    Ok(UpdateResult {
        matched: 1,
        modified: u64::from(changed),
    })
}

fn delete(collections: &mut Collections, collection: &str, filter: &Filter) -> DeleteResult {
    let Some(documents) = collections.get_mut(collection) else {
        return DeleteResult::default();
    };
    match documents.iter().position(|doc| filter.matches(doc)) {
        Some(index) => {
            documents.remove(index);
            DeleteResult { deleted: 1 }
        }
        None => DeleteResult::default(),
    }
}

fn op_collection(op: &WriteOp) -> &str {
    match op {
        WriteOp::Insert { collection, .. }
        | WriteOp::Update { collection, .. }
        | WriteOp::Delete { collection, .. } => collection,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| filter.matches(doc)))
            .cloned())
    }

    async fn find_many(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<DocumentId> {
        insert(&mut self.collections.write(), collection, document)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        changes: &Update,
    ) -> StoreResult<UpdateResult> {
        update(&mut self.collections.write(), collection, filter, changes)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<DeleteResult> {
        Ok(delete(&mut self.collections.write(), collection, filter))
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<BatchOutcome> {
        let mut collections = self.collections.write();

        // Stage copies of the touched collections; they replace the live ones only
        // when every step succeeds.
        let mut staged = Collections::new();
        for op in batch.ops() {
            let name = op_collection(op);
            if !staged.contains_key(name) {
                let current = collections.get(name).cloned().unwrap_or_default();
                staged.insert(name.to_string(), current);
            }
        }

        let mut results = Vec::with_capacity(batch.len());
        for (step, op) in batch.ops().iter().enumerate() {
            let result = match op {
                WriteOp::Insert {
                    collection,
                    document,
                } => WriteResult::Inserted(insert(&mut staged, collection, document.clone())?),
                WriteOp::Update {
                    collection,
                    filter,
                    update: changes,
                    required,
                } => {
                    let outcome = update(&mut staged, collection, filter, changes)?;
                    if *required && outcome.modified == 0 {
                        tracing::debug!(target: "shelf-db", step, %collection, "batch aborted on update");
                        return Ok(BatchOutcome::Aborted { step });
                    }
                    WriteResult::Updated {
                        matched: outcome.matched,
                        modified: outcome.modified,
                    }
                }
                WriteOp::Delete {
                    collection,
                    filter,
                    required,
                } => {
                    let outcome = delete(&mut staged, collection, filter);
                    if *required && outcome.deleted == 0 {
                        tracing::debug!(target: "shelf-db", step, %collection, "batch aborted on delete");
                        return Ok(BatchOutcome::Aborted { step });
                    }
                    WriteResult::Deleted(outcome.deleted)
                }
            };
            results.push(result);
        }

        collections.extend(staged);
        Ok(BatchOutcome::Committed(results))
    }
}
