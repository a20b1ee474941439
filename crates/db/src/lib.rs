//! Document store facade for shelf.
//!
//! The ledger talks to persistence only through [`DocumentStore`]: a handful of
//! collection-scoped primitives (find, insert, update, delete) plus atomic
//! [`WriteBatch`] commits. [`MemoryStore`] is the bundled implementation.

pub mod batch;
pub mod error;
pub mod id;
pub mod memory;
pub mod query;
pub mod store;

pub use batch::{BatchOutcome, WriteBatch, WriteOp, WriteResult};
pub use error::{StoreError, StoreResult};
pub use id::DocumentId;
pub use memory::MemoryStore;
pub use query::{Filter, Update};
pub use store::{
    from_document, to_document, DeleteResult, Document, DocumentStore, UpdateResult, ID_FIELD,
};
