//! Book inventory and rental bookkeeping.
//!
//! A book's `availableCount` and the rental rows pointing at it move together.
//! Multi-step operations are committed as one [`WriteBatch`], so their
//! intermediate states are never observable:
//!
//! | Operation | Steps (commit order) | Abort mapping |
//! |---|---|---|
//! | rent   | `ReserveCopy` (decrement where `availableCount > 0`), `RecordRental` | `ReserveCopy` → conflict |
//! | return | `RestoreCopy` (increment below `u32::MAX`), `CloseRental` (delete one rental row) | `RestoreCopy` → copy limit or internal, `CloseRental` → not rented |
//! | delete | `DropRental` (optional), `DropBook` | `DropBook` → not found |
//!
//! The conditional decrement in `ReserveCopy` is what keeps the count from going
//! negative when rents race: exactly one of them matches the last copy.

use std::sync::Arc;

use shelf_db::{
    from_document, to_document, BatchOutcome, DocumentId, DocumentStore, Filter, Update,
    WriteBatch,
};

use super::{
    error::{LedgerError, LedgerResult},
    models::{Book, BookPatch, BookRecord, DeleteConfirmation, NewBook, Rental, RentalRecord},
};

/// Collection holding [`Book`] documents.
pub const BOOKS: &str = "books";
/// Collection holding [`Rental`] documents.
pub const RENTALS: &str = "rentals";

const AVAILABLE_COUNT: &str = "availableCount";
const TITLE: &str = "title";
const BOOK_ID: &str = "bookID";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RentStep {
    ReserveCopy,
    RecordRental,
}

impl RentStep {
    fn at(step: usize) -> Option<Self> {
        [Self::ReserveCopy, Self::RecordRental].get(step).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReturnStep {
    RestoreCopy,
    CloseRental,
}

impl ReturnStep {
    fn at(step: usize) -> Option<Self> {
        [Self::RestoreCopy, Self::CloseRental].get(step).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeleteStep {
    DropRental,
    DropBook,
}

impl DeleteStep {
    fn at(step: usize) -> Option<Self> {
        [Self::DropRental, Self::DropBook].get(step).copied()
    }
}

/// The rental ledger: every book and rental operation, over an explicitly passed store.
#[derive(Clone)]
pub struct RentalLedger {
    store: Arc<dyn DocumentStore>,
}

impl RentalLedger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Parse a book identity taken from a route parameter.
    pub fn parse_id(token: &str) -> LedgerResult<DocumentId> {
        DocumentId::parse(token).map_err(|_| LedgerError::InvalidId(token.to_string()))
    }

    /// Add copies of a title.
    ///
    /// An existing title (exact match) has its count raised by the requested copies;
    /// the returned book reflects that increment without re-reading. A new title is
    /// inserted with at least one copy. Raising a count past `u32::MAX` is a conflict
    /// and leaves the stored book untouched.
    pub async fn add_book(&self, input: NewBook) -> LedgerResult<Book> {
        let by_title = Filter::new().eq(TITLE, input.title.as_str());

        if let Some(document) = self.store.find_one(BOOKS, &by_title).await? {
            let mut book: Book = from_document(document)?;
            let added = input.available_count.unwrap_or(0);
            let total = book
                .available_count
                .checked_add(added)
                .ok_or(LedgerError::CopyLimitReached(book.id))?;

            // The bound keeps a concurrent increment from pushing the count past u32
            let result = self
                .store
                .update_one(
                    BOOKS,
                    &Filter::by_id(book.id).lt(AVAILABLE_COUNT, below_limit(added)),
                    &Update::new().inc(AVAILABLE_COUNT, i64::from(added)),
                )
                .await?;
            if result.matched == 0 {
                self.get_book(book.id).await?;
                return Err(LedgerError::CopyLimitReached(book.id));
            }
            book.available_count = total;

            tracing::info!(
                book_id = %book.id,
                title = %book.title,
                added,
                available_count = book.available_count,
                "increased copies of existing book"
            );
            return Ok(book);
        }

        let available_count = match input.available_count {
            None | Some(0) => 1,
            Some(count) => count,
        };
        let record = BookRecord {
            title: &input.title,
            author: input.author.as_deref(),
            available_count,
        };
        let id = self
            .store
            .insert_one(BOOKS, to_document(BOOKS, &record)?)
            .await?;

        tracing::info!(book_id = %id, title = %input.title, available_count, "book added");
        Ok(Book {
            id,
            title: input.title,
            author: input.author,
            available_count,
        })
    }

    /// Every stored book, in no particular order.
    pub async fn list_books(&self) -> LedgerResult<Vec<Book>> {
        let documents = self.store.find_many(BOOKS, &Filter::new()).await?;
        let books = documents
            .into_iter()
            .map(from_document)
            .collect::<Result<Vec<Book>, _>>()?;
        Ok(books)
    }

    pub async fn get_book(&self, id: DocumentId) -> LedgerResult<Book> {
        match self.store.find_one(BOOKS, &Filter::by_id(id)).await? {
            Some(document) => Ok(from_document(document)?),
            None => Err(LedgerError::BookNotFound(id)),
        }
    }

    /// Merge `patch` into the book and return the result.
    ///
    /// A patch that changes nothing is not an error; the current book is returned.
    pub async fn update_book(&self, id: DocumentId, patch: BookPatch) -> LedgerResult<Book> {
        let update = Update::new().set_all(patch.into_fields());
        let result = self
            .store
            .update_one(BOOKS, &Filter::by_id(id), &update)
            .await?;

        if result.matched == 0 {
            return Err(LedgerError::BookNotFound(id));
        }
        if result.modified == 0 {
            tracing::debug!(book_id = %id, "patch left book unchanged");
        } else {
            tracing::info!(book_id = %id, "book updated");
        }

        self.get_book(id).await
    }

    /// Delete a book and at most one of its rental rows.
    pub async fn delete_book(&self, id: DocumentId) -> LedgerResult<DeleteConfirmation> {
        let batch = WriteBatch::new()
            .delete(RENTALS, rentals_of(id))
            .delete_required(BOOKS, Filter::by_id(id));

        match self.store.commit(batch).await? {
            BatchOutcome::Committed(_) => {
                tracing::info!(book_id = %id, "book deleted");
                Ok(DeleteConfirmation::default())
            }
            BatchOutcome::Aborted { step } => match DeleteStep::at(step) {
                Some(DeleteStep::DropBook) => Err(LedgerError::BookNotFound(id)),
                other => Err(unexpected_abort("delete", other)),
            },
        }
    }

    /// Check out one copy of a book.
    pub async fn rent_book(&self, id: DocumentId) -> LedgerResult<Book> {
        let rental = RentalRecord {
            book_id: id.to_string(),
        };
        let batch = WriteBatch::new()
            .update_required(
                BOOKS,
                Filter::by_id(id).gt(AVAILABLE_COUNT, 0),
                Update::new().inc(AVAILABLE_COUNT, -1),
            )
            .insert(RENTALS, to_document(RENTALS, &rental)?);

        match self.store.commit(batch).await? {
            BatchOutcome::Committed(_) => {}
            BatchOutcome::Aborted { step } => {
                return match RentStep::at(step) {
                    Some(RentStep::ReserveCopy) => {
                        tracing::warn!(book_id = %id, "rent rejected, no copies available");
                        Err(LedgerError::NoCopiesAvailable(id))
                    }
                    other => Err(unexpected_abort("rent", other)),
                };
            }
        }

        let book = self.get_book(id).await?;
        tracing::info!(book_id = %id, available_count = book.available_count, "book rented");
        Ok(book)
    }

    /// Check a rented copy back in.
    pub async fn return_book(&self, id: DocumentId) -> LedgerResult<Book> {
        if self.store.find_one(RENTALS, &rentals_of(id)).await?.is_none() {
            tracing::warn!(book_id = %id, "return rejected, book is not rented");
            return Err(LedgerError::NotRented(id));
        }

        let batch = WriteBatch::new()
            .update_required(
                BOOKS,
                Filter::by_id(id).lt(AVAILABLE_COUNT, below_limit(1)),
                Update::new().inc(AVAILABLE_COUNT, 1),
            )
            .delete_required(RENTALS, rentals_of(id));

        match self.store.commit(batch).await? {
            BatchOutcome::Committed(_) => {}
            BatchOutcome::Aborted { step } => {
                return match ReturnStep::at(step) {
                    Some(ReturnStep::RestoreCopy) => match self.get_book(id).await {
                        Ok(_) => Err(LedgerError::CopyLimitReached(id)),
                        Err(LedgerError::BookNotFound(_)) => Err(LedgerError::Invariant(format!(
                            "book {id} disappeared while a rental was being returned"
                        ))),
                        Err(err) => Err(err),
                    },
                    // Another return closed the last rental after the check above
                    Some(ReturnStep::CloseRental) => Err(LedgerError::NotRented(id)),
                    None => Err(unexpected_abort("return", None::<ReturnStep>)),
                };
            }
        }

        let book = self.get_book(id).await?;
        tracing::info!(book_id = %id, available_count = book.available_count, "book returned");
        Ok(book)
    }

    /// Every outstanding rental, in no particular order.
    pub async fn list_rentals(&self) -> LedgerResult<Vec<Rental>> {
        let documents = self.store.find_many(RENTALS, &Filter::new()).await?;
        let rentals = documents
            .into_iter()
            .map(from_document)
            .collect::<Result<Vec<Rental>, _>>()?;
        Ok(rentals)
    }
}

/// Exclusive upper bound on a count that can still take `added` more copies.
fn below_limit(added: u32) -> u64 {
    u64::from(u32::MAX - added) + 1
}

fn rentals_of(id: DocumentId) -> Filter {
    Filter::new().eq(BOOK_ID, id.to_string())
}

fn unexpected_abort<S: std::fmt::Debug>(operation: &str, step: Option<S>) -> LedgerError {
    LedgerError::Invariant(format!("{operation} aborted at unguarded step {step:?}"))
}
