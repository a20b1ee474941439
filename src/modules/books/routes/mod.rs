//! HTTP handlers for the books module.
//!
//! Identities arrive as the `{id}` route parameter and are parsed before the ledger sees them.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};
use shelf_http::AppError;

use super::{
    ledger::RentalLedger,
    models::{Book, BookPatch, DeleteConfirmation, NewBook},
};

type LedgerState = State<Arc<RentalLedger>>;

/// Routes relative to the module mount point.
pub fn router(ledger: Arc<RentalLedger>) -> Router {
    Router::new()
        .route("/", get(list_books).post(add_book))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/rent/{id}", post(rent_book))
        .route("/return/{id}", post(return_book))
        .with_state(ledger)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn add_book(
    State(ledger): LedgerState,
    payload: Result<Json<NewBook>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Json(input) = payload?;
    Ok(Json(ledger.add_book(input).await?))
}

async fn list_books(State(ledger): LedgerState) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(ledger.list_books().await?))
}

async fn get_book(
    State(ledger): LedgerState,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let id = RentalLedger::parse_id(&id)?;
    Ok(Json(ledger.get_book(id).await?))
}

async fn update_book(
    State(ledger): LedgerState,
    Path(id): Path<String>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let id = RentalLedger::parse_id(&id)?;
    let Json(fields) = payload?;
    let patch = BookPatch::try_from(fields)?;
    Ok(Json(ledger.update_book(id, patch).await?))
}

async fn delete_book(
    State(ledger): LedgerState,
    Path(id): Path<String>,
) -> Result<Json<DeleteConfirmation>, AppError> {
    let id = RentalLedger::parse_id(&id)?;
    Ok(Json(ledger.delete_book(id).await?))
}

async fn rent_book(
    State(ledger): LedgerState,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let id = RentalLedger::parse_id(&id)?;
    Ok(Json(ledger.rent_book(id).await?))
}

async fn return_book(
    State(ledger): LedgerState,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let id = RentalLedger::parse_id(&id)?;
    Ok(Json(ledger.return_book(id).await?))
}
