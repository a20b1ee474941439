use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;
use shelf_http::AppError;
use shelf_kernel::{InitCtx, Module};

use super::books::{ledger::RentalLedger, models::Rental};

/// Read-only view over outstanding rentals
pub struct RentalsModule {
    ledger: Arc<RentalLedger>,
}

impl RentalsModule {
    pub fn new(ledger: Arc<RentalLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Module for RentalsModule {
    fn name(&self) -> &'static str {
        "rentals"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "rentals module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_rentals))
            .with_state(self.ledger.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List outstanding rentals",
                        "tags": ["Rentals"],
                        "responses": {
                            "200": {
                                "description": "One entry per rented copy",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Rental" }
                                        }
                                    }
                                }
                            },
                            "500": {
                                "description": "Internal server error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Rental": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "description": "Store-assigned identity" },
                            "bookID": { "type": "string", "description": "Identity of the rented book" }
                        },
                        "required": ["id", "bookID"]
                    }
                }
            }
        }))
    }
}

async fn list_rentals(
    State(ledger): State<Arc<RentalLedger>>,
) -> Result<Json<Vec<Rental>>, AppError> {
    Ok(Json(ledger.list_rentals().await?))
}

/// Create a new instance of the rentals module
pub fn create_module(ledger: Arc<RentalLedger>) -> Arc<dyn Module> {
    Arc::new(RentalsModule::new(ledger))
}
