pub mod error;
pub mod ledger;
pub mod models;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use shelf_kernel::{InitCtx, Module};

use ledger::RentalLedger;

/// Book inventory and the rent/return actions
pub struct BooksModule {
    ledger: Arc<RentalLedger>,
}

impl BooksModule {
    pub fn new(ledger: Arc<RentalLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            database = %ctx.settings.database.name,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.ledger.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/Book" }
                    }
                }
            })
        };
        let id_param = json!([{
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "string", "format": "uuid" }
        }]);

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Every book in the inventory",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "500": error("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Add copies of a book",
                        "description": "Increments an existing title's copies or creates the title",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/NewBook" }
                                }
                            }
                        },
                        "responses": {
                            "200": book("The created or incremented book"),
                            "400": error("Malformed body")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Books health check",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "parameters": id_param,
                        "responses": {
                            "200": book("The book"),
                            "400": error("Invalid book ID"),
                            "404": error("Book not found")
                        }
                    },
                    "put": {
                        "summary": "Merge-patch a book",
                        "tags": ["Books"],
                        "parameters": id_param,
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookPatch" }
                                }
                            }
                        },
                        "responses": {
                            "200": book("The book after the patch"),
                            "400": error("Invalid book ID or patch"),
                            "404": error("Book not found")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": id_param,
                        "responses": {
                            "200": {
                                "description": "Deleted",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/DeleteConfirmation" }
                                    }
                                }
                            },
                            "400": error("Invalid book ID"),
                            "404": error("Book not found")
                        }
                    }
                },
                "/rent/{id}": {
                    "post": {
                        "summary": "Rent one copy",
                        "tags": ["Rentals"],
                        "parameters": id_param,
                        "responses": {
                            "200": book("The book after the rental"),
                            "400": error("Invalid book ID"),
                            "409": error("No copies available")
                        }
                    }
                },
                "/return/{id}": {
                    "post": {
                        "summary": "Return one copy",
                        "tags": ["Rentals"],
                        "parameters": id_param,
                        "responses": {
                            "200": book("The book after the return"),
                            "400": error("Invalid book ID"),
                            "409": error("Book is not currently rented")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "description": "Store-assigned identity" },
                            "title": { "type": "string", "description": "Title of the book" },
                            "author": { "type": "string", "description": "Author of the book" },
                            "availableCount": {
                                "type": "integer",
                                "minimum": 0,
                                "description": "Copies available to rent"
                            }
                        },
                        "required": ["id", "title", "availableCount"]
                    },
                    "NewBook": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "availableCount": { "type": "integer", "minimum": 0 }
                        },
                        "required": ["title"]
                    },
                    "BookPatch": {
                        "type": "object",
                        "description": "Only the keys present are overwritten",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": ["string", "null"] },
                            "availableCount": { "type": "integer", "minimum": 0 }
                        },
                        "additionalProperties": true
                    },
                    "DeleteConfirmation": {
                        "type": "object",
                        "properties": { "message": { "type": "string" } },
                        "required": ["message"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(ledger: Arc<RentalLedger>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(ledger))
}
