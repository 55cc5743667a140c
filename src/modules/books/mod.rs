pub mod error;
pub mod models;
pub mod repository;
pub mod routes;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_db::Database;
use bookshelf_kernel::{InitCtx, Module, TableSchema};
use serde_json::json;

use repository::BookRepository;
use routes::BooksState;
use validation::BookValidator;

/// Books module: the ISBN-keyed catalog
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(db: Database) -> anyhow::Result<Self> {
        Ok(Self {
            state: BooksState {
                repository: BookRepository::new(db),
                validator: Arc::new(BookValidator::new()?),
            },
        })
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
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error_response = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book_envelope = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/BookEnvelope" }
                    }
                }
            })
        };
        let json_body = |schema: &str| {
            json!({
                "required": true,
                "content": {
                    "application/json": {
                        "schema": { "$ref": format!("#/components/schemas/{}", schema) }
                    }
                }
            })
        };
        let isbn_param = json!({
            "name": "isbn",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Every book in the catalog",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "books": {
                                                    "type": "array",
                                                    "items": { "$ref": "#/components/schemas/Book" }
                                                }
                                            },
                                            "required": ["books"]
                                        }
                                    }
                                }
                            },
                            "500": error_response("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": json_body("Book"),
                        "responses": {
                            "201": book_envelope("Created book"),
                            "400": error_response("Payload failed validation"),
                            "409": error_response("ISBN already exists"),
                            "500": error_response("Internal server error")
                        }
                    }
                },
                "/{isbn}": {
                    "get": {
                        "summary": "Get a book by ISBN",
                        "tags": ["Books"],
                        "parameters": [isbn_param.clone()],
                        "responses": {
                            "200": book_envelope("Requested book"),
                            "404": error_response("Book not found")
                        }
                    },
                    "put": {
                        "summary": "Replace a book's fields",
                        "tags": ["Books"],
                        "parameters": [isbn_param.clone()],
                        "requestBody": json_body("BookUpdate"),
                        "responses": {
                            "200": book_envelope("Updated book"),
                            "400": error_response("Payload failed validation"),
                            "404": error_response("Book not found")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [isbn_param],
                        "responses": {
                            "200": {
                                "description": "Book deleted",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": { "message": { "type": "string" } },
                                            "required": ["message"]
                                        }
                                    }
                                }
                            },
                            "404": error_response("Book not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": validation::CREATE_SCHEMA.clone(),
                    "BookUpdate": validation::UPDATE_SCHEMA.clone(),
                    "BookEnvelope": {
                        "type": "object",
                        "properties": {
                            "book": { "$ref": "#/components/schemas/Book" }
                        },
                        "required": ["book"]
                    }
                }
            }
        }))
    }

    fn schema(&self) -> Vec<TableSchema> {
        vec![TableSchema {
            id: "001_books",
            ddl: repository::BOOKS_TABLE,
        }]
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
pub fn create_module(db: Database) -> anyhow::Result<Arc<dyn Module>> {
    Ok(Arc::new(BooksModule::new(db)?))
}
