//! HTTP handlers for the books module.
//!
//! Handlers only translate: request in, repository call, response out. Every
//! failure is returned as [`AppError`] and rendered by its `IntoResponse`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookshelf_http::AppError;
use serde_json::Value;

use super::models::{BookResponse, BooksResponse, MessageResponse};
use super::repository::BookRepository;
use super::validation::BookValidator;

/// State shared by every books handler
#[derive(Clone)]
pub struct BooksState {
    pub repository: BookRepository,
    pub validator: Arc<BookValidator>,
}

/// Routes relative to the module's mount path
pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{isbn}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(state)
}

/// GET /books
async fn list_books(State(state): State<BooksState>) -> Result<Json<BooksResponse>, AppError> {
    let books = state.repository.find_all().await?;
    tracing::info!(count = books.len(), "listed books");
    Ok(Json(BooksResponse { books }))
}

/// GET /books/{isbn}
async fn get_book(
    State(state): State<BooksState>,
    Path(isbn): Path<String>,
) -> Result<Json<BookResponse>, AppError> {
    let book = state.repository.find_one(&isbn).await?;
    Ok(Json(BookResponse { book }))
}

/// POST /books
async fn create_book(
    State(state): State<BooksState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    let Json(payload) = payload?;
    let book = state.validator.parse_new(payload)?;
    let book = state.repository.create(book).await?;

    tracing::info!(isbn = %book.isbn, "created book");
    Ok((StatusCode::CREATED, Json(BookResponse { book })))
}

/// PUT /books/{isbn}
async fn update_book(
    State(state): State<BooksState>,
    Path(isbn): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BookResponse>, AppError> {
    let Json(payload) = payload?;
    let fields = state.validator.parse_update(payload)?;
    let book = state.repository.update(&isbn, fields).await?;

    tracing::info!(isbn = %book.isbn, "updated book");
    Ok(Json(BookResponse { book }))
}

/// DELETE /books/{isbn}
async fn delete_book(
    State(state): State<BooksState>,
    Path(isbn): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.repository.remove(&isbn).await?;

    tracing::info!(isbn = %isbn, "deleted book");
    Ok(Json(MessageResponse {
        message: "Book deleted".to_string(),
    }))
}
