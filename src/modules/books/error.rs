use bookshelf_db::DbError;
use bookshelf_http::AppError;
use thiserror::Error;

/// Failures raised by the books module
#[derive(Debug, Error)]
pub enum BookError {
    #[error("invalid book payload: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("no book with isbn '{0}'")]
    NotFound(String),

    #[error("a book with isbn '{0}' already exists")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] DbError),
}

/// The single place a book failure becomes an HTTP status.
impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        let message = err.to_string();
        match err {
            BookError::Validation(messages) => AppError::validation(
                messages.into_iter().map(serde_json::Value::String).collect(),
                message,
            ),
            BookError::NotFound(_) => AppError::not_found(message),
            BookError::Conflict(_) => AppError::conflict(vec![], message),
            BookError::Store(e) => {
                AppError::Internal(anyhow::Error::new(e).context("book store failure"))
            }
        }
    }
}
