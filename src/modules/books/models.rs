use serde::{Deserialize, Serialize};

/// A catalog entry, keyed by ISBN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub isbn: String,
    pub amazon_url: String,
    pub author: String,
    pub language: String,
    pub pages: i32,
    pub publisher: String,
    pub title: String,
    pub year: i32,
}

impl Book {
    pub fn from_parts(isbn: impl Into<String>, fields: BookFields) -> Self {
        Self {
            isbn: isbn.into(),
            amazon_url: fields.amazon_url,
            author: fields.author,
            language: fields.language,
            pages: fields.pages,
            publisher: fields.publisher,
            title: fields.title,
            year: fields.year,
        }
    }
}

/// Every field an update replaces. The ISBN is taken from the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookFields {
    pub amazon_url: String,
    pub author: String,
    pub language: String,
    pub pages: i32,
    pub publisher: String,
    pub title: String,
    pub year: i32,
}

/// `{"book": {...}}`
#[derive(Debug, Serialize, Deserialize)]
pub struct BookResponse {
    pub book: Book,
}

/// `{"books": [...]}`
#[derive(Debug, Serialize, Deserialize)]
pub struct BooksResponse {
    pub books: Vec<Book>,
}

/// `{"message": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
