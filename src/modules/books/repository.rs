//! Persistence for [`Book`] rows. Each operation is a single SQL statement.

use bookshelf_db::Database;
use rusqlite::{params, OptionalExtension, Row};

use super::error::BookError;
use super::models::{Book, BookFields};

/// DDL for the `books` table.
pub const BOOKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    isbn       TEXT PRIMARY KEY,
    amazon_url TEXT NOT NULL,
    author     TEXT NOT NULL,
    language   TEXT NOT NULL,
    pages      INTEGER NOT NULL,
    publisher  TEXT NOT NULL,
    title      TEXT NOT NULL,
    year       INTEGER NOT NULL
);
"#;

const FIND_ALL_SQL: &str = "SELECT isbn, amazon_url, author, language, pages, publisher, title, year \
     FROM books ORDER BY rowid";

const FIND_ONE_SQL: &str = "SELECT isbn, amazon_url, author, language, pages, publisher, title, year \
     FROM books WHERE isbn = ?1";

const INSERT_SQL: &str = "INSERT INTO books (isbn, amazon_url, author, language, pages, publisher, title, year) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
     RETURNING isbn, amazon_url, author, language, pages, publisher, title, year";

const UPDATE_SQL: &str = "UPDATE books \
     SET amazon_url = ?2, author = ?3, language = ?4, pages = ?5, publisher = ?6, title = ?7, year = ?8 \
     WHERE isbn = ?1 \
     RETURNING isbn, amazon_url, author, language, pages, publisher, title, year";

const DELETE_SQL: &str = "DELETE FROM books WHERE isbn = ?1";

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        isbn: row.get("isbn")?,
        amazon_url: row.get("amazon_url")?,
        author: row.get("author")?,
        language: row.get("language")?,
        pages: row.get("pages")?,
        publisher: row.get("publisher")?,
        title: row.get("title")?,
        year: row.get("year")?,
    })
}

/// Book store backed by the shared [`Database`] handle.
#[derive(Clone)]
pub struct BookRepository {
    db: Database,
}

impl BookRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Every book, in insertion order.
    pub async fn find_all(&self) -> Result<Vec<Book>, BookError> {
        let books = self
            .db
            .interact(|conn| {
                let mut stmt = conn.prepare(FIND_ALL_SQL)?;
                let books = stmt
                    .query_map([], book_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(books)
            })
            .await?;

        Ok(books)
    }

    pub async fn find_one(&self, isbn: &str) -> Result<Book, BookError> {
        let key = isbn.to_string();
        self.db
            .interact(move |conn| {
                conn.query_row(FIND_ONE_SQL, [&key], book_from_row)
                    .optional()
            })
            .await?
            .ok_or_else(|| BookError::NotFound(isbn.to_string()))
    }

    /// Insert `book`. An existing ISBN is a [`BookError::Conflict`].
    pub async fn create(&self, book: Book) -> Result<Book, BookError> {
        let isbn = book.isbn.clone();
        self.db
            .interact(move |conn| {
                conn.query_row(
                    INSERT_SQL,
                    params![
                        book.isbn,
                        book.amazon_url,
                        book.author,
                        book.language,
                        book.pages,
                        book.publisher,
                        book.title,
                        book.year,
                    ],
                    book_from_row,
                )
            })
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    BookError::Conflict(isbn)
                } else {
                    BookError::Store(e)
                }
            })
    }

    /// Replace every editable field of the book stored under `isbn`.
    pub async fn update(&self, isbn: &str, fields: BookFields) -> Result<Book, BookError> {
        let key = isbn.to_string();
        self.db
            .interact(move |conn| {
                conn.query_row(
                    UPDATE_SQL,
                    params![
                        key,
                        fields.amazon_url,
                        fields.author,
                        fields.language,
                        fields.pages,
                        fields.publisher,
                        fields.title,
                        fields.year,
                    ],
                    book_from_row,
                )
                .optional()
            })
            .await?
            .ok_or_else(|| BookError::NotFound(isbn.to_string()))
    }

    pub async fn remove(&self, isbn: &str) -> Result<(), BookError> {
        let key = isbn.to_string();
        let deleted = self
            .db
            .interact(move |conn| conn.execute(DELETE_SQL, [&key]))
            .await?;

        if deleted == 0 {
            return Err(BookError::NotFound(isbn.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_kernel::settings::DatabaseSettings;
    use bookshelf_kernel::TableSchema;

    async fn test_repository() -> (tempfile::TempDir, BookRepository) {
        let dir = tempfile::tempdir().unwrap();
        let settings = DatabaseSettings {
            path: dir.path().join("books.db").to_string_lossy().into_owned(),
            max_connections: 2,
        };
        let db = Database::connect(&settings).await.unwrap();
        db.apply_schema(vec![(
            "books".to_string(),
            TableSchema {
                id: "001_books",
                ddl: BOOKS_TABLE,
            },
        )])
        .await
        .unwrap();
        (dir, BookRepository::new(db))
    }

    fn power_up() -> Book {
        Book {
            isbn: "0691161518".to_string(),
            amazon_url: "http://a.co/eobPtX2".to_string(),
            author: "Matthew Lane".to_string(),
            language: "english".to_string(),
            pages: 264,
            publisher: "Princeton University Press".to_string(),
            title: "Power-Up: Unlocking the Hidden Mathematics in Video Games".to_string(),
            year: 2017,
        }
    }

    fn azkaban_fields() -> BookFields {
        BookFields {
            amazon_url: "https://www.amazon.com/dp/0545582938".to_string(),
            author: "JK Rowling".to_string(),
            language: "english".to_string(),
            pages: 464,
            publisher: "Scholastic Inc.".to_string(),
            title: "Harry Potter and the Prisoner of Azkaban".to_string(),
            year: 2013,
        }
    }

    #[tokio::test]
    async fn test_create_then_find_one_round_trips() {
        let (_dir, repo) = test_repository().await;

        let created = repo.create(power_up()).await.unwrap();
        assert_eq!(created, power_up());

        let found = repo.find_one("0691161518").await.unwrap();
        assert_eq!(found, power_up());
    }

    #[tokio::test]
    async fn test_find_all_keeps_insertion_order() {
        let (_dir, repo) = test_repository().await;
        assert!(repo.find_all().await.unwrap().is_empty());

        repo.create(power_up()).await.unwrap();
        repo.create(Book::from_parts("0545582938", azkaban_fields()))
            .await
            .unwrap();

        let isbns: Vec<String> = repo
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|book| book.isbn)
            .collect();
        assert_eq!(isbns, vec!["0691161518", "0545582938"]);
    }

    #[tokio::test]
    async fn test_find_one_missing_is_not_found() {
        let (_dir, repo) = test_repository().await;

        let err = repo.find_one("1111111111").await.unwrap_err();
        assert!(matches!(err, BookError::NotFound(isbn) if isbn == "1111111111"));
    }

    #[tokio::test]
    async fn test_create_duplicate_is_conflict() {
        let (_dir, repo) = test_repository().await;
        repo.create(power_up()).await.unwrap();

        let err = repo.create(power_up()).await.unwrap_err();
        assert!(matches!(err, BookError::Conflict(isbn) if isbn == "0691161518"));
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_replaces_fields_and_keeps_isbn() {
        let (_dir, repo) = test_repository().await;
        repo.create(power_up()).await.unwrap();

        let updated = repo.update("0691161518", azkaban_fields()).await.unwrap();
        assert_eq!(updated, Book::from_parts("0691161518", azkaban_fields()));

        let found = repo.find_one("0691161518").await.unwrap();
        assert_eq!(found.title, "Harry Potter and the Prisoner of Azkaban");
        assert_eq!(found.pages, 464);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let (_dir, repo) = test_repository().await;

        let err = repo.update("1111111111", azkaban_fields()).await.unwrap_err();
        assert!(matches!(err, BookError::NotFound(_)));
        assert!(repo.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_deletes_row() {
        let (_dir, repo) = test_repository().await;
        repo.create(power_up()).await.unwrap();

        repo.remove("0691161518").await.unwrap();

        assert!(matches!(
            repo.find_one("0691161518").await,
            Err(BookError::NotFound(_))
        ));
        assert!(matches!(
            repo.remove("0691161518").await,
            Err(BookError::NotFound(_))
        ));
    }
}
