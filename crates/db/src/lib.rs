//! SQLite connection pool for bookshelf.
//!
//! Every store operation runs on a pooled connection via [`Database::interact`],
//! which moves the closure onto a blocking thread.

use bookshelf_kernel::settings::DatabaseSettings;
use bookshelf_kernel::TableSchema;
use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::Connection;
use thiserror::Error;

/// Applied once when the pool is opened. Only file-level pragmas belong here,
/// since later pooled connections never run it.
const CONNECT_PRAGMAS: &str = "PRAGMA journal_mode=WAL;";

/// Database errors
#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("pool error: {0}")]
    Pool(String),

    #[error("failed to build pool: {0}")]
    Build(String),

    #[error("connection task failed: {0}")]
    Interact(String),
}

impl DbError {
    /// Whether this error is a PRIMARY KEY or UNIQUE constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.extended_code,
                rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            ),
            _ => false,
        }
    }
}

impl From<deadpool_sqlite::BuildError> for DbError {
    fn from(err: deadpool_sqlite::BuildError) -> Self {
        DbError::Build(err.to_string())
    }
}

impl From<deadpool_sqlite::PoolError> for DbError {
    fn from(err: deadpool_sqlite::PoolError) -> Self {
        DbError::Pool(err.to_string())
    }
}

impl From<deadpool_sqlite::InteractError> for DbError {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        DbError::Interact(err.to_string())
    }
}

/// Shared handle to the SQLite store. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

impl Database {
    /// Open the pool described by `settings` and verify a connection can be made.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, DbError> {
        tracing::info!(
            target: "bookshelf-db",
            path = %settings.path,
            max_connections = settings.max_connections,
            "opening sqlite pool"
        );

        let pool = Config::new(&settings.path)
            .builder(Runtime::Tokio1)
            .map_err(|e| DbError::Build(e.to_string()))?
            .max_size(settings.max_connections.max(1))
            .build()?;

        let db = Self { pool };
        db.interact(|conn| conn.execute_batch(CONNECT_PRAGMAS))
            .await?;

        Ok(db)
    }

    /// Run `f` against a pooled connection.
    pub async fn interact<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.pool.get().await?;
        let result = conn.interact(f).await?;
        Ok(result?)
    }

    /// Apply every module's table DDL. Statements must be idempotent.
    pub async fn apply_schema(&self, tables: Vec<(String, TableSchema)>) -> Result<(), DbError> {
        for (module, table) in tables {
            tracing::info!(
                target: "bookshelf-db",
                module = %module,
                schema = table.id,
                "applying table schema"
            );
            let ddl = table.ddl;
            self.interact(move |conn| conn.execute_batch(ddl)).await?;
        }

        Ok(())
    }

    /// Maximum number of pooled connections.
    pub fn max_connections(&self) -> usize {
        self.pool.status().max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings() -> (tempfile::TempDir, DatabaseSettings) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db").to_string_lossy().into_owned();
        let settings = DatabaseSettings {
            path,
            max_connections: 2,
        };
        (dir, settings)
    }

    const TEST_TABLE: TableSchema = TableSchema {
        id: "001_init",
        ddl: "CREATE TABLE IF NOT EXISTS items (id TEXT PRIMARY KEY, name TEXT NOT NULL);",
    };

    #[tokio::test]
    async fn test_connect_creates_database_file() {
        let (_dir, settings) = temp_settings();
        let db = Database::connect(&settings).await.unwrap();

        assert!(std::path::Path::new(&settings.path).exists());
        assert_eq!(db.max_connections(), 2);
    }

    #[tokio::test]
    async fn test_wal_mode_enabled() {
        let (_dir, settings) = temp_settings();
        let db = Database::connect(&settings).await.unwrap();

        let mode: String = db
            .interact(|conn| conn.query_row("PRAGMA journal_mode", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_wal_mode_persists_for_new_connections() {
        let (_dir, settings) = temp_settings();
        let _db = Database::connect(&settings).await.unwrap();

        let conn = Connection::open(&settings.path).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_apply_schema_is_idempotent() {
        let (_dir, settings) = temp_settings();
        let db = Database::connect(&settings).await.unwrap();

        let tables = vec![("items".to_string(), TEST_TABLE)];
        db.apply_schema(tables.clone()).await.unwrap();
        db.apply_schema(tables).await.unwrap();

        let count: i64 = db
            .interact(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'items'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_duplicate_primary_key_is_unique_violation() {
        let (_dir, settings) = temp_settings();
        let db = Database::connect(&settings).await.unwrap();
        db.apply_schema(vec![("items".to_string(), TEST_TABLE)])
            .await
            .unwrap();

        let insert = |db: Database| async move {
            db.interact(|conn| {
                conn.execute(
                    "INSERT INTO items (id, name) VALUES (?1, ?2)",
                    rusqlite::params!["a", "first"],
                )
            })
            .await
        };

        insert(db.clone()).await.unwrap();
        let err = insert(db).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_other_sqlite_errors_are_not_unique_violations() {
        let (_dir, settings) = temp_settings();
        let db = Database::connect(&settings).await.unwrap();

        let err = db
            .interact(|conn| conn.execute("SELECT * FROM missing_table", []))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Sqlite(_)));
        assert!(!err.is_unique_violation());
    }
}
