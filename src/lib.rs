//! Bookshelf application library
//!
//! Wires the store, the module registry, and the HTTP server together.

pub mod modules;

use anyhow::Context;
use axum::Router;
use bookshelf_db::Database;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// An opened store with every module registered and its tables in place
pub struct App {
    pub db: Database,
    pub registry: ModuleRegistry,
}

impl App {
    /// Connect to the store, register modules, and apply their table schema
    pub async fn open(settings: &Settings) -> anyhow::Result<Self> {
        let db = Database::connect(&settings.database)
            .await
            .with_context(|| format!("failed to open database at {}", settings.database.path))?;

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &db).context("failed to register modules")?;

        db.apply_schema(registry.collect_schema())
            .await
            .context("failed to apply table schema")?;

        Ok(Self { db, registry })
    }

    /// Initialize every module
    pub async fn init(&self, settings: &Settings) -> anyhow::Result<()> {
        let ctx = InitCtx { settings };
        self.registry.init_modules(&ctx).await
    }

    /// HTTP router serving every module
    pub fn router(&self, settings: &Settings) -> Router {
        bookshelf_http::build_router(&self.registry, settings)
    }
}

/// Run the service until a shutdown signal arrives
pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.path,
        "bookshelf bootstrap starting"
    );

    let app = App::open(settings).await?;
    app.init(settings).await?;

    let ctx = InitCtx { settings };
    app.registry.start_modules(&ctx).await?;

    tracing::info!("bookshelf bootstrap complete");
    let served = bookshelf_http::start_server(&app.registry, settings).await;

    app.registry.stop_modules().await?;
    served
}
