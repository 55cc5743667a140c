use async_trait::async_trait;
use axum::Router;

/// Context provided to modules during initialization
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Idempotent DDL a module needs before it can serve requests.
///
/// Statements are expected to be safe to re-run on every startup
/// (`CREATE TABLE IF NOT EXISTS ...`); there is no version history.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub id: &'static str,
    pub ddl: &'static str,
}

/// Core module trait that all bookshelf modules must implement
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context
    /// Called during application startup, after the schema is applied
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes
    /// Routes will be mounted under `/{module_name}`
    fn routes(&self) -> Router {
        Router::new()
    }

    /// Return OpenAPI specification fragment for this module as JSON
    /// Will be merged with other modules' specs
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Return the tables this module owns
    fn schema(&self) -> Vec<TableSchema> {
        vec![]
    }

    /// Called once every module is initialized, before the server accepts traffic
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop the module and clean up resources
    /// Called during application shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
