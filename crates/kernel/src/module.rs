use async_trait::async_trait;
use axum::Router;

/// Context provided to modules during initialization
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Core module trait that all shelf modules implement
///
/// Modules own their collaborators (store handles, ledgers) from construction on;
/// the registry only drives their lifecycle and collects their routes.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module, also the path segment its routes mount under
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes
    /// Routes will be mounted under `{api_prefix}/{module_name}`
    fn routes(&self) -> Router {
        Router::new()
    }

    /// Return OpenAPI specification fragment for this module as JSON
    /// Will be merged with other modules' specs
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Called once every module is initialized, before traffic is served
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop the module and flush anything it holds
    /// Called after the HTTP server has drained
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
