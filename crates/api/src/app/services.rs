use std::sync::Arc;

use autoflex_infra::{
    AppConfig, CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreResult,
    SuggestionService,
};

/// Shared handles every handler reaches through `Extension<Arc<AppServices>>`.
pub struct AppServices {
    store: Arc<dyn CatalogStore>,
    suggestions: SuggestionService<Arc<dyn CatalogStore>>,
}

impl AppServices {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            suggestions: SuggestionService::new(store.clone()),
            store,
        }
    }

    /// Services over a fresh in-memory catalog.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCatalogStore::new()))
    }

    /// Pick the backing store from configuration.
    ///
    /// With persistence on, connects to Postgres and creates the schema if needed.
    pub async fn from_config(config: &AppConfig) -> StoreResult<Self> {
        let database_url = match (&config.database_url, config.use_persistent_stores) {
            (Some(url), true) => url,
            _ => {
                tracing::info!("using in-memory catalog store");
                return Ok(Self::in_memory());
            }
        };

        let store =
            PostgresCatalogStore::connect(database_url, config.database_max_connections).await?;
        store.ensure_schema().await?;
        tracing::info!(
            max_connections = config.database_max_connections,
            "using postgres catalog store"
        );
        Ok(Self::new(Arc::new(store)))
    }

    pub fn store(&self) -> &dyn CatalogStore {
        self.store.as_ref()
    }

    pub fn suggestions(&self) -> &SuggestionService<Arc<dyn CatalogStore>> {
        &self.suggestions
    }
}
