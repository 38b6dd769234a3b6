//! Infrastructure layer: catalog storage, configuration, and the services
//! that glue storage to the planner.

pub mod config;
pub mod store;
pub mod suggestion;

pub use config::{AppConfig, ConfigError};
pub use store::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreError, StoreResult};
pub use suggestion::SuggestionService;
