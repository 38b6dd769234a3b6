//! Production suggestion over the current catalog.

use tracing::instrument;

use autoflex_planning::{AllocationResult, compute_suggestion};

use crate::store::{CatalogStore, StoreResult};

/// Reads a consistent-enough snapshot of the catalog and runs the planner.
///
/// Stock is read after products; a concurrent stock update between the two
/// reads is reflected in the next request.
#[derive(Debug, Clone)]
pub struct SuggestionService<S> {
    store: S,
}

impl<S: CatalogStore> SuggestionService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self), err)]
    pub async fn suggest(&self) -> StoreResult<AllocationResult> {
        let products = self.store.list_products().await?;
        let stock = self.store.stock_levels().await?;

        let result = compute_suggestion(&products, &stock);

        tracing::info!(
            product_count = products.len(),
            item_count = result.items().len(),
            total_quantity = result.total_quantity(),
            grand_total = %result.grand_total_value(),
            "production suggestion computed"
        );
        Ok(result)
    }
}
