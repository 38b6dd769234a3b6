//! Catalog storage: products, raw materials and the BOM lines between them.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use autoflex_catalog::{Product, ProductDetails, RawMaterial, RawMaterialDetails};
use autoflex_core::{DomainError, ProductId, RawMaterialId};
use autoflex_planning::StockSnapshot;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Catalog store operation error.
///
/// Business outcomes (validation, missing records, duplicates) surface as
/// `Domain`; everything the backend itself fails at is `Database`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn not_found(what: &str) -> Self {
        Self::Domain(DomainError::not_found(what))
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Domain(DomainError::conflict(msg))
    }
}

/// Read/write access to the catalog.
///
/// Read operations return products with their BOM lines populated and each
/// line's `raw_material` reference joined in. Lists are ordered by code, then
/// id, so callers see a stable order across backends.
///
/// Mutations validate through the catalog domain types; a missing product or
/// raw material is `DomainError::NotFound`.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All products with their bills of materials.
    async fn list_products(&self) -> StoreResult<Vec<Product>>;
    async fn get_product(&self, id: ProductId) -> StoreResult<Product>;
    async fn create_product(&self, product: Product) -> StoreResult<()>;
    async fn update_product(&self, id: ProductId, details: ProductDetails) -> StoreResult<()>;
    async fn delete_product(&self, id: ProductId) -> StoreResult<()>;

    async fn add_material(
        &self,
        product_id: ProductId,
        raw_material_id: RawMaterialId,
        quantity_required: i64,
    ) -> StoreResult<()>;
    async fn update_material(
        &self,
        product_id: ProductId,
        raw_material_id: RawMaterialId,
        quantity_required: i64,
    ) -> StoreResult<()>;
    async fn remove_material(
        &self,
        product_id: ProductId,
        raw_material_id: RawMaterialId,
    ) -> StoreResult<()>;

    async fn list_raw_materials(&self) -> StoreResult<Vec<RawMaterial>>;
    async fn get_raw_material(&self, id: RawMaterialId) -> StoreResult<RawMaterial>;
    async fn create_raw_material(&self, raw_material: RawMaterial) -> StoreResult<()>;
    async fn update_raw_material(
        &self,
        id: RawMaterialId,
        details: RawMaterialDetails,
    ) -> StoreResult<()>;
    /// Deletes the raw material and every BOM line that references it.
    async fn delete_raw_material(&self, id: RawMaterialId) -> StoreResult<()>;

    /// Point-in-time stock per raw material.
    async fn stock_levels(&self) -> StoreResult<StockSnapshot>;
}

#[async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        (**self).list_products().await
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        (**self).get_product(id).await
    }

    async fn create_product(&self, product: Product) -> StoreResult<()> {
        (**self).create_product(product).await
    }

    async fn update_product(&self, id: ProductId, details: ProductDetails) -> StoreResult<()> {
        (**self).update_product(id, details).await
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        (**self).delete_product(id).await
    }

    async fn add_material(
        &self,
        product_id: ProductId,
        raw_material_id: RawMaterialId,
        quantity_required: i64,
    ) -> StoreResult<()> {
        (**self)
            .add_material(product_id, raw_material_id, quantity_required)
            .await
    }

    async fn update_material(
        &self,
        product_id: ProductId,
        raw_material_id: RawMaterialId,
        quantity_required: i64,
    ) -> StoreResult<()> {
        (**self)
            .update_material(product_id, raw_material_id, quantity_required)
            .await
    }

    async fn remove_material(
        &self,
        product_id: ProductId,
        raw_material_id: RawMaterialId,
    ) -> StoreResult<()> {
        (**self).remove_material(product_id, raw_material_id).await
    }

    async fn list_raw_materials(&self) -> StoreResult<Vec<RawMaterial>> {
        (**self).list_raw_materials().await
    }

    async fn get_raw_material(&self, id: RawMaterialId) -> StoreResult<RawMaterial> {
        (**self).get_raw_material(id).await
    }

    async fn create_raw_material(&self, raw_material: RawMaterial) -> StoreResult<()> {
        (**self).create_raw_material(raw_material).await
    }

    async fn update_raw_material(
        &self,
        id: RawMaterialId,
        details: RawMaterialDetails,
    ) -> StoreResult<()> {
        (**self).update_raw_material(id, details).await
    }

    async fn delete_raw_material(&self, id: RawMaterialId) -> StoreResult<()> {
        (**self).delete_raw_material(id).await
    }

    async fn stock_levels(&self) -> StoreResult<StockSnapshot> {
        (**self).stock_levels().await
    }
}
