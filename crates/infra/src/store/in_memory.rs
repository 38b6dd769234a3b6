use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use autoflex_catalog::{
    MaterialRef, Product, ProductDetails, RawMaterial, RawMaterialDetails, ensure_positive_quantity,
};
use autoflex_core::{Entity, ProductId, RawMaterialId};
use autoflex_planning::StockSnapshot;

use super::{CatalogStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    raw_materials: HashMap<RawMaterialId, RawMaterial>,
}

impl Tables {
    /// Copy of a product with each BOM line's raw material reference filled in.
    fn joined(&self, product: &Product) -> Product {
        let mut product = product.clone();
        for line in product.materials_mut() {
            line.raw_material = self
                .raw_materials
                .get(&line.raw_material_id)
                .map(|rm| MaterialRef {
                    code: rm.code().to_string(),
                    name: rm.name().to_string(),
                });
        }
        product
    }

    fn product_mut(&mut self, id: ProductId) -> StoreResult<&mut Product> {
        self.products
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("product"))
    }
}

/// In-memory catalog store.
///
/// Intended for tests/dev. Everything lives behind a single lock, so each
/// operation sees and leaves a consistent catalog.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    tables: RwLock<Tables>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Database("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Database("lock poisoned".to_string()))
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let tables = self.read()?;
        let mut products: Vec<Product> = tables
            .products
            .values()
            .map(|p| tables.joined(p))
            .collect();
        products.sort_by(|a, b| a.code().cmp(b.code()).then_with(|| a.id().cmp(&b.id())));
        Ok(products)
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        let tables = self.read()?;
        tables
            .products
            .get(&id)
            .map(|p| tables.joined(p))
            .ok_or_else(|| StoreError::not_found("product"))
    }

    async fn create_product(&self, product: Product) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.products.contains_key(&product.id()) {
            return Err(StoreError::conflict("product already exists"));
        }
        tables.products.insert(product.id(), product);
        Ok(())
    }

    async fn update_product(&self, id: ProductId, details: ProductDetails) -> StoreResult<()> {
        let mut tables = self.write()?;
        tables.product_mut(id)?.update(details)?;
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let mut tables = self.write()?;
        tables
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("product"))
    }

    async fn add_material(
        &self,
        product_id: ProductId,
        raw_material_id: RawMaterialId,
        quantity_required: i64,
    ) -> StoreResult<()> {
        ensure_positive_quantity(quantity_required)?;
        let mut tables = self.write()?;
        if !tables.products.contains_key(&product_id) {
            return Err(StoreError::not_found("product"));
        }
        if !tables.raw_materials.contains_key(&raw_material_id) {
            return Err(StoreError::not_found("raw material"));
        }
        tables
            .product_mut(product_id)?
            .add_material(raw_material_id, quantity_required)?;
        Ok(())
    }

    async fn update_material(
        &self,
        product_id: ProductId,
        raw_material_id: RawMaterialId,
        quantity_required: i64,
    ) -> StoreResult<()> {
        let mut tables = self.write()?;
        tables
            .product_mut(product_id)?
            .update_material(raw_material_id, quantity_required)?;
        Ok(())
    }

    async fn remove_material(
        &self,
        product_id: ProductId,
        raw_material_id: RawMaterialId,
    ) -> StoreResult<()> {
        let mut tables = self.write()?;
        tables
            .product_mut(product_id)?
            .remove_material(raw_material_id)?;
        Ok(())
    }

    async fn list_raw_materials(&self) -> StoreResult<Vec<RawMaterial>> {
        let tables = self.read()?;
        let mut materials: Vec<RawMaterial> = tables.raw_materials.values().cloned().collect();
        materials.sort_by(|a, b| a.code().cmp(b.code()).then_with(|| a.id().cmp(&b.id())));
        Ok(materials)
    }

    async fn get_raw_material(&self, id: RawMaterialId) -> StoreResult<RawMaterial> {
        let tables = self.read()?;
        tables
            .raw_materials
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("raw material"))
    }

    async fn create_raw_material(&self, raw_material: RawMaterial) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.raw_materials.contains_key(&raw_material.id()) {
            return Err(StoreError::conflict("raw material already exists"));
        }
        tables.raw_materials.insert(raw_material.id(), raw_material);
        Ok(())
    }

    async fn update_raw_material(
        &self,
        id: RawMaterialId,
        details: RawMaterialDetails,
    ) -> StoreResult<()> {
        let mut tables = self.write()?;
        tables
            .raw_materials
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("raw material"))?
            .update(details)?;
        Ok(())
    }

    async fn delete_raw_material(&self, id: RawMaterialId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.raw_materials.remove(&id).is_none() {
            return Err(StoreError::not_found("raw material"));
        }
        for product in tables.products.values_mut() {
            product.drop_material(id);
        }
        Ok(())
    }

    async fn stock_levels(&self) -> StoreResult<StockSnapshot> {
        let tables = self.read()?;
        Ok(tables
            .raw_materials
            .values()
            .map(|rm| (rm.id(), rm.stock_quantity()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoflex_catalog::MAX_QUANTITY;
    use autoflex_core::DomainError;
    use rust_decimal_macros::dec;

    fn new_product(code: &str) -> Product {
        Product::create(
            ProductId::new(),
            ProductDetails {
                code: code.to_string(),
                name: format!("Product {code}"),
                price: dec!(10.00),
            },
        )
        .unwrap()
    }

    fn new_material(code: &str, stock: i64) -> RawMaterial {
        RawMaterial::create(
            RawMaterialId::new(),
            RawMaterialDetails {
                code: code.to_string(),
                name: format!("Material {code}"),
                stock_quantity: stock,
            },
        )
        .unwrap()
    }

    fn is_not_found(err: &StoreError, what: &str) -> bool {
        matches!(err, StoreError::Domain(DomainError::NotFound(w)) if w == what)
    }

    #[tokio::test]
    async fn products_are_listed_by_code() {
        let store = InMemoryCatalogStore::new();
        for code in ["P-3", "P-1", "P-2"] {
            store.create_product(new_product(code)).await.unwrap();
        }

        let codes: Vec<String> = store
            .list_products()
            .await
            .unwrap()
            .iter()
            .map(|p| p.code().to_string())
            .collect();
        assert_eq!(codes, vec!["P-1", "P-2", "P-3"]);
    }

    #[tokio::test]
    async fn listings_compare_codes_bytewise() {
        let store = InMemoryCatalogStore::new();
        for code in ["b-1", "C-1", "a-1"] {
            store.create_product(new_product(code)).await.unwrap();
            store.create_raw_material(new_material(code, 1)).await.unwrap();
        }

        let products: Vec<String> = store
            .list_products()
            .await
            .unwrap()
            .iter()
            .map(|p| p.code().to_string())
            .collect();
        let materials: Vec<String> = store
            .list_raw_materials()
            .await
            .unwrap()
            .iter()
            .map(|rm| rm.code().to_string())
            .collect();

        // Uppercase sorts before lowercase, as under `COLLATE "C"`.
        assert_eq!(products, vec!["C-1", "a-1", "b-1"]);
        assert_eq!(materials, products);
    }

    #[tokio::test]
    async fn reads_join_raw_material_refs() {
        let store = InMemoryCatalogStore::new();
        let product = new_product("P-1");
        let rm = new_material("RM-1", 5);
        let (pid, rid) = (product.id(), rm.id());
        store.create_product(product).await.unwrap();
        store.create_raw_material(rm).await.unwrap();

        store.add_material(pid, rid, 2).await.unwrap();

        let loaded = store.get_product(pid).await.unwrap();
        let line = &loaded.materials()[0];
        assert_eq!(line.quantity_required, 2);
        assert_eq!(
            line.raw_material,
            Some(MaterialRef {
                code: "RM-1".to_string(),
                name: "Material RM-1".to_string()
            })
        );
    }

    #[tokio::test]
    async fn add_material_checks_both_sides_exist() {
        let store = InMemoryCatalogStore::new();
        let product = new_product("P-1");
        let pid = product.id();
        store.create_product(product).await.unwrap();

        let err = store
            .add_material(ProductId::new(), RawMaterialId::new(), 1)
            .await
            .unwrap_err();
        assert!(is_not_found(&err, "product"));

        let err = store
            .add_material(pid, RawMaterialId::new(), 1)
            .await
            .unwrap_err();
        assert!(is_not_found(&err, "raw material"));

        // Quantity is rejected before existence is looked at.
        let err = store
            .add_material(ProductId::new(), RawMaterialId::new(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn add_material_rejects_duplicates_and_bad_quantities() {
        let store = InMemoryCatalogStore::new();
        let product = new_product("P-1");
        let rm = new_material("RM-1", 5);
        let (pid, rid) = (product.id(), rm.id());
        store.create_product(product).await.unwrap();
        store.create_raw_material(rm).await.unwrap();

        for qty in [0, MAX_QUANTITY + 1] {
            let err = store.add_material(pid, rid, qty).await.unwrap_err();
            assert!(matches!(err, StoreError::Domain(DomainError::Validation(_))));
        }

        store.add_material(pid, rid, 3).await.unwrap();
        let err = store.add_material(pid, rid, 3).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_and_remove_material() {
        let store = InMemoryCatalogStore::new();
        let product = new_product("P-1");
        let rm = new_material("RM-1", 5);
        let (pid, rid) = (product.id(), rm.id());
        store.create_product(product).await.unwrap();
        store.create_raw_material(rm).await.unwrap();
        store.add_material(pid, rid, 3).await.unwrap();

        store.update_material(pid, rid, 4).await.unwrap();
        assert_eq!(store.get_product(pid).await.unwrap().materials()[0].quantity_required, 4);

        store.remove_material(pid, rid).await.unwrap();
        assert!(store.get_product(pid).await.unwrap().materials().is_empty());

        let err = store.remove_material(pid, rid).await.unwrap_err();
        assert!(is_not_found(&err, "association"));
    }

    #[tokio::test]
    async fn deleting_raw_material_cascades_to_bom_lines() {
        let store = InMemoryCatalogStore::new();
        let product = new_product("P-1");
        let keep = new_material("RM-1", 5);
        let gone = new_material("RM-2", 5);
        let (pid, keep_id, gone_id) = (product.id(), keep.id(), gone.id());
        store.create_product(product).await.unwrap();
        store.create_raw_material(keep).await.unwrap();
        store.create_raw_material(gone).await.unwrap();
        store.add_material(pid, keep_id, 1).await.unwrap();
        store.add_material(pid, gone_id, 1).await.unwrap();

        store.delete_raw_material(gone_id).await.unwrap();

        let ids: Vec<_> = store
            .get_product(pid)
            .await
            .unwrap()
            .materials()
            .iter()
            .map(|l| l.raw_material_id)
            .collect();
        assert_eq!(ids, vec![keep_id]);
        assert!(!store.stock_levels().await.unwrap().contains_key(&gone_id));
    }

    #[tokio::test]
    async fn update_product_validates_and_reports_missing() {
        let store = InMemoryCatalogStore::new();
        let product = new_product("P-1");
        let pid = product.id();
        store.create_product(product).await.unwrap();

        let bad = ProductDetails {
            code: "P-1".to_string(),
            name: "Desk".to_string(),
            price: dec!(-1),
        };
        let err = store.update_product(pid, bad.clone()).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Validation(_))));

        let err = store.update_product(ProductId::new(), bad).await.unwrap_err();
        assert!(is_not_found(&err, "product"));
    }

    #[tokio::test]
    async fn delete_product_twice_is_not_found() {
        let store = InMemoryCatalogStore::new();
        let product = new_product("P-1");
        let pid = product.id();
        store.create_product(product).await.unwrap();

        store.delete_product(pid).await.unwrap();
        let err = store.delete_product(pid).await.unwrap_err();
        assert!(is_not_found(&err, "product"));
    }

    #[tokio::test]
    async fn stock_levels_reflect_updates() {
        let store = InMemoryCatalogStore::new();
        let rm = new_material("RM-1", 5);
        let rid = rm.id();
        store.create_raw_material(rm).await.unwrap();

        store
            .update_raw_material(
                rid,
                RawMaterialDetails {
                    code: "RM-1".to_string(),
                    name: "Steel".to_string(),
                    stock_quantity: 42,
                },
            )
            .await
            .unwrap();

        let stock = store.stock_levels().await.unwrap();
        assert_eq!(stock.get(&rid), Some(&42));
        assert_eq!(store.get_raw_material(rid).await.unwrap().name(), "Steel");
    }
}
