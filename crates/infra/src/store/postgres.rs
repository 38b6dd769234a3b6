//! Postgres-backed catalog store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Domain(Conflict)` |
//! | Database (check constraint violation) | `23514` | `Domain(Validation)` |
//! | Database (other) | Any other | `Database` |
//! | PoolClosed / network / decode | N/A | `Database` |
//!
//! Records that do not exist are detected from `rows_affected` or an empty
//! `fetch_optional` and reported as `Domain(NotFound)`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use autoflex_catalog::{
    BomLine, MaterialRef, Product, ProductDetails, RawMaterial, RawMaterialDetails,
    ensure_positive_quantity,
};
use autoflex_core::{DomainError, Entity, ProductId, RawMaterialId};
use autoflex_planning::StockSnapshot;

use super::{CatalogStore, StoreError, StoreResult};

/// Tables are created on startup if missing. BOM lines cascade with both ends.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY,
        code TEXT NOT NULL,
        name TEXT NOT NULL,
        price NUMERIC NOT NULL CHECK (price >= 0)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS raw_materials (
        id UUID PRIMARY KEY,
        code TEXT NOT NULL,
        name TEXT NOT NULL,
        stock_quantity BIGINT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS product_raw_materials (
        product_id UUID NOT NULL REFERENCES products (id) ON DELETE CASCADE,
        raw_material_id UUID NOT NULL REFERENCES raw_materials (id) ON DELETE CASCADE,
        quantity_required BIGINT NOT NULL CHECK (quantity_required > 0),
        position BIGSERIAL NOT NULL,
        PRIMARY KEY (product_id, raw_material_id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_product_raw_materials_raw_material
        ON product_raw_materials (raw_material_id)
    "#,
];

// Byte-wise code order, matching `str::cmp` in the in-memory store whatever
// the database locale.
const LIST_PRODUCTS: &str =
    r#"SELECT id, code, name, price FROM products ORDER BY code COLLATE "C", id"#;
const LIST_RAW_MATERIALS: &str =
    r#"SELECT id, code, name, stock_quantity FROM raw_materials ORDER BY code COLLATE "C", id"#;

const SELECT_LINES: &str = r#"
    SELECT
        prm.product_id,
        prm.raw_material_id,
        prm.quantity_required,
        rm.code AS raw_material_code,
        rm.name AS raw_material_name
    FROM product_raw_materials prm
    JOIN raw_materials rm ON rm.id = prm.raw_material_id
"#;

/// Catalog store on a Postgres connection pool.
///
/// `Send + Sync`; clones share the pool.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the catalog tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }

    async fn product_exists(&self, id: ProductId) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 FROM products WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_exists", e))?;
        Ok(row.is_some())
    }

    /// NotFound for the association, or for the product if that is what is missing.
    async fn missing_association(&self, product_id: ProductId) -> StoreError {
        match self.product_exists(product_id).await {
            Ok(true) => StoreError::not_found("association"),
            Ok(false) => StoreError::not_found("product"),
            Err(err) => err,
        }
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self), fields(product_count = tracing::field::Empty), err)]
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(LIST_PRODUCTS)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        let line_rows = sqlx::query(&format!("{SELECT_LINES} ORDER BY prm.position"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        let mut lines: HashMap<Uuid, Vec<BomLine>> = HashMap::new();
        for row in &line_rows {
            let product_id: Uuid = decode(row, "product_id")?;
            lines.entry(product_id).or_default().push(bom_line_from_row(row)?);
        }

        let mut products = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: Uuid = decode(row, "id")?;
            let materials = lines.remove(&id).unwrap_or_default();
            products.push(product_from_row(row, materials)?);
        }

        Span::current().record("product_count", products.len());
        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        let row = sqlx::query("SELECT id, code, name, price FROM products WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?
            .ok_or_else(|| StoreError::not_found("product"))?;

        let line_rows = sqlx::query(&format!(
            "{SELECT_LINES} WHERE prm.product_id = $1 ORDER BY prm.position"
        ))
        .bind(*id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        let materials = line_rows
            .iter()
            .map(bom_line_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        product_from_row(&row, materials)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id()), err)]
    async fn create_product(&self, product: Product) -> StoreResult<()> {
        let mut tx = self.begin().await?;

        sqlx::query("INSERT INTO products (id, code, name, price) VALUES ($1, $2, $3, $4)")
            .bind(*product.id().as_uuid())
            .bind(product.code())
            .bind(product.name())
            .bind(product.price())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_product", e))?;

        for line in product.materials() {
            sqlx::query(
                r#"
                INSERT INTO product_raw_materials (product_id, raw_material_id, quantity_required)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(*product.id().as_uuid())
            .bind(*line.raw_material_id.as_uuid())
            .bind(line.quantity_required)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_product", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self, details), fields(product_id = %id), err)]
    async fn update_product(&self, id: ProductId, details: ProductDetails) -> StoreResult<()> {
        details.validate()?;

        let result = sqlx::query(
            "UPDATE products SET code = $2, name = $3, price = $4 WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .bind(&details.code)
        .bind(&details.name)
        .bind(details.price)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product"));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product"));
        }
        Ok(())
    }

    #[instrument(
        skip(self),
        fields(product_id = %product_id, raw_material_id = %raw_material_id),
        err
    )]
    async fn add_material(
        &self,
        product_id: ProductId,
        raw_material_id: RawMaterialId,
        quantity_required: i64,
    ) -> StoreResult<()> {
        ensure_positive_quantity(quantity_required)?;

        let mut tx = self.begin().await?;

        // Lock the product row so concurrent association changes serialize.
        let product = sqlx::query("SELECT 1 FROM products WHERE id = $1 FOR UPDATE")
            .bind(*product_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("add_material", e))?;
        if product.is_none() {
            return Err(StoreError::not_found("product"));
        }

        let raw_material = sqlx::query("SELECT 1 FROM raw_materials WHERE id = $1")
            .bind(*raw_material_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("add_material", e))?;
        if raw_material.is_none() {
            return Err(StoreError::not_found("raw material"));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO product_raw_materials (product_id, raw_material_id, quantity_required)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, raw_material_id) DO NOTHING
            "#,
        )
        .bind(*product_id.as_uuid())
        .bind(*raw_material_id.as_uuid())
        .bind(quantity_required)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("add_material", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::conflict(
                "raw material is already associated with the product",
            ));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(
        skip(self),
        fields(product_id = %product_id, raw_material_id = %raw_material_id),
        err
    )]
    async fn update_material(
        &self,
        product_id: ProductId,
        raw_material_id: RawMaterialId,
        quantity_required: i64,
    ) -> StoreResult<()> {
        ensure_positive_quantity(quantity_required)?;

        let result = sqlx::query(
            r#"
            UPDATE product_raw_materials
            SET quantity_required = $3
            WHERE product_id = $1 AND raw_material_id = $2
            "#,
        )
        .bind(*product_id.as_uuid())
        .bind(*raw_material_id.as_uuid())
        .bind(quantity_required)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_material", e))?;

        if result.rows_affected() == 0 {
            return Err(self.missing_association(product_id).await);
        }
        Ok(())
    }

    #[instrument(
        skip(self),
        fields(product_id = %product_id, raw_material_id = %raw_material_id),
        err
    )]
    async fn remove_material(
        &self,
        product_id: ProductId,
        raw_material_id: RawMaterialId,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "DELETE FROM product_raw_materials WHERE product_id = $1 AND raw_material_id = $2",
        )
        .bind(*product_id.as_uuid())
        .bind(*raw_material_id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove_material", e))?;

        if result.rows_affected() == 0 {
            return Err(self.missing_association(product_id).await);
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_raw_materials(&self) -> StoreResult<Vec<RawMaterial>> {
        let rows = sqlx::query(LIST_RAW_MATERIALS)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_raw_materials", e))?;

        rows.iter().map(raw_material_from_row).collect()
    }

    #[instrument(skip(self), fields(raw_material_id = %id), err)]
    async fn get_raw_material(&self, id: RawMaterialId) -> StoreResult<RawMaterial> {
        let row = sqlx::query(
            "SELECT id, code, name, stock_quantity FROM raw_materials WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_raw_material", e))?
        .ok_or_else(|| StoreError::not_found("raw material"))?;

        raw_material_from_row(&row)
    }

    #[instrument(skip(self, raw_material), fields(raw_material_id = %raw_material.id()), err)]
    async fn create_raw_material(&self, raw_material: RawMaterial) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO raw_materials (id, code, name, stock_quantity) VALUES ($1, $2, $3, $4)",
        )
        .bind(*raw_material.id().as_uuid())
        .bind(raw_material.code())
        .bind(raw_material.name())
        .bind(raw_material.stock_quantity())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_raw_material", e))?;
        Ok(())
    }

    #[instrument(skip(self, details), fields(raw_material_id = %id), err)]
    async fn update_raw_material(
        &self,
        id: RawMaterialId,
        details: RawMaterialDetails,
    ) -> StoreResult<()> {
        details.validate()?;

        let result = sqlx::query(
            "UPDATE raw_materials SET code = $2, name = $3, stock_quantity = $4 WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .bind(&details.code)
        .bind(&details.name)
        .bind(details.stock_quantity)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_raw_material", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("raw material"));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(raw_material_id = %id), err)]
    async fn delete_raw_material(&self, id: RawMaterialId) -> StoreResult<()> {
        // BOM lines go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM raw_materials WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_raw_material", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("raw material"));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn stock_levels(&self) -> StoreResult<StockSnapshot> {
        let rows = sqlx::query("SELECT id, stock_quantity FROM raw_materials")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("stock_levels", e))?;

        rows.iter()
            .map(|row| {
                let id: Uuid = decode(row, "id")?;
                let qty: i64 = decode(row, "stock_quantity")?;
                Ok((RawMaterialId::from_uuid(id), qty))
            })
            .collect()
    }
}

fn decode<'r, T>(row: &'r PgRow, column: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Database(format!("failed to decode column {column}: {e}")))
}

fn product_from_row(row: &PgRow, materials: Vec<BomLine>) -> StoreResult<Product> {
    let id: Uuid = decode(row, "id")?;
    Ok(Product::restore(
        ProductId::from_uuid(id),
        ProductDetails {
            code: decode(row, "code")?,
            name: decode(row, "name")?,
            price: decode(row, "price")?,
        },
        materials,
    ))
}

fn bom_line_from_row(row: &PgRow) -> StoreResult<BomLine> {
    let raw_material_id: Uuid = decode(row, "raw_material_id")?;
    Ok(BomLine::new(
        RawMaterialId::from_uuid(raw_material_id),
        decode(row, "quantity_required")?,
    )
    .with_material(MaterialRef {
        code: decode(row, "raw_material_code")?,
        name: decode(row, "raw_material_name")?,
    }))
}

fn raw_material_from_row(row: &PgRow) -> StoreResult<RawMaterial> {
    let id: Uuid = decode(row, "id")?;
    Ok(RawMaterial::restore(
        RawMaterialId::from_uuid(id),
        RawMaterialDetails {
            code: decode(row, "code")?,
            name: decode(row, "name")?,
            stock_quantity: decode(row, "stock_quantity")?,
        },
    ))
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            match db_err.code().as_deref() {
                Some("23505") => StoreError::Domain(DomainError::conflict(msg)),
                Some("23514") => StoreError::Domain(DomainError::validation(msg)),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {}", operation))
        }
        other => StoreError::Database(format!("{} failed: {}", operation, other)),
    }
}
