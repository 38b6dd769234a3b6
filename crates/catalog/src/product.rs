use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use autoflex_core::{DomainError, DomainResult, Entity, ProductId, RawMaterialId};

use crate::MAX_QUANTITY;

/// Editable product fields (create + update input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub code: String,
    pub name: String,
    /// Unit price; must be non-negative.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub price: Decimal,
}

impl ProductDetails {
    pub fn validate(&self) -> DomainResult<()> {
        if self.code.trim().is_empty() {
            return Err(DomainError::validation("code cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.price < Decimal::ZERO {
            return Err(DomainError::validation("price cannot be negative"));
        }
        Ok(())
    }
}

/// Code and name of the raw material a BOM line points at (joined on read).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRef {
    pub code: String,
    pub name: String,
}

/// One bill-of-materials line: units of a raw material consumed per unit of product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BomLine {
    pub raw_material_id: RawMaterialId,
    pub quantity_required: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub raw_material: Option<MaterialRef>,
}

impl BomLine {
    pub fn new(raw_material_id: RawMaterialId, quantity_required: i64) -> Self {
        Self {
            raw_material_id,
            quantity_required,
            raw_material: None,
        }
    }

    pub fn with_material(mut self, material: MaterialRef) -> Self {
        self.raw_material = Some(material);
        self
    }
}

/// A finished product and its bill of materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: ProductId,
    code: String,
    name: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    price: Decimal,
    materials: Vec<BomLine>,
}

impl Product {
    /// Create a new product with an empty bill of materials.
    pub fn create(id: ProductId, details: ProductDetails) -> DomainResult<Self> {
        details.validate()?;
        Ok(Self {
            id,
            code: details.code,
            name: details.name,
            price: details.price,
            materials: Vec::new(),
        })
    }

    /// Rebuild a product from stored state without re-validating it.
    ///
    /// Storage may hold rows written before validation existed (e.g. BOM lines
    /// with a zero quantity); the planner has to see them as they are.
    pub fn restore(id: ProductId, details: ProductDetails, materials: Vec<BomLine>) -> Self {
        Self {
            id,
            code: details.code,
            name: details.name,
            price: details.price,
            materials,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn materials(&self) -> &[BomLine] {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut [BomLine] {
        &mut self.materials
    }

    pub fn details(&self) -> ProductDetails {
        ProductDetails {
            code: self.code.clone(),
            name: self.name.clone(),
            price: self.price,
        }
    }

    /// Replace code, name and price. The bill of materials is left untouched.
    pub fn update(&mut self, details: ProductDetails) -> DomainResult<()> {
        details.validate()?;
        self.code = details.code;
        self.name = details.name;
        self.price = details.price;
        Ok(())
    }

    /// Link a raw material to this product.
    pub fn add_material(
        &mut self,
        raw_material_id: RawMaterialId,
        quantity_required: i64,
    ) -> DomainResult<()> {
        ensure_positive_quantity(quantity_required)?;

        if self.line_index(raw_material_id).is_some() {
            return Err(DomainError::conflict(
                "raw material is already associated with the product",
            ));
        }

        self.materials
            .push(BomLine::new(raw_material_id, quantity_required));
        Ok(())
    }

    /// Change the quantity of an existing BOM line.
    pub fn update_material(
        &mut self,
        raw_material_id: RawMaterialId,
        quantity_required: i64,
    ) -> DomainResult<()> {
        ensure_positive_quantity(quantity_required)?;

        let idx = self
            .line_index(raw_material_id)
            .ok_or_else(|| DomainError::not_found("association"))?;
        self.materials[idx].quantity_required = quantity_required;
        Ok(())
    }

    /// Remove an existing BOM line.
    pub fn remove_material(&mut self, raw_material_id: RawMaterialId) -> DomainResult<()> {
        let idx = self
            .line_index(raw_material_id)
            .ok_or_else(|| DomainError::not_found("association"))?;
        self.materials.remove(idx);
        Ok(())
    }

    /// Remove the BOM line for a raw material if present (raw material deleted).
    pub fn drop_material(&mut self, raw_material_id: RawMaterialId) {
        self.materials
            .retain(|line| line.raw_material_id != raw_material_id);
    }

    fn line_index(&self, raw_material_id: RawMaterialId) -> Option<usize> {
        self.materials
            .iter()
            .position(|line| line.raw_material_id == raw_material_id)
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// BOM quantities must be strictly positive and fit a 32-bit count.
pub fn ensure_positive_quantity(quantity_required: i64) -> DomainResult<()> {
    if quantity_required <= 0 {
        return Err(DomainError::validation(
            "quantityRequired must be greater than 0",
        ));
    }
    if quantity_required > MAX_QUANTITY {
        return Err(DomainError::validation(format!(
            "quantityRequired cannot exceed {MAX_QUANTITY}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn details(code: &str, name: &str, price: Decimal) -> ProductDetails {
        ProductDetails {
            code: code.to_string(),
            name: name.to_string(),
            price,
        }
    }

    fn test_product() -> Product {
        Product::create(ProductId::new(), details("P-001", "Table", dec!(150.00))).unwrap()
    }

    #[test]
    fn create_product_starts_without_materials() {
        let id = ProductId::new();
        let product = Product::create(id, details("P-001", "Table", dec!(150.00))).unwrap();

        assert_eq!(product.id(), id);
        assert_eq!(product.code(), "P-001");
        assert_eq!(product.name(), "Table");
        assert_eq!(product.price(), dec!(150.00));
        assert!(product.materials().is_empty());
    }

    #[test]
    fn create_product_rejects_blank_code() {
        let err = Product::create(ProductId::new(), details("  ", "Table", dec!(1))).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for blank code"),
        }
    }

    #[test]
    fn create_product_rejects_blank_name() {
        let err = Product::create(ProductId::new(), details("P-1", "", dec!(1))).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for blank name"),
        }
    }

    #[test]
    fn create_product_rejects_negative_price() {
        let err =
            Product::create(ProductId::new(), details("P-1", "Chair", dec!(-0.01))).unwrap_err();
        assert_eq!(err, DomainError::validation("price cannot be negative"));
    }

    #[test]
    fn zero_price_is_allowed() {
        assert!(Product::create(ProductId::new(), details("P-1", "Sample", dec!(0))).is_ok());
    }

    #[test]
    fn update_keeps_materials() {
        let mut product = test_product();
        let rm = RawMaterialId::new();
        product.add_material(rm, 4).unwrap();

        product
            .update(details("P-002", "Desk", dec!(99.90)))
            .unwrap();

        assert_eq!(product.code(), "P-002");
        assert_eq!(product.price(), dec!(99.90));
        assert_eq!(product.materials(), &[BomLine::new(rm, 4)]);
    }

    #[test]
    fn failed_update_leaves_product_unchanged() {
        let mut product = test_product();
        let before = product.clone();

        assert!(product.update(details("", "Desk", dec!(1))).is_err());
        assert_eq!(product, before);
    }

    #[test]
    fn add_material_rejects_non_positive_quantity() {
        let mut product = test_product();

        for qty in [0, -3, MAX_QUANTITY + 1, i64::MAX] {
            let err = product.add_material(RawMaterialId::new(), qty).unwrap_err();
            match err {
                DomainError::Validation(_) => {}
                _ => panic!("Expected Validation error for quantity {qty}"),
            }
        }
        assert!(product.materials().is_empty());
    }

    #[test]
    fn add_material_rejects_duplicate_raw_material() {
        let mut product = test_product();
        let rm = RawMaterialId::new();
        product.add_material(rm, 2).unwrap();

        let err = product.add_material(rm, 5).unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for duplicate line"),
        }
        assert_eq!(product.materials().len(), 1);
        assert_eq!(product.materials()[0].quantity_required, 2);
    }

    #[test]
    fn add_material_preserves_insertion_order() {
        let mut product = test_product();
        let a = RawMaterialId::new();
        let b = RawMaterialId::new();
        product.add_material(b, 1).unwrap();
        product.add_material(a, 2).unwrap();

        let ids: Vec<_> = product.materials().iter().map(|l| l.raw_material_id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn update_material_changes_quantity() {
        let mut product = test_product();
        let rm = RawMaterialId::new();
        product.add_material(rm, 2).unwrap();

        product.update_material(rm, 7).unwrap();
        assert_eq!(product.materials()[0].quantity_required, 7);

        product.update_material(rm, MAX_QUANTITY).unwrap();
        assert!(product.update_material(rm, MAX_QUANTITY + 1).is_err());
        assert_eq!(product.materials()[0].quantity_required, MAX_QUANTITY);
    }

    #[test]
    fn update_material_requires_existing_line() {
        let mut product = test_product();
        let err = product.update_material(RawMaterialId::new(), 1).unwrap_err();
        assert_eq!(err, DomainError::not_found("association"));
    }

    #[test]
    fn update_material_validates_before_lookup() {
        let mut product = test_product();
        let err = product.update_material(RawMaterialId::new(), 0).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn remove_material_deletes_line() {
        let mut product = test_product();
        let rm = RawMaterialId::new();
        product.add_material(rm, 2).unwrap();

        product.remove_material(rm).unwrap();
        assert!(product.materials().is_empty());
        assert_eq!(
            product.remove_material(rm).unwrap_err(),
            DomainError::not_found("association")
        );
    }

    #[test]
    fn drop_material_is_silent_when_absent() {
        let mut product = test_product();
        let kept = RawMaterialId::new();
        product.add_material(kept, 1).unwrap();

        product.drop_material(RawMaterialId::new());
        assert_eq!(product.materials().len(), 1);

        product.drop_material(kept);
        assert!(product.materials().is_empty());
    }

    #[test]
    fn restore_accepts_stored_lines_as_is() {
        let rm = RawMaterialId::new();
        let product = Product::restore(
            ProductId::new(),
            details("P-9", "Legacy", dec!(10)),
            vec![BomLine::new(rm, 0)],
        );
        assert_eq!(product.materials()[0].quantity_required, 0);
    }

    #[test]
    fn serializes_in_camel_case() {
        let mut product = test_product();
        let rm = RawMaterialId::new();
        product.add_material(rm, 3).unwrap();
        product.materials_mut()[0].raw_material = Some(MaterialRef {
            code: "RM-1".to_string(),
            name: "Wood".to_string(),
        });

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["code"], "P-001");
        assert_eq!(json["materials"][0]["rawMaterialId"], rm.to_string());
        assert_eq!(json["materials"][0]["quantityRequired"], 3);
        assert_eq!(json["materials"][0]["rawMaterial"]["name"], "Wood");
    }

    #[test]
    fn price_is_an_exact_json_number() {
        let text = serde_json::to_string(&test_product()).unwrap();
        assert!(text.contains(r#""price":150.00"#), "{text}");

        let from_number: ProductDetails =
            serde_json::from_str(r#"{"code":"P-1","name":"Desk","price":0.10}"#).unwrap();
        assert_eq!(from_number.price, dec!(0.10));
        let from_string: ProductDetails =
            serde_json::from_str(r#"{"code":"P-1","name":"Desk","price":"12.50"}"#).unwrap();
        assert_eq!(from_string.price, dec!(12.50));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: at most one BOM line per raw material, whatever the add sequence.
            #[test]
            fn bom_lines_stay_unique(
                ops in proptest::collection::vec((0usize..4, -2i64..6), 0..40),
            ) {
                let pool: Vec<RawMaterialId> = (0..4).map(|_| RawMaterialId::new()).collect();
                let mut product = test_product();

                for (idx, qty) in ops {
                    let _ = product.add_material(pool[idx], qty);
                }

                let mut seen = std::collections::HashSet::new();
                for line in product.materials() {
                    prop_assert!(seen.insert(line.raw_material_id));
                    prop_assert!(line.quantity_required > 0);
                }
            }

            /// Property: valid details always produce a product with the same details.
            #[test]
            fn create_round_trips_details(
                code in "[A-Z0-9-]{1,12}",
                name in "[A-Za-z][A-Za-z0-9 ]{0,40}",
                cents in 0i64..10_000_000,
            ) {
                let d = details(&code, &name, Decimal::new(cents, 2));
                let product = Product::create(ProductId::new(), d.clone()).unwrap();
                prop_assert_eq!(product.details(), d);
            }
        }
    }
}
