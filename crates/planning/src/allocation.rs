//! Greedy production suggestion.
//!
//! Model:
//! - Products are visited by unit price, highest first. Equal prices keep the
//!   order they were passed in (stable sort).
//! - Each product gets as many whole units as the scarcest of its inputs allows,
//!   measured against what earlier products left in the ledger.
//! - Products that cannot make at least one unit are left out of the result.
//! - A product whose value would overflow `Decimal` is left out too, and its
//!   inputs stay in the ledger.
//!
//! There is no backtracking: a more expensive product can starve a cheaper one
//! even when the cheaper one would have raised the grand total.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use autoflex_catalog::Product;
use autoflex_core::{Entity, ProductId, RawMaterialId};

use crate::ledger::{Requirement, StockLedger};

/// Available quantity per raw material at the time the suggestion is requested.
pub type StockSnapshot = HashMap<RawMaterialId, i64>;

/// One line of the suggestion: make `quantity_to_produce` units of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationItem {
    product_id: ProductId,
    product_code: String,
    product_name: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    unit_price: Decimal,
    quantity_to_produce: i64,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    total_value: Decimal,
}

impl AllocationItem {
    /// `None` when `unit_price * quantity_to_produce` does not fit in a `Decimal`.
    fn new(product: &Product, quantity_to_produce: i64) -> Option<Self> {
        let unit_price = product.price();
        let total_value = unit_price.checked_mul(Decimal::from(quantity_to_produce))?;
        Some(Self {
            product_id: product.id(),
            product_code: product.code().to_string(),
            product_name: product.name().to_string(),
            unit_price,
            quantity_to_produce,
            total_value,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_code(&self) -> &str {
        &self.product_code
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn quantity_to_produce(&self) -> i64 {
        self.quantity_to_produce
    }

    /// `unit_price * quantity_to_produce`.
    pub fn total_value(&self) -> Decimal {
        self.total_value
    }
}

/// Ordered suggestion plus its grand total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationResult {
    items: Vec<AllocationItem>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    grand_total_value: Decimal,
}

impl AllocationResult {
    /// Items in the order they were allocated (price descending).
    pub fn items(&self) -> &[AllocationItem] {
        &self.items
    }

    pub fn grand_total_value(&self) -> Decimal {
        self.grand_total_value
    }

    /// Sum of units across all items, saturating at `i64::MAX`.
    pub fn total_quantity(&self) -> i64 {
        self.items
            .iter()
            .fold(0i64, |acc, i| acc.saturating_add(i.quantity_to_produce))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Compute a production suggestion for `products` against `stock`.
///
/// Pure: the snapshot is copied into a ledger that lives only for this call.
pub fn compute_suggestion(products: &[Product], stock: &StockSnapshot) -> AllocationResult {
    let mut ledger = StockLedger::seed(stock);
    allocate(products, &mut ledger)
}

fn allocate(products: &[Product], ledger: &mut StockLedger) -> AllocationResult {
    let mut ordered: Vec<&Product> = products.iter().collect();
    ordered.sort_by(|a, b| b.price().cmp(&a.price()));

    let mut result = AllocationResult::default();
    for product in ordered {
        let Some(requirements) = requirements_for(product) else {
            continue;
        };

        let quantity = ledger.producible(&requirements);
        if quantity <= 0 {
            continue;
        }

        // Valued before committing so an unrepresentable total leaves stock alone.
        let Some(item) = AllocationItem::new(product, quantity) else {
            continue;
        };
        let Some(grand_total_value) = result.grand_total_value.checked_add(item.total_value)
        else {
            continue;
        };

        // `producible` already bounds the quantity; a failed commit would mean a
        // broken ledger, so the product is skipped rather than over-drawing.
        if ledger.commit(&requirements, quantity).is_err() {
            continue;
        }

        result.grand_total_value = grand_total_value;
        result.items.push(item);
    }

    result
}

/// Per-material requirements for one unit, or `None` when the product cannot
/// be planned (no BOM lines, or a line with a non-positive quantity).
///
/// Repeated lines for the same material are merged.
fn requirements_for(product: &Product) -> Option<Vec<Requirement>> {
    let lines = product.materials();
    if lines.is_empty() {
        return None;
    }

    let mut requirements: Vec<Requirement> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity_required <= 0 {
            return None;
        }
        match requirements
            .iter_mut()
            .find(|r| r.raw_material_id == line.raw_material_id)
        {
            Some(existing) => {
                existing.per_unit = existing.per_unit.checked_add(line.quantity_required)?;
            }
            None => requirements.push(Requirement {
                raw_material_id: line.raw_material_id,
                per_unit: line.quantity_required,
            }),
        }
    }

    Some(requirements)
}
