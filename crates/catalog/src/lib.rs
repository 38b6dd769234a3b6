//! Catalog domain module.
//!
//! Products, raw materials and the bill-of-materials lines linking them,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod product;
pub mod raw_material;

pub use product::{BomLine, MaterialRef, Product, ProductDetails, ensure_positive_quantity};
pub use raw_material::{RawMaterial, RawMaterialDetails};

/// Stock and BOM quantities are 32-bit counts, kept in `i64` for arithmetic.
pub const MAX_QUANTITY: i64 = i32::MAX as i64;
pub const MIN_QUANTITY: i64 = i32::MIN as i64;
