use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use autoflex_catalog::{ProductDetails, RawMaterialDetails};
use autoflex_core::{DomainError, RawMaterialId};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub code: String,
    pub name: String,
    /// Accepts a JSON number or a decimal string.
    pub price: Decimal,
}

impl From<ProductRequest> for ProductDetails {
    fn from(req: ProductRequest) -> Self {
        Self {
            code: req.code,
            name: req.name,
            price: req.price,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMaterialRequest {
    pub code: String,
    pub name: String,
    pub stock_quantity: i64,
}

impl From<RawMaterialRequest> for RawMaterialDetails {
    fn from(req: RawMaterialRequest) -> Self {
        Self {
            code: req.code,
            name: req.name,
            stock_quantity: req.stock_quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMaterialRequest {
    pub raw_material_id: String,
    pub quantity_required: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaterialRequest {
    pub quantity_required: i64,
}

// -------------------------
// Path helpers
// -------------------------

/// Parse an id from a path segment or body field, answering 400 on failure.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(errors::domain_error_to_response)
}

pub fn parse_raw_material_id(raw: &str) -> Result<RawMaterialId, axum::response::Response> {
    parse_id(raw)
}
