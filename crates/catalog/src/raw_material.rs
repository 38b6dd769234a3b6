use serde::{Deserialize, Serialize};

use autoflex_core::{DomainError, DomainResult, Entity, RawMaterialId};

use crate::{MAX_QUANTITY, MIN_QUANTITY};

/// Editable raw material fields (create + update input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMaterialDetails {
    pub code: String,
    pub name: String,
    pub stock_quantity: i64,
}

impl RawMaterialDetails {
    pub fn validate(&self) -> DomainResult<()> {
        if self.code.trim().is_empty() {
            return Err(DomainError::validation("code cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&self.stock_quantity) {
            return Err(DomainError::validation(format!(
                "stockQuantity must be between {MIN_QUANTITY} and {MAX_QUANTITY}"
            )));
        }
        Ok(())
    }
}

/// A stock-keeping input consumed by products.
///
/// Stock is a plain integer count. Negative values are accepted as recorded
/// data (e.g. after a manual correction); planning treats them as empty stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMaterial {
    id: RawMaterialId,
    code: String,
    name: String,
    stock_quantity: i64,
}

impl RawMaterial {
    pub fn create(id: RawMaterialId, details: RawMaterialDetails) -> DomainResult<Self> {
        details.validate()?;
        Ok(Self::restore(id, details))
    }

    /// Rebuild from stored state without re-validating it.
    pub fn restore(id: RawMaterialId, details: RawMaterialDetails) -> Self {
        Self {
            id,
            code: details.code,
            name: details.name,
            stock_quantity: details.stock_quantity,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stock_quantity(&self) -> i64 {
        self.stock_quantity
    }

    pub fn update(&mut self, details: RawMaterialDetails) -> DomainResult<()> {
        details.validate()?;
        self.code = details.code;
        self.name = details.name;
        self.stock_quantity = details.stock_quantity;
        Ok(())
    }
}

impl Entity for RawMaterial {
    type Id = RawMaterialId;

    fn id(&self) -> Self::Id {
        self.id
    }
}
