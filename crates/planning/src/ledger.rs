//! Per-run stock ledger.

use std::collections::HashMap;

use thiserror::Error;

use autoflex_core::RawMaterialId;

/// Units of one raw material needed to make a single unit of a product.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub raw_material_id: RawMaterialId,
    pub per_unit: i64,
}

/// A commit would have driven a material below zero.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("insufficient stock for raw material {raw_material_id}: need {needed}, have {available}")]
pub struct InsufficientStock {
    pub raw_material_id: RawMaterialId,
    pub needed: i64,
    pub available: i64,
}

/// Remaining raw-material quantities during one allocation run.
///
/// Seeded from a stock snapshot and debited as products are committed. Never
/// shared between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockLedger {
    remaining: HashMap<RawMaterialId, i64>,
}

impl StockLedger {
    /// Seed from a snapshot. Negative recorded stock counts as empty.
    pub fn seed(stock: &HashMap<RawMaterialId, i64>) -> Self {
        let remaining = stock
            .iter()
            .map(|(id, qty)| (*id, (*qty).max(0)))
            .collect();
        Self { remaining }
    }

    /// Remaining quantity; materials never seen count as zero.
    pub fn available(&self, raw_material_id: RawMaterialId) -> i64 {
        self.remaining.get(&raw_material_id).copied().unwrap_or(0)
    }

    /// Whole units producible from current stock: the scarcest input binds.
    ///
    /// Returns 0 for an empty requirement list or any non-positive per-unit
    /// requirement.
    pub fn producible(&self, requirements: &[Requirement]) -> i64 {
        let mut units: Option<i64> = None;

        for req in requirements {
            if req.per_unit <= 0 {
                return 0;
            }
            let possible = self.available(req.raw_material_id) / req.per_unit;
            units = Some(units.map_or(possible, |u| u.min(possible)));
        }

        units.unwrap_or(0)
    }

    /// Debit `quantity` units worth of every requirement.
    ///
    /// Checks every line first; on failure nothing is debited. A non-positive
    /// quantity is a no-op.
    pub fn commit(
        &mut self,
        requirements: &[Requirement],
        quantity: i64,
    ) -> Result<(), InsufficientStock> {
        if quantity <= 0 {
            return Ok(());
        }

        // Lines naming the same material are checked against their combined debit.
        let mut debits: HashMap<RawMaterialId, i64> = HashMap::with_capacity(requirements.len());
        for req in requirements {
            let available = self.available(req.raw_material_id);
            let already = debits.get(&req.raw_material_id).copied().unwrap_or(0);
            let total = req
                .per_unit
                .checked_mul(quantity)
                .and_then(|line| line.checked_add(already));

            match total {
                Some(needed) if needed <= available => {
                    debits.insert(req.raw_material_id, needed);
                }
                needed => {
                    return Err(InsufficientStock {
                        raw_material_id: req.raw_material_id,
                        needed: needed.unwrap_or(i64::MAX),
                        available,
                    });
                }
            }
        }

        for (raw_material_id, needed) in debits {
            *self.remaining.entry(raw_material_id).or_insert(0) -= needed;
        }

        Ok(())
    }
}
