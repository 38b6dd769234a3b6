//! `autoflex-planning`
//!
//! **Responsibility:** production suggestions.
//!
//! Given the catalog (products with their bills of materials) and a stock
//! snapshot, compute how many units of each product to make. Pure and
//! synchronous:
//! - It must not perform IO.
//! - It must not mutate catalog state; suggestions are advisory only.

pub mod allocation;
pub mod ledger;

pub use allocation::{AllocationItem, AllocationResult, StockSnapshot, compute_suggestion};
pub use ledger::{InsufficientStock, Requirement, StockLedger};
