//! Manufacturing module: workcenters, bills of materials and the standard
//! cost rollup over BOM trees.
//!
//! The rollup reads products and BOMs through [`ManufacturingStore`] and
//! writes new standard costs back through the same store, one
//! `ChangeStandardCost` command per changed product.

pub mod action;
pub mod bom;
pub mod error;
pub mod in_memory;
pub mod rollup;
pub mod store;
pub mod workcenter;

#[cfg(test)]
mod testing;

pub use action::update_bom_cost;
pub use bom::{BillOfMaterials, BomId, BomLine, BomOwner};
pub use error::{RollupError, RollupResult};
pub use in_memory::InMemoryManufacturingStore;
pub use rollup::{RollupContext, RollupOutcome, RollupSettings, compute_rollup_cost, needs_recompute};
pub use store::ManufacturingStore;
pub use workcenter::{Operation, Workcenter, WorkcenterId};
