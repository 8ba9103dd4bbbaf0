//! Storage abstraction the rollup reads from and writes back to.

use chrono::{DateTime, Utc};

use erpext_accounting::AccountId;
use erpext_core::DomainResult;
use erpext_products::{
    CategoryId, ChangeStandardCost, Product, ProductCategory, ProductId, StandardCostChanged,
    UnitOfMeasure, UomId,
};

use crate::bom::{BillOfMaterials, BomId};
use crate::workcenter::{Workcenter, WorkcenterId};

/// Products, BOMs and their reference data, plus the two write-backs a
/// rollup performs.
///
/// Implementations are expected to make each write durable on its own
/// (one write = one transaction); the rollup does not batch them.
pub trait ManufacturingStore: Send + Sync {
    fn product(&self, id: ProductId) -> Option<Product>;
    fn category(&self, id: CategoryId) -> Option<ProductCategory>;
    fn uom(&self, id: UomId) -> Option<UnitOfMeasure>;
    fn workcenter(&self, id: WorkcenterId) -> Option<Workcenter>;
    fn bom(&self, id: BomId) -> Option<BillOfMaterials>;
    fn boms(&self) -> Vec<BillOfMaterials>;

    /// Run a `ChangeStandardCost` command against the stored product.
    fn change_standard_cost(&self, command: ChangeStandardCost) -> DomainResult<StandardCostChanged>;

    /// Record that `bom` was costed at `at`.
    fn mark_bom_costed(&self, bom: BomId, at: DateTime<Utc>) -> DomainResult<()>;

    /// BOM used to manufacture `product`.
    ///
    /// Variant-specific BOMs win over template BOMs; ties go to the lowest
    /// sequence.
    fn find_bom(&self, product: &Product) -> Option<BillOfMaterials> {
        self.boms()
            .into_iter()
            .filter(|bom| bom.produces(product))
            .min_by_key(|bom| (!bom.is_variant_specific(), bom.sequence()))
    }

    /// Account a standard cost revaluation of `product` is booked against:
    /// the product's own expense account, else its category's.
    fn expense_account(&self, product: &Product) -> Option<AccountId> {
        product.expense_account().or_else(|| {
            product
                .category_id()
                .and_then(|id| self.category(id))
                .and_then(|category| category.expense_account)
        })
    }
}
