//! Standard cost rollup over a bill-of-materials tree.
//!
//! The cost of one unit of a manufactured product is
//!
//! ```text
//! (sum of operation costs + sum of component costs) / batch quantity
//! ```
//!
//! converted from the BOM unit to the product unit. A component with its own
//! BOM is either re-costed recursively (and its stored standard cost updated
//! when it moved) or priced at its stored standard cost, depending on
//! [`needs_recompute`] and the recompute scope in [`RollupContext`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use erpext_core::Precision;
use erpext_products::{ChangeStandardCost, Product, StandardCostChanged, UnitOfMeasure, UomId};

use crate::bom::{BillOfMaterials, BomId, BomLine};
use crate::error::{RollupError, RollupResult};
use crate::store::ManufacturingStore;

/// Tunables of a rollup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupSettings {
    /// Re-cost every child BOM that needs it, not only the ones in the
    /// recompute set.
    pub recompute_all: bool,
    /// Cost changes within this precision are not written back.
    pub precision: Precision,
}

impl Default for RollupSettings {
    fn default() -> Self {
        Self {
            recompute_all: true,
            precision: Precision::CURRENCY,
        }
    }
}

/// Inputs shared by every node of one rollup.
#[derive(Debug, Clone)]
pub struct RollupContext {
    pub now: DateTime<Utc>,
    pub settings: RollupSettings,
    /// BOMs explicitly marked for recomputation.
    pub recompute: HashSet<BomId>,
}

impl RollupContext {
    pub fn new(now: DateTime<Utc>, settings: RollupSettings) -> Self {
        Self {
            now,
            settings,
            recompute: HashSet::new(),
        }
    }

    pub fn with_recompute(mut self, boms: impl IntoIterator<Item = BomId>) -> Self {
        self.recompute.extend(boms);
        self
    }

    fn in_scope(&self, child: BomId) -> bool {
        self.settings.recompute_all || self.recompute.contains(&child)
    }
}

/// Result of costing one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollupOutcome {
    /// Cost of one unit of the product, in the product's unit.
    pub unit_cost: Decimal,
    /// Standard costs written back for sub-components, in write order.
    pub cost_changes: Vec<StandardCostChanged>,
}

/// Whether a component with a child BOM must be re-costed instead of
/// priced at its stored standard cost.
///
/// True when the parent BOM was never costed, the component never had a
/// standard cost written, or the child BOM is stale.
pub fn needs_recompute(
    parent_costed_at: Option<DateTime<Utc>>,
    component_costed_at: Option<DateTime<Utc>>,
    child_bom_stale: bool,
) -> bool {
    parent_costed_at.is_none() || component_costed_at.is_none() || child_bom_stale
}

/// Cost one unit of `product` manufactured with `bom`.
///
/// Side effects, through `store`: every visited BOM is marked costed at
/// `ctx.now`, and re-costed components whose cost moved beyond
/// `ctx.settings.precision` get a new standard cost.
pub fn compute_rollup_cost<S>(
    store: &S,
    product: &Product,
    bom: &BillOfMaterials,
    ctx: &RollupContext,
) -> RollupResult<RollupOutcome>
where
    S: ManufacturingStore + ?Sized,
{
    let mut walk = Walk {
        store,
        ctx,
        path: Vec::new(),
        cost_changes: Vec::new(),
    };
    let unit_cost = walk.cost(product, bom)?;
    Ok(RollupOutcome {
        unit_cost,
        cost_changes: walk.cost_changes,
    })
}

struct Walk<'a, S: ?Sized> {
    store: &'a S,
    ctx: &'a RollupContext,
    /// BOMs currently being costed, root first.
    path: Vec<BomId>,
    cost_changes: Vec<StandardCostChanged>,
}

impl<S> Walk<'_, S>
where
    S: ManufacturingStore + ?Sized,
{
    fn cost(&mut self, product: &Product, bom: &BillOfMaterials) -> RollupResult<Decimal> {
        let bom_id = bom.id_typed();
        if self.path.contains(&bom_id) {
            let mut cycle = self.path.clone();
            cycle.push(bom_id);
            return Err(RollupError::Cycle(cycle));
        }

        self.path.push(bom_id);
        let result = self.cost_node(product, bom);
        self.path.pop();
        result
    }

    fn cost_node(&mut self, product: &Product, bom: &BillOfMaterials) -> RollupResult<Decimal> {
        let overflow = RollupError::Overflow(bom.id_typed());
        let mut total = Decimal::ZERO;

        for operation in bom.operations() {
            let workcenter = self
                .store
                .workcenter(operation.workcenter_id)
                .ok_or(RollupError::WorkcenterNotFound(operation.workcenter_id))?;
            total = workcenter
                .operation_cost(operation)
                .and_then(|cost| total.checked_add(cost))
                .ok_or_else(|| overflow.clone())?;
        }

        for line in bom.lines() {
            if line.skips(product) {
                tracing::debug!(bom = %bom.id_typed(), component = %line.product_id, "skipping bom line");
                continue;
            }
            let cost = self.line_cost(bom, line)?;
            total = total.checked_add(cost).ok_or_else(|| overflow.clone())?;
        }

        self.store.mark_bom_costed(bom.id_typed(), self.ctx.now)?;

        let bom_uom = self.uom(bom.uom_id())?;
        let product_uom = self.product_uom(product)?;
        let batch_cost = total.checked_div(bom.batch_quantity()).ok_or(overflow)?;
        Ok(bom_uom.convert_price(batch_cost, &product_uom)?)
    }

    /// Cost contributed by one component line, in the parent BOM's terms.
    fn line_cost(&mut self, parent: &BillOfMaterials, line: &BomLine) -> RollupResult<Decimal> {
        let component = self
            .store
            .product(line.product_id)
            .ok_or(RollupError::ProductNotFound(line.product_id))?;
        let component_uom = self.product_uom(&component)?;
        let line_uom = self.uom(line.uom_id)?;

        if let Some(child_id) = line.child_bom.filter(|id| self.ctx.in_scope(*id)) {
            let child = self
                .store
                .bom(child_id)
                .ok_or(RollupError::BomNotFound(child_id))?;
            let stale = child.is_stale(parent.cost_updated_at());

            if needs_recompute(parent.cost_updated_at(), component.cost_updated_at(), stale) {
                let child_cost = self.cost(&component, &child)?;
                self.write_back(&component, child_cost)?;
                let unit_cost = component_uom.convert_price(child_cost, &line_uom)?;
                return Self::extend(parent, unit_cost, line.quantity);
            }

            tracing::debug!(
                component = %component.default_code(),
                "reusing stored standard cost"
            );
        }

        let unit_cost = component_uom.convert_price(component.standard_cost(), &line_uom)?;
        Self::extend(parent, unit_cost, line.quantity)
    }

    fn extend(parent: &BillOfMaterials, unit_cost: Decimal, quantity: Decimal) -> RollupResult<Decimal> {
        unit_cost
            .checked_mul(quantity)
            .ok_or(RollupError::Overflow(parent.id_typed()))
    }

    fn write_back(&mut self, component: &Product, new_cost: Decimal) -> RollupResult<()> {
        let precision = self.ctx.settings.precision;
        if !precision.differs(new_cost, component.standard_cost()) {
            return Ok(());
        }

        let changed = self.store.change_standard_cost(ChangeStandardCost {
            product_id: component.id_typed(),
            new_cost,
            expense_account: self.store.expense_account(component),
            occurred_at: self.ctx.now,
        })?;
        tracing::info!(
            product = %component.default_code(),
            standard_cost = %changed.new_cost,
            previous_cost = %changed.previous_cost,
            "standard cost updated"
        );
        self.cost_changes.push(changed);
        Ok(())
    }

    fn uom(&self, id: UomId) -> RollupResult<UnitOfMeasure> {
        self.store.uom(id).ok_or(RollupError::UomNotFound(id))
    }

    fn product_uom(&self, product: &Product) -> RollupResult<UnitOfMeasure> {
        let id = product
            .uom_id()
            .ok_or(RollupError::ProductWithoutUom(product.id_typed()))?;
        self.uom(id)
    }
}
