//! Bills of materials.
//!
//! A BOM references its components by product id and, for manufactured
//! components, the child BOM by id. The resulting graph must be acyclic; the
//! rollup checks this while walking it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use erpext_core::{DomainError, DomainResult, Entity, RecordId, define_id};
use erpext_products::{Product, ProductId, ProductTemplateId, UomId};

use crate::workcenter::Operation;

define_id!(BomId, RecordId, "Bill of materials identifier.");

/// What a BOM produces: one specific variant, or every variant of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum BomOwner {
    Product(ProductId),
    Template(ProductTemplateId),
}

/// Component line of a BOM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomLine {
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub uom_id: UomId,
    /// BOM producing the component, when it is itself manufactured.
    pub child_bom: Option<BomId>,
    /// Line is kept on the BOM but never costed.
    #[serde(default)]
    pub excluded_from_cost: bool,
    /// Variants this line applies to; empty means every variant.
    #[serde(default)]
    pub only_for_variants: Vec<ProductId>,
}

impl BomLine {
    /// Whether this line contributes nothing when costing `product`.
    pub fn skips(&self, product: &Product) -> bool {
        self.excluded_from_cost
            || (!self.only_for_variants.is_empty()
                && !self.only_for_variants.contains(&product.id_typed()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillOfMaterials {
    id: BomId,
    owner: BomOwner,
    /// Lower sequence wins when several BOMs match a product.
    sequence: u32,
    /// Quantity produced per batch, in `uom_id`.
    batch_quantity: Decimal,
    uom_id: UomId,
    operations: Vec<Operation>,
    lines: Vec<BomLine>,
    cost_updated_at: Option<DateTime<Utc>>,
}

impl BillOfMaterials {
    pub fn new(
        id: BomId,
        owner: BomOwner,
        batch_quantity: Decimal,
        uom_id: UomId,
        operations: Vec<Operation>,
        lines: Vec<BomLine>,
    ) -> DomainResult<Self> {
        if batch_quantity <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "bom {id}: batch quantity must be positive"
            )));
        }
        if let Some(line) = lines.iter().find(|l| l.quantity < Decimal::ZERO) {
            return Err(DomainError::validation(format!(
                "bom {id}: component {} has a negative quantity",
                line.product_id
            )));
        }
        if let Some(op) = operations.iter().find(|o| o.cycle_minutes < Decimal::ZERO) {
            return Err(DomainError::validation(format!(
                "bom {id}: operation {} has a negative cycle time",
                op.name
            )));
        }
        Ok(Self {
            id,
            owner,
            sequence: 0,
            batch_quantity,
            uom_id,
            operations,
            lines,
            cost_updated_at: None,
        })
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_cost_updated_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.cost_updated_at = at;
        self
    }

    pub fn id_typed(&self) -> BomId {
        self.id
    }

    pub fn owner(&self) -> BomOwner {
        self.owner
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn batch_quantity(&self) -> Decimal {
        self.batch_quantity
    }

    pub fn uom_id(&self) -> UomId {
        self.uom_id
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn lines(&self) -> &[BomLine] {
        &self.lines
    }

    /// Last time this BOM was costed.
    pub fn cost_updated_at(&self) -> Option<DateTime<Utc>> {
        self.cost_updated_at
    }

    pub fn mark_costed(&mut self, at: DateTime<Utc>) {
        self.cost_updated_at = Some(at);
    }

    /// Whether this BOM's cost predates `reference`.
    ///
    /// A BOM that was never costed is always stale; with no reference it is
    /// stale only if never costed.
    pub fn is_stale(&self, reference: Option<DateTime<Utc>>) -> bool {
        match (self.cost_updated_at, reference) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(costed), Some(reference)) => costed < reference,
        }
    }

    /// Whether this BOM produces `product` (directly or through its template).
    pub fn produces(&self, product: &Product) -> bool {
        match self.owner {
            BomOwner::Product(id) => id == product.id_typed(),
            BomOwner::Template(template) => product.template_id() == Some(template),
        }
    }

    /// Whether this BOM is owned by `product` itself, not just its template.
    pub fn is_variant_specific(&self) -> bool {
        matches!(self.owner, BomOwner::Product(_))
    }
}

impl Entity for BillOfMaterials {
    type Id = BomId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn bom(batch: Decimal) -> DomainResult<BillOfMaterials> {
        BillOfMaterials::new(
            BomId::generate(),
            BomOwner::Product(ProductId::generate()),
            batch,
            UomId::generate(),
            Vec::new(),
            Vec::new(),
        )
    }

    #[test]
    fn batch_quantity_must_be_positive() {
        assert!(matches!(bom(Decimal::ZERO), Err(DomainError::Validation(_))));
        assert!(bom(Decimal::ONE).is_ok());
    }

    #[test]
    fn negative_component_quantity_is_rejected() {
        let err = BillOfMaterials::new(
            BomId::generate(),
            BomOwner::Product(ProductId::generate()),
            Decimal::ONE,
            UomId::generate(),
            Vec::new(),
            vec![BomLine {
                product_id: ProductId::generate(),
                quantity: Decimal::from(-2),
                uom_id: UomId::generate(),
                child_bom: None,
                excluded_from_cost: false,
                only_for_variants: Vec::new(),
            }],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn staleness_compares_against_reference() {
        let now = Utc::now();
        let never = bom(Decimal::ONE).unwrap();
        assert!(never.is_stale(None));
        assert!(never.is_stale(Some(now)));

        let costed = bom(Decimal::ONE).unwrap().with_cost_updated_at(Some(now));
        assert!(!costed.is_stale(None));
        assert!(!costed.is_stale(Some(now)));
        assert!(!costed.is_stale(Some(now - Duration::hours(1))));
        assert!(costed.is_stale(Some(now + Duration::hours(1))));
    }
}
