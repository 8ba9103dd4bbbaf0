use thiserror::Error;

use erpext_core::DomainError;
use erpext_products::{ProductId, UomId};

use crate::bom::BomId;
use crate::workcenter::WorkcenterId;

pub type RollupResult<T> = Result<T, RollupError>;

/// Failures of a cost rollup.
///
/// Apart from `Domain` and `Overflow`, these are lookups the store could not
/// satisfy or a BOM graph that is not a tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RollupError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("bill of materials {0} not found")]
    BomNotFound(BomId),

    #[error("no bill of materials produces product {0}")]
    NoBomForProduct(String),

    #[error("unit of measure {0} not found")]
    UomNotFound(UomId),

    #[error("product {0} has no unit of measure")]
    ProductWithoutUom(ProductId),

    #[error("workcenter {0} not found")]
    WorkcenterNotFound(WorkcenterId),

    /// A cost left the range `Decimal` can represent.
    #[error("cost of bill of materials {0} overflowed")]
    Overflow(BomId),

    /// The BOM graph loops back onto a BOM already being costed.
    #[error("bill of materials cycle: {}", format_path(.0))]
    Cycle(Vec<BomId>),
}

fn format_path(path: &[BomId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
