//! Units of measure and price conversion between them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use erpext_core::{DomainError, DomainResult, Entity, RecordId, ValueObject, define_id};

define_id!(UomId, RecordId, "Unit of measure identifier.");
define_id!(UomCategoryId, RecordId, "Unit of measure category identifier (e.g. weight).");

/// Size of a unit relative to the reference unit of its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "ratio", rename_all = "snake_case")]
pub enum UomKind {
    /// The reference unit of the category.
    Reference,
    /// `ratio` reference units make one of this unit (dozen = 12 units).
    Bigger(Decimal),
    /// `ratio` of this unit make one reference unit (1000 g = 1 kg).
    Smaller(Decimal),
}

impl ValueObject for UomKind {}

impl UomKind {
    /// Reference units per one of this unit, as `(numerator, denominator)`.
    fn reference_size(self) -> (Decimal, Decimal) {
        match self {
            UomKind::Reference => (Decimal::ONE, Decimal::ONE),
            UomKind::Bigger(ratio) => (ratio, Decimal::ONE),
            UomKind::Smaller(ratio) => (Decimal::ONE, ratio),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOfMeasure {
    id: UomId,
    name: String,
    category: UomCategoryId,
    kind: UomKind,
}

impl UnitOfMeasure {
    pub fn new(
        id: UomId,
        name: impl Into<String>,
        category: UomCategoryId,
        kind: UomKind,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("unit name cannot be empty"));
        }
        match kind {
            UomKind::Bigger(ratio) | UomKind::Smaller(ratio) if ratio <= Decimal::ZERO => {
                return Err(DomainError::validation(format!(
                    "unit {name}: ratio must be positive"
                )));
            }
            _ => {}
        }
        Ok(Self {
            id,
            name,
            category,
            kind,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> UomCategoryId {
        self.category
    }

    pub fn kind(&self) -> UomKind {
        self.kind
    }

    /// Convert a price expressed per `self` into a price per `to`.
    ///
    /// A price per dozen is twelve times the price per unit. Both units must
    /// belong to the same category.
    pub fn convert_price(&self, amount: Decimal, to: &UnitOfMeasure) -> DomainResult<Decimal> {
        if self.id == to.id || amount.is_zero() {
            return Ok(amount);
        }
        if self.category != to.category {
            return Err(DomainError::validation(format!(
                "cannot convert price from {} to {}: units belong to different categories",
                self.name, to.name
            )));
        }
        let (from_num, from_den) = self.kind.reference_size();
        let (to_num, to_den) = to.kind.reference_size();
        amount
            .checked_mul(to_num)
            .and_then(|v| v.checked_mul(from_den))
            .zip(to_den.checked_mul(from_num))
            .and_then(|(v, divisor)| v.checked_div(divisor))
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "price {amount} per {} overflows when converted to {}",
                    self.name, to.name
                ))
            })
    }
}

impl Entity for UnitOfMeasure {
    type Id = UomId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(category: UomCategoryId, name: &str, kind: UomKind) -> UnitOfMeasure {
        UnitOfMeasure::new(UomId::generate(), name, category, kind).unwrap()
    }

    #[test]
    fn price_per_dozen_is_twelve_unit_prices() {
        let count = UomCategoryId::generate();
        let units = unit(count, "Units", UomKind::Reference);
        let dozens = unit(count, "Dozens", UomKind::Bigger(Decimal::new(12, 0)));

        assert_eq!(
            units.convert_price(Decimal::new(150, 2), &dozens).unwrap(),
            Decimal::new(18, 0)
        );
        assert_eq!(
            dozens.convert_price(Decimal::new(18, 0), &units).unwrap(),
            Decimal::new(15, 1)
        );
    }

    #[test]
    fn price_per_gram_from_price_per_kilogram() {
        let weight = UomCategoryId::generate();
        let kg = unit(weight, "kg", UomKind::Reference);
        let g = unit(weight, "g", UomKind::Smaller(Decimal::new(1000, 0)));

        assert_eq!(
            kg.convert_price(Decimal::new(25, 0), &g).unwrap(),
            Decimal::new(25, 3)
        );
    }

    #[test]
    fn same_unit_is_identity() {
        let u = unit(UomCategoryId::generate(), "Units", UomKind::Reference);
        assert_eq!(
            u.convert_price(Decimal::new(7, 1), &u).unwrap(),
            Decimal::new(7, 1)
        );
    }

    #[test]
    fn cross_category_conversion_is_rejected() {
        let units = unit(UomCategoryId::generate(), "Units", UomKind::Reference);
        let kg = unit(UomCategoryId::generate(), "kg", UomKind::Reference);

        let err = units.convert_price(Decimal::ONE, &kg).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn overflowing_conversion_is_an_error() {
        let count = UomCategoryId::generate();
        let units = unit(count, "Units", UomKind::Reference);
        let dozens = unit(count, "Dozens", UomKind::Bigger(Decimal::new(12, 0)));

        let err = units.convert_price(Decimal::MAX, &dozens).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn non_positive_ratio_is_rejected() {
        let err = UnitOfMeasure::new(
            UomId::generate(),
            "Broken",
            UomCategoryId::generate(),
            UomKind::Bigger(Decimal::ZERO),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
