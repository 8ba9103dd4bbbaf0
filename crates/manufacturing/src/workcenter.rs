use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use erpext_core::{DomainError, DomainResult, Entity, RecordId, ValueObject, define_id};

define_id!(WorkcenterId, RecordId, "Workcenter identifier.");

const MINUTES_PER_HOUR: i64 = 60;

/// A place where operations run, with fixed setup/teardown times and an hourly rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workcenter {
    id: WorkcenterId,
    name: String,
    /// Minutes before production starts.
    setup_minutes: Decimal,
    /// Minutes after production stops.
    teardown_minutes: Decimal,
    hourly_cost: Decimal,
}

impl Workcenter {
    pub fn new(
        id: WorkcenterId,
        name: impl Into<String>,
        setup_minutes: Decimal,
        teardown_minutes: Decimal,
        hourly_cost: Decimal,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("workcenter name cannot be empty"));
        }
        if setup_minutes < Decimal::ZERO || teardown_minutes < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "workcenter {name}: times cannot be negative"
            )));
        }
        if hourly_cost < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "workcenter {name}: hourly cost cannot be negative"
            )));
        }
        Ok(Self {
            id,
            name,
            setup_minutes,
            teardown_minutes,
            hourly_cost,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn setup_minutes(&self) -> Decimal {
        self.setup_minutes
    }

    pub fn teardown_minutes(&self) -> Decimal {
        self.teardown_minutes
    }

    pub fn hourly_cost(&self) -> Decimal {
        self.hourly_cost
    }

    /// Cost of running `operation` here once:
    /// `(setup + teardown + cycle) / 60 * hourly_cost`.
    ///
    /// `None` when the result does not fit in a `Decimal`.
    pub fn operation_cost(&self, operation: &Operation) -> Option<Decimal> {
        self.setup_minutes
            .checked_add(self.teardown_minutes)?
            .checked_add(operation.cycle_minutes)?
            .checked_mul(self.hourly_cost)?
            .checked_div(Decimal::from(MINUTES_PER_HOUR))
    }
}

impl Entity for Workcenter {
    type Id = WorkcenterId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Routing step of a BOM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    pub workcenter_id: WorkcenterId,
    /// Minutes per produced unit.
    pub cycle_minutes: Decimal,
}

impl ValueObject for Operation {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn workcenter(setup: i64, teardown: i64, rate: i64) -> Workcenter {
        Workcenter::new(
            WorkcenterId::generate(),
            "Assembly",
            Decimal::from(setup),
            Decimal::from(teardown),
            Decimal::from(rate),
        )
        .unwrap()
    }

    fn operation(wc: &Workcenter, cycle: Decimal) -> Operation {
        Operation {
            name: "Assemble".to_string(),
            workcenter_id: wc.id,
            cycle_minutes: cycle,
        }
    }

    #[test]
    fn eighteen_minutes_at_sixty_per_hour_costs_eighteen() {
        let wc = workcenter(10, 5, 60);
        let op = operation(&wc, Decimal::from(3));
        assert_eq!(wc.operation_cost(&op), Some(Decimal::from(18)));
    }

    #[test]
    fn fractional_hours_are_exact() {
        let wc = workcenter(10, 0, 45);
        let op = operation(&wc, Decimal::ZERO);
        assert_eq!(wc.operation_cost(&op), Some(Decimal::new(75, 1)));
    }

    #[test]
    fn oversized_rate_yields_none() {
        let wc = Workcenter::new(
            WorkcenterId::generate(),
            "Furnace",
            Decimal::from(10),
            Decimal::ZERO,
            Decimal::MAX,
        )
        .unwrap();
        let op = operation(&wc, Decimal::ZERO);
        assert_eq!(wc.operation_cost(&op), None);
    }

    #[test]
    fn negative_times_are_rejected() {
        let err = Workcenter::new(
            WorkcenterId::generate(),
            "Paint",
            Decimal::from(-1),
            Decimal::ZERO,
            Decimal::ONE,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    proptest! {
        /// Property: operation cost is non-negative and scales with the hourly rate.
        #[test]
        fn cost_scales_with_rate(
            setup in 0i64..600,
            teardown in 0i64..600,
            cycle in 0i64..600,
            rate in 0i64..10_000,
        ) {
            let single = workcenter(setup, teardown, rate);
            let double = workcenter(setup, teardown, rate * 2);
            let op = operation(&single, Decimal::from(cycle));

            let cost = single.operation_cost(&op).unwrap();
            let doubled = double.operation_cost(&op).unwrap();
            prop_assert!(cost >= Decimal::ZERO);
            prop_assert!(doubled >= cost);
            prop_assert!((doubled - cost * Decimal::from(2)).abs() < Decimal::new(1, 20));
        }
    }
}
