//! Human/machine readable summary of a BOM cost update run.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use erpext_manufacturing::ManufacturingStore;
use erpext_products::StandardCostChanged;

use crate::fixture::LoadedFixture;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostUpdateRow {
    pub product: String,
    pub previous_cost: Decimal,
    pub new_cost: Decimal,
    /// Code of the account the revaluation is booked against.
    pub expense_account: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CostUpdateReport {
    pub updates: Vec<CostUpdateRow>,
}

impl CostUpdateReport {
    /// Resolve the ids in `changes` to codes. Keeps the write order.
    pub fn new(fixture: &LoadedFixture, changes: &[StandardCostChanged]) -> Self {
        let updates = changes
            .iter()
            .map(|change| CostUpdateRow {
                product: fixture
                    .store()
                    .product(change.product_id)
                    .map_or_else(|| change.product_id.to_string(), |p| p.default_code().to_string()),
                previous_cost: change.previous_cost,
                new_cost: change.new_cost,
                expense_account: change
                    .expense_account
                    .and_then(|id| fixture.account(id))
                    .map(|account| account.code.clone()),
            })
            .collect();
        Self { updates }
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for CostUpdateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.updates.is_empty() {
            return writeln!(f, "no standard cost changed");
        }
        writeln!(f, "{:<20} {:>14} {:>14}  account", "product", "previous", "new")?;
        for row in &self.updates {
            writeln!(
                f,
                "{:<20} {:>14} {:>14}  {}",
                row.product,
                row.previous_cost,
                row.new_cost,
                row.expense_account.as_deref().unwrap_or("-")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use erpext_manufacturing::{RollupSettings, update_bom_cost};

    const CATALOG: &str = r#"{
        "uoms": [{ "name": "Units", "category": "count", "kind": { "type": "reference" } }],
        "accounts": [{ "code": "5000", "name": "Cost of goods sold", "kind": "expense" }],
        "workcenters": [{ "name": "Assembly", "setup_minutes": "10", "teardown_minutes": "5", "hourly_cost": "60" }],
        "products": [{ "code": "FG", "name": "Finished", "uom": "Units", "expense_account": "5000" }],
        "boms": [{ "ref": "B", "product": "FG", "batch_quantity": "2", "uom": "Units",
                   "operations": [{ "name": "Assemble", "workcenter": "Assembly", "cycle_minutes": "3" }] }]
    }"#;

    #[test]
    fn rows_use_codes() {
        let fixture = LoadedFixture::from_json(CATALOG).unwrap();
        let fg = fixture.product_id("FG").unwrap();
        let changes =
            update_bom_cost(fixture.store(), &[fg], RollupSettings::default(), Utc::now()).unwrap();

        let report = CostUpdateReport::new(&fixture, &changes);
        assert_eq!(
            report.updates,
            vec![CostUpdateRow {
                product: "FG".to_string(),
                previous_cost: Decimal::ZERO,
                new_cost: Decimal::from(9),
                expense_account: Some("5000".to_string()),
            }]
        );
        assert!(report.to_string().contains("5000"));
        assert!(report.to_json().unwrap().contains("\"product\": \"FG\""));
    }

    #[test]
    fn empty_report_says_so() {
        assert_eq!(CostUpdateReport::default().to_string(), "no standard cost changed\n");
    }
}
