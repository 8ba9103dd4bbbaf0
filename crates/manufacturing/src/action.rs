//! "Update cost from BOM" action over a selection of products.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use erpext_core::DomainError;
use erpext_products::{ChangeStandardCost, CostMethod, Product, ProductId, StandardCostChanged};

use crate::bom::{BomId, BomOwner};
use crate::error::{RollupError, RollupResult};
use crate::rollup::{RollupContext, RollupSettings, compute_rollup_cost};
use crate::store::ManufacturingStore;

/// Recompute the standard cost of `product_ids` from their BOMs.
///
/// Returns every standard cost change applied, sub-components first, in the
/// order they were written.
pub fn update_bom_cost<S>(
    store: &S,
    product_ids: &[ProductId],
    settings: RollupSettings,
    now: DateTime<Utc>,
) -> RollupResult<Vec<StandardCostChanged>>
where
    S: ManufacturingStore + ?Sized,
{
    let products = product_ids
        .iter()
        .map(|id| store.product(*id).ok_or(RollupError::ProductNotFound(*id)))
        .collect::<RollupResult<Vec<_>>>()?;

    reject_realtime_fifo(&products)?;

    let ctx = RollupContext::new(now, settings).with_recompute(selected_boms(store, &products));
    let mut changes = Vec::new();

    for product in products.iter().filter(|p| p.cost_method() == CostMethod::Standard) {
        let bom = store
            .find_bom(product)
            .ok_or_else(|| RollupError::NoBomForProduct(product.default_code().to_string()))?;

        let outcome = compute_rollup_cost(store, product, &bom, &ctx)?;
        changes.extend(outcome.cost_changes);

        // The walk may already have re-costed this product as a component
        // of another selected product.
        let current = store
            .product(product.id_typed())
            .ok_or(RollupError::ProductNotFound(product.id_typed()))?;
        if !settings.precision.differs(outcome.unit_cost, current.standard_cost()) {
            tracing::debug!(product = %current.default_code(), "standard cost unchanged");
            continue;
        }

        let changed = store.change_standard_cost(ChangeStandardCost {
            product_id: current.id_typed(),
            new_cost: outcome.unit_cost,
            expense_account: store.expense_account(&current),
            occurred_at: now,
        })?;
        tracing::info!(
            product = %current.default_code(),
            standard_cost = %changed.new_cost,
            previous_cost = %changed.previous_cost,
            "standard cost updated from bom"
        );
        changes.push(changed);
    }

    Ok(changes)
}

fn reject_realtime_fifo(products: &[Product]) -> Result<(), DomainError> {
    let offending: Vec<&str> = products
        .iter()
        .filter(|p| p.is_realtime_fifo())
        .map(Product::default_code)
        .collect();
    if offending.is_empty() {
        return Ok(());
    }
    Err(DomainError::validation(format!(
        "the costing method of {} is FIFO with real-time valuation; use standard costing to update the BOM cost manually",
        offending.join(", ")
    )))
}

/// BOMs owned by one of `products`, directly or through their template.
fn selected_boms<S>(store: &S, products: &[Product]) -> HashSet<BomId>
where
    S: ManufacturingStore + ?Sized,
{
    store
        .boms()
        .into_iter()
        .filter(|bom| match bom.owner() {
            BomOwner::Product(id) => products.iter().any(|p| p.id_typed() == id),
            BomOwner::Template(template) => {
                products.iter().any(|p| p.template_id() == Some(template))
            }
        })
        .map(|bom| bom.id_typed())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    use erpext_accounting::AccountId;
    use erpext_products::{CategoryId, ProductCategory, Valuation};

    use crate::testing::{Fixture, dec};

    fn run(fx: &Fixture, ids: &[ProductId]) -> RollupResult<Vec<StandardCostChanged>> {
        update_bom_cost(&fx.store, ids, RollupSettings::default(), Utc::now())
    }

    #[test]
    fn updates_standard_cost_of_selected_product() {
        let fx = Fixture::new();
        let finished = fx.product("FG", Decimal::ZERO, None);
        fx.bom(finished, Decimal::from(2), vec![fx.op(3)], vec![], None);
        let now = Utc::now();

        let changes = update_bom_cost(&fx.store, &[finished], RollupSettings::default(), now).unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].product_id, finished);
        assert_eq!(changes[0].new_cost, Decimal::from(9));
        let product = fx.get(finished);
        assert_eq!(product.standard_cost(), Decimal::from(9));
        assert_eq!(product.cost_updated_at(), Some(now));
    }

    #[test]
    fn unchanged_cost_is_not_rewritten() {
        let fx = Fixture::new();
        let then = Utc::now() - Duration::days(1);
        let finished = fx.product("FG", dec("9.004"), Some(then));
        fx.bom(finished, Decimal::from(2), vec![fx.op(3)], vec![], None);

        assert!(run(&fx, &[finished]).unwrap().is_empty());
        assert_eq!(fx.get(finished).standard_cost(), dec("9.004"));
        assert_eq!(fx.get(finished).cost_updated_at(), Some(then));
    }

    #[test]
    fn realtime_fifo_products_are_rejected_by_code() {
        let fx = Fixture::new();
        let mut cmd = fx.product_cmd("FIFO-1", Decimal::ZERO, None);
        cmd.cost_method = CostMethod::Fifo;
        cmd.valuation = Valuation::RealTime;
        let fifo = fx.create_product(cmd);
        fx.bom(fifo, Decimal::ONE, vec![fx.op(3)], vec![], None);
        let standard = fx.product("STD", Decimal::ZERO, None);
        fx.bom(standard, Decimal::ONE, vec![fx.op(3)], vec![], None);

        let err = run(&fx, &[standard, fifo]).unwrap_err();
        match err {
            RollupError::Domain(DomainError::Validation(msg)) => assert!(msg.contains("FIFO-1")),
            other => panic!("unexpected error: {other:?}"),
        }
        // Nothing was written before the rejection.
        assert_eq!(fx.get(standard).standard_cost(), Decimal::ZERO);
    }

    #[test]
    fn manual_fifo_is_not_rejected_and_is_skipped() {
        let fx = Fixture::new();
        let mut cmd = fx.product_cmd("FIFO-M", dec("4"), None);
        cmd.cost_method = CostMethod::Fifo;
        let fifo = fx.create_product(cmd);
        fx.bom(fifo, Decimal::ONE, vec![fx.op(3)], vec![], None);

        assert!(run(&fx, &[fifo]).unwrap().is_empty());
        assert_eq!(fx.get(fifo).standard_cost(), dec("4"));
    }

    #[test]
    fn standard_product_without_bom_is_an_error() {
        let fx = Fixture::new();
        let orphan = fx.product("ORPHAN", Decimal::ZERO, None);

        assert_eq!(
            run(&fx, &[orphan]).unwrap_err(),
            RollupError::NoBomForProduct("ORPHAN".to_string())
        );
    }

    #[test]
    fn unknown_product_is_an_error() {
        let fx = Fixture::new();
        let missing = ProductId::generate();
        assert_eq!(run(&fx, &[missing]).unwrap_err(), RollupError::ProductNotFound(missing));
    }

    #[test]
    fn variant_bom_wins_over_template_bom() {
        let fx = Fixture::new();
        let cmd = fx.product_cmd("FG", Decimal::ZERO, None);
        let template = cmd.template_id.unwrap();
        let finished = fx.create_product(cmd);
        fx.bom_owned_by(BomOwner::Template(template), Decimal::ONE, vec![fx.op(45)], vec![], None);
        fx.bom(finished, Decimal::ONE, vec![fx.op(3)], vec![], None);

        let changes = run(&fx, &[finished]).unwrap();
        assert_eq!(changes[0].new_cost, Decimal::from(18));
    }

    #[test]
    fn template_bom_is_used_when_no_variant_bom_exists() {
        let fx = Fixture::new();
        let cmd = fx.product_cmd("FG", Decimal::ZERO, None);
        let template = cmd.template_id.unwrap();
        let finished = fx.create_product(cmd);
        fx.bom_owned_by(BomOwner::Template(template), Decimal::ONE, vec![fx.op(45)], vec![], None);

        let changes = run(&fx, &[finished]).unwrap();
        assert_eq!(changes[0].new_cost, Decimal::from(60));
    }

    #[test]
    fn selected_boms_are_recomputed_when_recompute_all_is_off() {
        let fx = Fixture::new();
        let sub = fx.product("SUB", dec("5"), None);
        fx.bom(sub, Decimal::ONE, vec![fx.op(3)], vec![], None);
        let other = fx.product("OTHER", dec("7"), None);
        let other_bom = fx.bom(other, Decimal::ONE, vec![fx.op(3)], vec![], None);
        let finished = fx.product("FG", Decimal::ZERO, None);
        let sub_bom = fx.store.find_bom(&fx.get(sub)).unwrap().id_typed();
        fx.bom(
            finished,
            Decimal::ONE,
            vec![],
            vec![
                fx.line(sub, Decimal::ONE, Some(sub_bom)),
                fx.line(other, Decimal::ONE, Some(other_bom)),
            ],
            None,
        );
        let settings = RollupSettings {
            recompute_all: false,
            ..RollupSettings::default()
        };

        let changes = update_bom_cost(&fx.store, &[finished, sub], settings, Utc::now()).unwrap();

        // SUB is selected, so its BOM is walked; OTHER is priced at its stored cost.
        assert_eq!(fx.get(sub).standard_cost(), Decimal::from(18));
        assert_eq!(fx.get(other).standard_cost(), dec("7"));
        assert_eq!(fx.get(finished).standard_cost(), Decimal::from(25));
        let changed: Vec<_> = changes.iter().map(|c| c.product_id).collect();
        assert_eq!(changed, vec![sub, finished]);
    }

    #[test]
    fn expense_account_falls_back_to_category() {
        let fx = Fixture::new();
        let account = AccountId::generate();
        let category = CategoryId::generate();
        fx.store
            .insert_category(ProductCategory {
                id: category,
                name: "Finished goods".to_string(),
                expense_account: Some(account),
            })
            .unwrap();
        let mut cmd = fx.product_cmd("FG", Decimal::ZERO, None);
        cmd.category_id = Some(category);
        let finished = fx.create_product(cmd);
        fx.bom(finished, Decimal::ONE, vec![fx.op(3)], vec![], None);

        let changes = run(&fx, &[finished]).unwrap();
        assert_eq!(changes[0].expense_account, Some(account));
        assert_eq!(fx.get(finished).expense_account(), None);
    }

    #[test]
    fn every_change_is_journaled() {
        let fx = Fixture::new();
        let sub = fx.product("SUB", Decimal::ZERO, None);
        let sub_bom = fx.bom(sub, Decimal::ONE, vec![fx.op(3)], vec![], None);
        let finished = fx.product("FG", Decimal::ZERO, None);
        fx.bom(finished, Decimal::ONE, vec![], vec![fx.line(sub, dec("2"), Some(sub_bom))], None);
        let before = fx.store.journal().len();

        let changes = run(&fx, &[finished]).unwrap();

        assert_eq!(changes.len(), 2);
        let journal = fx.store.journal();
        assert_eq!(journal.len(), before + 2);
        assert_eq!(journal.last().unwrap().event_type(), "products.product.standard_cost_changed");
    }
}
