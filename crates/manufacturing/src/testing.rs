//! Store fixtures shared by the rollup and action tests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use erpext_products::{
    CostMethod, CreateProduct, Product, ProductId, ProductTemplateId, UnitOfMeasure, UomCategoryId,
    UomId, UomKind, Valuation,
};

use crate::bom::{BillOfMaterials, BomId, BomLine, BomOwner};
use crate::in_memory::InMemoryManufacturingStore;
use crate::store::ManufacturingStore;
use crate::workcenter::{Operation, Workcenter, WorkcenterId};

pub(crate) fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}

pub(crate) struct Fixture {
    pub store: InMemoryManufacturingStore,
    pub units: UomId,
    pub dozens: UomId,
    /// setup 10 min, teardown 5 min, 60 per hour.
    pub workcenter: WorkcenterId,
}

impl Fixture {
    pub fn new() -> Self {
        let store = InMemoryManufacturingStore::new();
        let count = UomCategoryId::generate();
        let units = UomId::generate();
        let dozens = UomId::generate();
        store
            .insert_uom(UnitOfMeasure::new(units, "Units", count, UomKind::Reference).unwrap())
            .unwrap();
        store
            .insert_uom(
                UnitOfMeasure::new(dozens, "Dozens", count, UomKind::Bigger(Decimal::from(12)))
                    .unwrap(),
            )
            .unwrap();

        let workcenter = WorkcenterId::generate();
        store
            .insert_workcenter(
                Workcenter::new(
                    workcenter,
                    "Assembly",
                    Decimal::from(10),
                    Decimal::from(5),
                    Decimal::from(60),
                )
                .unwrap(),
            )
            .unwrap();

        Self {
            store,
            units,
            dozens,
            workcenter,
        }
    }

    pub fn create_product(&self, cmd: CreateProduct) -> ProductId {
        self.store.create_product(cmd).unwrap()
    }

    pub fn product_cmd(&self, code: &str, cost: Decimal, costed_at: Option<DateTime<Utc>>) -> CreateProduct {
        CreateProduct {
            product_id: ProductId::generate(),
            template_id: Some(ProductTemplateId::generate()),
            default_code: code.to_string(),
            name: code.to_string(),
            uom_id: self.units,
            category_id: None,
            cost_method: CostMethod::Standard,
            valuation: Valuation::Manual,
            standard_cost: cost,
            expense_account: None,
            cost_updated_at: costed_at,
            occurred_at: Utc::now(),
        }
    }

    pub fn product(&self, code: &str, cost: Decimal, costed_at: Option<DateTime<Utc>>) -> ProductId {
        self.create_product(self.product_cmd(code, cost, costed_at))
    }

    pub fn get(&self, id: ProductId) -> Product {
        self.store.product(id).unwrap()
    }

    pub fn get_bom(&self, id: BomId) -> BillOfMaterials {
        self.store.bom(id).unwrap()
    }

    pub fn op(&self, cycle_minutes: i64) -> Operation {
        Operation {
            name: "Assemble".to_string(),
            workcenter_id: self.workcenter,
            cycle_minutes: Decimal::from(cycle_minutes),
        }
    }

    pub fn line(&self, product: ProductId, quantity: Decimal, child_bom: Option<BomId>) -> BomLine {
        BomLine {
            product_id: product,
            quantity,
            uom_id: self.units,
            child_bom,
            excluded_from_cost: false,
            only_for_variants: Vec::new(),
        }
    }

    pub fn bom(
        &self,
        owner: ProductId,
        batch: Decimal,
        operations: Vec<Operation>,
        lines: Vec<BomLine>,
        costed_at: Option<DateTime<Utc>>,
    ) -> BomId {
        self.bom_owned_by(BomOwner::Product(owner), batch, operations, lines, costed_at)
    }

    pub fn bom_owned_by(
        &self,
        owner: BomOwner,
        batch: Decimal,
        operations: Vec<Operation>,
        lines: Vec<BomLine>,
        costed_at: Option<DateTime<Utc>>,
    ) -> BomId {
        let id = BomId::generate();
        let bom = BillOfMaterials::new(id, owner, batch, self.units, operations, lines)
            .unwrap()
            .with_cost_updated_at(costed_at);
        self.store.insert_bom(bom).unwrap();
        id
    }
}
