//! JSON fixtures describing a product catalog with its BOMs.
//!
//! Records reference each other by name/code rather than by id; ids are
//! generated while loading. Every record goes through its domain constructor
//! (or aggregate command), so a fixture that loads is a valid catalog.
//!
//! ```json
//! {
//!   "uoms": [{ "name": "Units", "category": "count", "kind": { "type": "reference" } }],
//!   "accounts": [{ "code": "5000", "name": "COGS", "kind": "expense" }],
//!   "categories": [{ "name": "Finished", "expense_account": "5000" }],
//!   "workcenters": [{ "name": "Assembly", "setup_minutes": "10",
//!                     "teardown_minutes": "5", "hourly_cost": "60" }],
//!   "products": [{ "code": "FG", "name": "Finished good", "uom": "Units",
//!                  "category": "Finished", "standard_cost": "0" }],
//!   "boms": [{ "ref": "BOM-FG", "product": "FG", "batch_quantity": "2", "uom": "Units",
//!              "operations": [{ "name": "Assemble", "workcenter": "Assembly", "cycle_minutes": "3" }],
//!              "lines": [] }]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use erpext_accounting::{Account, AccountId, AccountKind};
use erpext_core::DomainError;
use erpext_manufacturing::{
    BillOfMaterials, BomId, BomLine, BomOwner, InMemoryManufacturingStore, ManufacturingStore,
    Operation, Workcenter, WorkcenterId,
};
use erpext_products::{
    CategoryId, CostMethod, CreateProduct, ProductCategory, ProductId, ProductTemplateId,
    UnitOfMeasure, UomCategoryId, UomId, UomKind, Valuation,
};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid fixture json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown {kind} `{name}`")]
    UnknownReference { kind: &'static str, name: String },

    #[error("duplicate {kind} `{name}`")]
    Duplicate { kind: &'static str, name: String },

    #[error("bom `{bom}` must name exactly one of `product` or `template`")]
    AmbiguousBomOwner { bom: String },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[derive(Debug, Deserialize)]
struct FixtureDoc {
    #[serde(default)]
    uoms: Vec<UomDoc>,
    #[serde(default)]
    accounts: Vec<AccountDoc>,
    #[serde(default)]
    categories: Vec<CategoryDoc>,
    #[serde(default)]
    workcenters: Vec<WorkcenterDoc>,
    #[serde(default)]
    products: Vec<ProductDoc>,
    #[serde(default)]
    boms: Vec<BomDoc>,
}

#[derive(Debug, Deserialize)]
struct UomDoc {
    name: String,
    category: String,
    kind: UomKind,
}

#[derive(Debug, Deserialize)]
struct AccountDoc {
    code: String,
    name: String,
    kind: AccountKind,
}

#[derive(Debug, Deserialize)]
struct CategoryDoc {
    name: String,
    expense_account: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkcenterDoc {
    name: String,
    #[serde(default)]
    setup_minutes: Decimal,
    #[serde(default)]
    teardown_minutes: Decimal,
    hourly_cost: Decimal,
}

#[derive(Debug, Deserialize)]
struct ProductDoc {
    code: String,
    name: String,
    uom: String,
    /// Products sharing a template name are variants of one template.
    template: Option<String>,
    category: Option<String>,
    #[serde(default = "default_cost_method")]
    cost_method: CostMethod,
    #[serde(default = "default_valuation")]
    valuation: Valuation,
    #[serde(default)]
    standard_cost: Decimal,
    expense_account: Option<String>,
    cost_updated_at: Option<DateTime<Utc>>,
}

fn default_cost_method() -> CostMethod {
    CostMethod::Standard
}

fn default_valuation() -> Valuation {
    Valuation::Manual
}

#[derive(Debug, Deserialize)]
struct BomDoc {
    #[serde(rename = "ref")]
    reference: String,
    product: Option<String>,
    template: Option<String>,
    #[serde(default)]
    sequence: u32,
    batch_quantity: Decimal,
    uom: String,
    cost_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    operations: Vec<OperationDoc>,
    #[serde(default)]
    lines: Vec<LineDoc>,
}

#[derive(Debug, Deserialize)]
struct OperationDoc {
    name: String,
    workcenter: String,
    cycle_minutes: Decimal,
}

#[derive(Debug, Deserialize)]
struct LineDoc {
    product: String,
    quantity: Decimal,
    uom: String,
    /// Ref of the BOM manufacturing this component.
    bom: Option<String>,
    #[serde(default)]
    excluded_from_cost: bool,
    /// Codes of the variants this line applies to.
    #[serde(default)]
    variants: Vec<String>,
}

/// Name -> id table for one kind of record.
struct Names<T> {
    kind: &'static str,
    ids: BTreeMap<String, T>,
}

impl<T: Copy> Names<T> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            ids: BTreeMap::new(),
        }
    }

    fn register(&mut self, name: &str, id: T) -> Result<(), FixtureError> {
        if self.ids.insert(name.to_string(), id).is_some() {
            return Err(FixtureError::Duplicate {
                kind: self.kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn get(&self, name: &str) -> Result<T, FixtureError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| FixtureError::UnknownReference {
                kind: self.kind,
                name: name.to_string(),
            })
    }

    fn get_opt(&self, name: Option<&str>) -> Result<Option<T>, FixtureError> {
        name.map(|n| self.get(n)).transpose()
    }
}

/// A catalog loaded into an in-memory store, plus the lookups a front end
/// needs to talk about it in codes instead of ids.
#[derive(Debug)]
pub struct LoadedFixture {
    store: InMemoryManufacturingStore,
    products: BTreeMap<String, ProductId>,
    accounts: BTreeMap<AccountId, Account>,
}

impl LoadedFixture {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let fixture = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            products = fixture.products.len(),
            "fixture loaded"
        );
        Ok(fixture)
    }

    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        let doc: FixtureDoc = serde_json::from_str(json)?;
        build(doc, Utc::now())
    }

    pub fn store(&self) -> &InMemoryManufacturingStore {
        &self.store
    }

    pub fn product_id(&self, code: &str) -> Result<ProductId, FixtureError> {
        self.products
            .get(code)
            .copied()
            .ok_or_else(|| FixtureError::UnknownReference {
                kind: "product",
                name: code.to_string(),
            })
    }

    /// Every product costed at standard, by code.
    pub fn standard_products(&self) -> Vec<ProductId> {
        self.products
            .values()
            .filter(|id| {
                self.store
                    .product(**id)
                    .is_some_and(|p| p.cost_method() == CostMethod::Standard)
            })
            .copied()
            .collect()
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }
}

fn build(doc: FixtureDoc, now: DateTime<Utc>) -> Result<LoadedFixture, FixtureError> {
    let store = InMemoryManufacturingStore::new();

    let mut uom_categories: BTreeMap<String, UomCategoryId> = BTreeMap::new();
    let mut uoms = Names::<UomId>::new("unit of measure");
    for uom in doc.uoms {
        let category = *uom_categories
            .entry(uom.category)
            .or_insert_with(UomCategoryId::generate);
        let id = UomId::generate();
        uoms.register(&uom.name, id)?;
        store.insert_uom(UnitOfMeasure::new(id, uom.name, category, uom.kind)?)?;
    }

    let mut account_names = Names::<AccountId>::new("account");
    let mut accounts = BTreeMap::new();
    for account in doc.accounts {
        let id = AccountId::generate();
        account_names.register(&account.code, id)?;
        accounts.insert(
            id,
            Account {
                id,
                code: account.code,
                name: account.name,
                kind: account.kind,
            },
        );
    }

    let mut categories = Names::<CategoryId>::new("category");
    for category in doc.categories {
        let id = CategoryId::generate();
        categories.register(&category.name, id)?;
        store.insert_category(ProductCategory {
            id,
            expense_account: account_names.get_opt(category.expense_account.as_deref())?,
            name: category.name,
        })?;
    }

    let mut workcenters = Names::<WorkcenterId>::new("workcenter");
    for wc in doc.workcenters {
        let id = WorkcenterId::generate();
        workcenters.register(&wc.name, id)?;
        store.insert_workcenter(Workcenter::new(
            id,
            wc.name,
            wc.setup_minutes,
            wc.teardown_minutes,
            wc.hourly_cost,
        )?)?;
    }

    let mut templates: BTreeMap<String, ProductTemplateId> = BTreeMap::new();
    let mut products = Names::<ProductId>::new("product");
    for product in doc.products {
        let product_id = ProductId::generate();
        products.register(&product.code, product_id)?;
        let template_id = product
            .template
            .map(|name| *templates.entry(name).or_insert_with(ProductTemplateId::generate));
        store.create_product(CreateProduct {
            product_id,
            template_id,
            uom_id: uoms.get(&product.uom)?,
            category_id: categories.get_opt(product.category.as_deref())?,
            cost_method: product.cost_method,
            valuation: product.valuation,
            standard_cost: product.standard_cost,
            expense_account: account_names.get_opt(product.expense_account.as_deref())?,
            cost_updated_at: product.cost_updated_at,
            default_code: product.code,
            name: product.name,
            occurred_at: now,
        })?;
    }

    // Lines may point at BOMs declared later in the file.
    let mut boms = Names::<BomId>::new("bill of materials");
    for bom in &doc.boms {
        boms.register(&bom.reference, BomId::generate())?;
    }

    for bom in doc.boms {
        let owner = match (bom.product.as_deref(), bom.template.as_deref()) {
            (Some(code), None) => BomOwner::Product(products.get(code)?),
            (None, Some(name)) => BomOwner::Template(templates.get(name).copied().ok_or_else(
                || FixtureError::UnknownReference {
                    kind: "template",
                    name: name.to_string(),
                },
            )?),
            _ => {
                return Err(FixtureError::AmbiguousBomOwner {
                    bom: bom.reference,
                });
            }
        };

        let operations = bom
            .operations
            .into_iter()
            .map(|op| -> Result<Operation, FixtureError> {
                Ok(Operation {
                    workcenter_id: workcenters.get(&op.workcenter)?,
                    name: op.name,
                    cycle_minutes: op.cycle_minutes,
                })
            })
            .collect::<Result<Vec<_>, FixtureError>>()?;

        let lines = bom
            .lines
            .into_iter()
            .map(|line| -> Result<BomLine, FixtureError> {
                Ok(BomLine {
                    product_id: products.get(&line.product)?,
                    quantity: line.quantity,
                    uom_id: uoms.get(&line.uom)?,
                    child_bom: boms.get_opt(line.bom.as_deref())?,
                    excluded_from_cost: line.excluded_from_cost,
                    only_for_variants: line
                        .variants
                        .iter()
                        .map(|code| products.get(code))
                        .collect::<Result<_, _>>()?,
                })
            })
            .collect::<Result<Vec<_>, FixtureError>>()?;

        let id = boms.get(&bom.reference)?;
        let uom_id = uoms.get(&bom.uom)?;
        let built = BillOfMaterials::new(id, owner, bom.batch_quantity, uom_id, operations, lines)?
            .with_sequence(bom.sequence)
            .with_cost_updated_at(bom.cost_updated_at);
        store.insert_bom(built)?;
    }

    Ok(LoadedFixture {
        store,
        products: products.ids,
        accounts,
    })
}
