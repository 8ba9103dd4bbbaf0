//! In-memory manufacturing store for tests/dev.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use erpext_core::{Aggregate, AggregateRoot, DomainError, DomainResult, Entity};
use erpext_events::EventEnvelope;
use erpext_products::{
    CategoryId, ChangeStandardCost, CreateProduct, Product, ProductCategory, ProductCommand,
    ProductEvent, ProductId, StandardCostChanged, UnitOfMeasure, UomId,
};

use crate::bom::{BillOfMaterials, BomId};
use crate::store::ManufacturingStore;
use crate::workcenter::{Workcenter, WorkcenterId};

const PRODUCT_AGGREGATE: &str = "products.product";

/// In-memory store.
///
/// - No IO
/// - Products are event-sourced: every applied event is appended to an
///   in-memory journal, readable through [`InMemoryManufacturingStore::journal`].
/// - Reference data (units, categories, workcenters, BOMs) is stored as-is.
#[derive(Debug, Default)]
pub struct InMemoryManufacturingStore {
    products: RwLock<BTreeMap<ProductId, Product>>,
    categories: RwLock<BTreeMap<CategoryId, ProductCategory>>,
    uoms: RwLock<BTreeMap<UomId, UnitOfMeasure>>,
    workcenters: RwLock<BTreeMap<WorkcenterId, Workcenter>>,
    boms: RwLock<BTreeMap<BomId, BillOfMaterials>>,
    journal: RwLock<Vec<EventEnvelope<ProductEvent>>>,
}

fn poisoned() -> DomainError {
    DomainError::invariant("in-memory store lock poisoned")
}

impl InMemoryManufacturingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a product through its aggregate.
    pub fn create_product(&self, command: CreateProduct) -> DomainResult<ProductId> {
        let product_id = command.product_id;
        let mut products = self.products.write().map_err(|_| poisoned())?;
        let mut product = products
            .get(&product_id)
            .cloned()
            .unwrap_or_else(|| Product::empty(product_id));

        let events = product.execute(&ProductCommand::CreateProduct(command))?;
        self.append(&product, events)?;
        products.insert(product_id, product);
        Ok(product_id)
    }

    pub fn insert_category(&self, category: ProductCategory) -> DomainResult<()> {
        insert_unique(&self.categories, category, "category")
    }

    pub fn insert_uom(&self, uom: UnitOfMeasure) -> DomainResult<()> {
        insert_unique(&self.uoms, uom, "unit of measure")
    }

    pub fn insert_workcenter(&self, workcenter: Workcenter) -> DomainResult<()> {
        insert_unique(&self.workcenters, workcenter, "workcenter")
    }

    pub fn insert_bom(&self, bom: BillOfMaterials) -> DomainResult<()> {
        insert_unique(&self.boms, bom, "bill of materials")
    }

    /// Every product event applied so far, in order.
    pub fn journal(&self) -> Vec<EventEnvelope<ProductEvent>> {
        match self.journal.read() {
            Ok(journal) => journal.clone(),
            Err(_) => vec![],
        }
    }

    fn append(&self, product: &Product, events: Vec<ProductEvent>) -> DomainResult<()> {
        let mut journal = self.journal.write().map_err(|_| poisoned())?;
        let first_sequence = product.version() + 1 - events.len() as u64;
        for (offset, event) in events.into_iter().enumerate() {
            journal.push(EventEnvelope::new(
                product.id_typed().0,
                PRODUCT_AGGREGATE,
                first_sequence + offset as u64,
                event,
            ));
        }
        Ok(())
    }
}

fn insert_unique<T>(map: &RwLock<BTreeMap<T::Id, T>>, value: T, what: &str) -> DomainResult<()>
where
    T: Entity,
    T::Id: Ord + core::fmt::Display,
{
    let mut map = map.write().map_err(|_| poisoned())?;
    let id = value.id().clone();
    if map.contains_key(&id) {
        return Err(DomainError::conflict(format!("{what} {id} already exists")));
    }
    map.insert(id, value);
    Ok(())
}

fn read_cloned<K: Ord, V: Clone>(map: &RwLock<BTreeMap<K, V>>, key: &K) -> Option<V> {
    map.read().ok()?.get(key).cloned()
}

impl ManufacturingStore for InMemoryManufacturingStore {
    fn product(&self, id: ProductId) -> Option<Product> {
        read_cloned(&self.products, &id)
    }

    fn category(&self, id: CategoryId) -> Option<ProductCategory> {
        read_cloned(&self.categories, &id)
    }

    fn uom(&self, id: UomId) -> Option<UnitOfMeasure> {
        read_cloned(&self.uoms, &id)
    }

    fn workcenter(&self, id: WorkcenterId) -> Option<Workcenter> {
        read_cloned(&self.workcenters, &id)
    }

    fn bom(&self, id: BomId) -> Option<BillOfMaterials> {
        read_cloned(&self.boms, &id)
    }

    fn boms(&self) -> Vec<BillOfMaterials> {
        match self.boms.read() {
            Ok(boms) => boms.values().cloned().collect(),
            Err(_) => vec![],
        }
    }

    fn change_standard_cost(&self, command: ChangeStandardCost) -> DomainResult<StandardCostChanged> {
        let mut products = self.products.write().map_err(|_| poisoned())?;
        let product = products
            .get_mut(&command.product_id)
            .ok_or_else(|| DomainError::not_found(format!("product {}", command.product_id)))?;

        let events = product.execute(&ProductCommand::ChangeStandardCost(command))?;
        let changed = events.iter().find_map(|event| match event {
            ProductEvent::StandardCostChanged(e) => Some(e.clone()),
            _ => None,
        });
        self.append(product, events)?;
        changed.ok_or_else(|| DomainError::invariant("standard cost change produced no event"))
    }

    fn mark_bom_costed(&self, bom: BomId, at: DateTime<Utc>) -> DomainResult<()> {
        let mut boms = self.boms.write().map_err(|_| poisoned())?;
        let entry = boms
            .get_mut(&bom)
            .ok_or_else(|| DomainError::not_found(format!("bill of materials {bom}")))?;
        entry.mark_costed(at);
        Ok(())
    }
}
