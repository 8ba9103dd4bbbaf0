use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use erpext_accounting::AccountId;
use erpext_core::{Aggregate, AggregateId, AggregateRoot, DomainError, RecordId, define_id};
use erpext_events::Event;

use crate::category::CategoryId;
use crate::uom::UomId;

define_id!(ProductId, AggregateId, "Product (variant) identifier.");
define_id!(
    ProductTemplateId,
    RecordId,
    "Product template identifier. Variants of one template share template-level BOMs."
);

/// How the product's inventory value is costed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostMethod {
    Standard,
    Average,
    Fifo,
}

/// How stock valuation is posted to accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Valuation {
    Manual,
    RealTime,
}

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    template_id: Option<ProductTemplateId>,
    default_code: String,
    name: String,
    uom_id: Option<UomId>,
    category_id: Option<CategoryId>,
    cost_method: CostMethod,
    valuation: Valuation,
    standard_cost: Decimal,
    expense_account: Option<AccountId>,
    cost_updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            template_id: None,
            default_code: String::new(),
            name: String::new(),
            uom_id: None,
            category_id: None,
            cost_method: CostMethod::Standard,
            valuation: Valuation::Manual,
            standard_cost: Decimal::ZERO,
            expense_account: None,
            cost_updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn template_id(&self) -> Option<ProductTemplateId> {
        self.template_id
    }

    pub fn default_code(&self) -> &str {
        &self.default_code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uom_id(&self) -> Option<UomId> {
        self.uom_id
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category_id
    }

    pub fn cost_method(&self) -> CostMethod {
        self.cost_method
    }

    pub fn valuation(&self) -> Valuation {
        self.valuation
    }

    pub fn standard_cost(&self) -> Decimal {
        self.standard_cost
    }

    pub fn expense_account(&self) -> Option<AccountId> {
        self.expense_account
    }

    /// Last time a standard cost was written for this product.
    pub fn cost_updated_at(&self) -> Option<DateTime<Utc>> {
        self.cost_updated_at
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Real-time valued FIFO products get their cost from manufacturing
    /// orders and cannot have a standard cost pushed onto them.
    pub fn is_realtime_fifo(&self) -> bool {
        self.valuation == Valuation::RealTime && self.cost_method == CostMethod::Fifo
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub template_id: Option<ProductTemplateId>,
    pub default_code: String,
    pub name: String,
    pub uom_id: UomId,
    pub category_id: Option<CategoryId>,
    pub cost_method: CostMethod,
    pub valuation: Valuation,
    pub standard_cost: Decimal,
    pub expense_account: Option<AccountId>,
    /// Last standard-cost update carried over from an existing catalog, if any.
    pub cost_updated_at: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStandardCost.
///
/// `expense_account` is the account the revaluation is booked against
/// (product account, else category account).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStandardCost {
    pub product_id: ProductId,
    pub new_cost: Decimal,
    pub expense_account: Option<AccountId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    ChangeStandardCost(ChangeStandardCost),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub template_id: Option<ProductTemplateId>,
    pub default_code: String,
    pub name: String,
    pub uom_id: UomId,
    pub category_id: Option<CategoryId>,
    pub cost_method: CostMethod,
    pub valuation: Valuation,
    pub standard_cost: Decimal,
    pub expense_account: Option<AccountId>,
    pub cost_updated_at: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StandardCostChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardCostChanged {
    pub product_id: ProductId,
    pub previous_cost: Decimal,
    pub new_cost: Decimal,
    pub expense_account: Option<AccountId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    StandardCostChanged(StandardCostChanged),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
            ProductEvent::StandardCostChanged(_) => "products.product.standard_cost_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::StandardCostChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.template_id = e.template_id;
                self.default_code = e.default_code.clone();
                self.name = e.name.clone();
                self.uom_id = Some(e.uom_id);
                self.category_id = e.category_id;
                self.cost_method = e.cost_method;
                self.valuation = e.valuation;
                self.standard_cost = e.standard_cost;
                self.expense_account = e.expense_account;
                self.cost_updated_at = e.cost_updated_at;
                self.created = true;
            }
            ProductEvent::StandardCostChanged(e) => {
                self.standard_cost = e.new_cost;
                self.cost_updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::ChangeStandardCost(cmd) => self.handle_change_standard_cost(cmd),
        }
    }
}

impl Product {
    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.default_code.trim().is_empty() {
            return Err(DomainError::validation("default code cannot be empty"));
        }
        if cmd.standard_cost < Decimal::ZERO {
            return Err(DomainError::validation("standard cost cannot be negative"));
        }

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            product_id: cmd.product_id,
            template_id: cmd.template_id,
            default_code: cmd.default_code.clone(),
            name: cmd.name.clone(),
            uom_id: cmd.uom_id,
            category_id: cmd.category_id,
            cost_method: cmd.cost_method,
            valuation: cmd.valuation,
            standard_cost: cmd.standard_cost,
            expense_account: cmd.expense_account,
            cost_updated_at: cmd.cost_updated_at,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_standard_cost(
        &self,
        cmd: &ChangeStandardCost,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("product {}", cmd.product_id)));
        }
        self.ensure_product_id(cmd.product_id)?;

        if cmd.new_cost < Decimal::ZERO {
            return Err(DomainError::validation("standard cost cannot be negative"));
        }

        Ok(vec![ProductEvent::StandardCostChanged(StandardCostChanged {
            product_id: cmd.product_id,
            previous_cost: self.standard_cost,
            new_cost: cmd.new_cost,
            expense_account: cmd.expense_account,
            occurred_at: cmd.occurred_at,
        })])
    }
}
