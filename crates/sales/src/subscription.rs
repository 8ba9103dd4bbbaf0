use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use erpext_core::{Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, define_id};
use erpext_events::Event;
use erpext_parties::{Party, PartyId};
use erpext_products::ProductId;

define_id!(SubscriptionId, AggregateId, "Sales subscription identifier.");

/// A party checked to be a brand.
///
/// Only constructible from a registered [`Party`] of kind brand, so a
/// subscription can never point its brand at a customer or supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrandRef(PartyId);

impl BrandRef {
    pub fn party_id(&self) -> PartyId {
        self.0
    }
}

impl TryFrom<&Party> for BrandRef {
    type Error = DomainError;

    fn try_from(party: &Party) -> Result<Self, Self::Error> {
        if !party.is_brand() {
            return Err(DomainError::validation(format!(
                "party {} is not a brand",
                party.id_typed()
            )));
        }
        Ok(Self(party.id_typed()))
    }
}

/// Recurring line of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Aggregate root: Subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    id: SubscriptionId,
    code: String,
    customer: Option<PartyId>,
    brand: Option<BrandRef>,
    lines: Vec<SubscriptionLine>,
    version: u64,
    created: bool,
}

impl Subscription {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: SubscriptionId) -> Self {
        Self {
            id,
            code: String::new(),
            customer: None,
            brand: None,
            lines: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SubscriptionId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn customer(&self) -> Option<PartyId> {
        self.customer
    }

    pub fn brand(&self) -> Option<BrandRef> {
        self.brand
    }

    pub fn lines(&self) -> &[SubscriptionLine] {
        &self.lines
    }

    /// Values for the next recurring invoice of this subscription.
    ///
    /// The invoice carries the subscription's brand when one is set.
    pub fn prepare_invoice_data(&self, invoice_date: NaiveDate) -> DomainResult<InvoiceDraft> {
        let customer = match (self.created, self.customer) {
            (true, Some(customer)) => customer,
            _ => return Err(DomainError::not_found(format!("subscription {}", self.id))),
        };

        Ok(InvoiceDraft {
            customer,
            origin: self.code.clone(),
            invoice_date,
            lines: self
                .lines
                .iter()
                .map(|line| InvoiceDraftLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
            brand: self.brand.map(|brand| brand.party_id()),
        })
    }
}

impl AggregateRoot for Subscription {
    type Id = SubscriptionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Customer invoice values prepared from a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub customer: PartyId,
    /// Code of the originating subscription.
    pub origin: String,
    pub invoice_date: NaiveDate,
    pub lines: Vec<InvoiceDraftLine>,
    pub brand: Option<PartyId>,
}

impl InvoiceDraft {
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(|l| l.quantity * l.unit_price).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDraftLine {
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Command: CreateSubscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSubscription {
    pub subscription_id: SubscriptionId,
    pub code: String,
    pub customer: PartyId,
    pub brand: Option<BrandRef>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub subscription_id: SubscriptionId,
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignBrand. `None` clears the brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignBrand {
    pub subscription_id: SubscriptionId,
    pub brand: Option<BrandRef>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionCommand {
    CreateSubscription(CreateSubscription),
    AddLine(AddLine),
    AssignBrand(AssignBrand),
}

/// Event: SubscriptionCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionCreated {
    pub subscription_id: SubscriptionId,
    pub code: String,
    pub customer: PartyId,
    pub brand: Option<BrandRef>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdded {
    pub subscription_id: SubscriptionId,
    pub line: SubscriptionLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BrandAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandAssigned {
    pub subscription_id: SubscriptionId,
    pub brand: Option<BrandRef>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionEvent {
    SubscriptionCreated(SubscriptionCreated),
    LineAdded(LineAdded),
    BrandAssigned(BrandAssigned),
}

impl Event for SubscriptionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SubscriptionEvent::SubscriptionCreated(_) => "sales.subscription.created",
            SubscriptionEvent::LineAdded(_) => "sales.subscription.line_added",
            SubscriptionEvent::BrandAssigned(_) => "sales.subscription.brand_assigned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SubscriptionEvent::SubscriptionCreated(e) => e.occurred_at,
            SubscriptionEvent::LineAdded(e) => e.occurred_at,
            SubscriptionEvent::BrandAssigned(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Subscription {
    type Command = SubscriptionCommand;
    type Event = SubscriptionEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SubscriptionEvent::SubscriptionCreated(e) => {
                self.id = e.subscription_id;
                self.code = e.code.clone();
                self.customer = Some(e.customer);
                self.brand = e.brand;
                self.created = true;
            }
            SubscriptionEvent::LineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            SubscriptionEvent::BrandAssigned(e) => {
                self.brand = e.brand;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SubscriptionCommand::CreateSubscription(cmd) => self.handle_create(cmd),
            SubscriptionCommand::AddLine(cmd) => self.handle_add_line(cmd),
            SubscriptionCommand::AssignBrand(cmd) => self.handle_assign_brand(cmd),
        }
    }
}

impl Subscription {
    fn ensure_existing(&self, subscription_id: SubscriptionId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("subscription {subscription_id}")));
        }
        if self.id != subscription_id {
            return Err(DomainError::invariant("subscription_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateSubscription) -> Result<Vec<SubscriptionEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("subscription already exists"));
        }
        if cmd.code.trim().is_empty() {
            return Err(DomainError::validation("code cannot be empty"));
        }

        Ok(vec![SubscriptionEvent::SubscriptionCreated(SubscriptionCreated {
            subscription_id: cmd.subscription_id,
            code: cmd.code.clone(),
            customer: cmd.customer,
            brand: cmd.brand,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<SubscriptionEvent>, DomainError> {
        self.ensure_existing(cmd.subscription_id)?;
        if cmd.quantity <= Decimal::ZERO {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if cmd.unit_price < Decimal::ZERO {
            return Err(DomainError::validation("unit price cannot be negative"));
        }

        let line_no = self.lines.last().map_or(1, |l| l.line_no + 1);
        Ok(vec![SubscriptionEvent::LineAdded(LineAdded {
            subscription_id: cmd.subscription_id,
            line: SubscriptionLine {
                line_no,
                product_id: cmd.product_id,
                quantity: cmd.quantity,
                unit_price: cmd.unit_price,
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_brand(&self, cmd: &AssignBrand) -> Result<Vec<SubscriptionEvent>, DomainError> {
        self.ensure_existing(cmd.subscription_id)?;
        if self.brand == cmd.brand {
            return Ok(vec![]);
        }

        Ok(vec![SubscriptionEvent::BrandAssigned(BrandAssigned {
            subscription_id: cmd.subscription_id,
            brand: cmd.brand,
            occurred_at: cmd.occurred_at,
        })])
    }
}
