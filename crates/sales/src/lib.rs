//! Sales subscriptions (event-sourced) and the invoice drafts they produce.
//!
//! Pure domain logic: no IO, no storage.

pub mod subscription;

pub use subscription::{
    AddLine, AssignBrand, BrandAssigned, BrandRef, CreateSubscription, InvoiceDraft,
    InvoiceDraftLine, LineAdded, Subscription, SubscriptionCommand, SubscriptionCreated,
    SubscriptionEvent, SubscriptionId, SubscriptionLine,
};
