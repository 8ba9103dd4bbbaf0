//! Parties domain module (customers, suppliers and brands, event-sourced).
//!
//! Pure domain logic: no IO, no storage.

pub mod party;

pub use party::{Party, PartyCommand, PartyEvent, PartyId, PartyKind, PartyRegistered, RegisterParty};
