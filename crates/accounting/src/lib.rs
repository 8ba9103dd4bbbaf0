//! Accounting module: chart-of-accounts references and analytic segments.
//!
//! Pure domain logic only: no IO, no persistence concerns.

pub mod account;
pub mod segment;

pub use account::{Account, AccountId, AccountKind};
pub use segment::{
    AnalyticSegment, DEFAULT_SEARCH_LIMIT, MatchOperator, SegmentDirectory, SegmentId,
};
