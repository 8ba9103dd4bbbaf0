//! Infrastructure layer: configuration, fixture loading and reporting around
//! the manufacturing store.

pub mod config;
pub mod fixture;
pub mod report;

pub use config::{ConfigError, RollupConfig};
pub use fixture::{FixtureError, LoadedFixture};
pub use report::{CostUpdateReport, CostUpdateRow};
