//! Rollup configuration from the environment.
//!
//! | variable                        | default |
//! |---------------------------------|---------|
//! | `ERPEXT_COST_ALL`               | `true`  |
//! | `ERPEXT_COST_PRECISION_DIGITS`  | `2`     |
//!
//! Unset variables take their default; set but unparsable ones are errors.

use thiserror::Error;

use erpext_core::{DomainError, Precision};
use erpext_manufacturing::RollupSettings;

pub const COST_ALL_VAR: &str = "ERPEXT_COST_ALL";
pub const PRECISION_DIGITS_VAR: &str = "ERPEXT_COST_PRECISION_DIGITS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: expected a boolean, got `{value}`")]
    InvalidBool { var: &'static str, value: String },

    #[error("{var}: expected a non-negative integer, got `{value}`")]
    InvalidDigits { var: &'static str, value: String },

    #[error("{var}: {source}")]
    Precision {
        var: &'static str,
        #[source]
        source: DomainError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollupConfig {
    /// Re-cost every stale sub-BOM, not only those of the selected products.
    pub cost_all: bool,
    pub precision: Precision,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            cost_all: true,
            precision: Precision::CURRENCY,
        }
    }
}

impl RollupConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(COST_ALL_VAR) {
            config.cost_all = parse_bool(&value).ok_or(ConfigError::InvalidBool {
                var: COST_ALL_VAR,
                value,
            })?;
        }

        if let Some(value) = lookup(PRECISION_DIGITS_VAR) {
            let digits = value
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidDigits {
                    var: PRECISION_DIGITS_VAR,
                    value: value.clone(),
                })?;
            config.precision = Precision::new(digits).map_err(|source| ConfigError::Precision {
                var: PRECISION_DIGITS_VAR,
                source,
            })?;
        }

        tracing::debug!(
            cost_all = config.cost_all,
            precision_digits = config.precision.digits(),
            "rollup config loaded"
        );
        Ok(config)
    }

    pub fn settings(&self) -> RollupSettings {
        RollupSettings {
            recompute_all: self.cost_all,
            precision: self.precision,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
