pub mod rollup;

use clap::{Parser, Subcommand};
use erpext_observability::LogFormat;

#[derive(Parser)]
#[command(name = "erpext")]
#[command(about = "ERP extension tools.")]
pub struct CommandLine {
    /// Log output format (json or compact); filtered by RUST_LOG
    #[arg(long, global = true, default_value = "json")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Update standard costs from bills of materials
    #[command(alias = "r")]
    Rollup(rollup::RollupArgs),
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
