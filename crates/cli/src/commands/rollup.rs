use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::Args;

use erpext_core::Precision;
use erpext_infra::{CostUpdateReport, LoadedFixture, RollupConfig};
use erpext_manufacturing::update_bom_cost;
use erpext_products::ProductId;

#[derive(Args)]
pub struct RollupArgs {
    /// Catalog fixture (JSON) to load
    #[arg(long)]
    pub fixture: PathBuf,

    /// Default code of a product to update; repeatable
    #[arg(long = "product", value_name = "CODE")]
    pub products: Vec<String>,

    /// Update every product costed at standard
    #[arg(long, conflicts_with = "products")]
    pub all_standard: bool,

    /// Re-cost every stale sub-assembly, not only the selected ones [env: ERPEXT_COST_ALL]
    #[arg(long)]
    pub cost_all: Option<bool>,

    /// Digits below which cost changes are ignored [env: ERPEXT_COST_PRECISION_DIGITS]
    #[arg(long)]
    pub precision_digits: Option<u32>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: RollupArgs) -> anyhow::Result<()> {
    let mut config = RollupConfig::from_env().context("invalid rollup environment")?;
    if let Some(cost_all) = args.cost_all {
        config.cost_all = cost_all;
    }
    if let Some(digits) = args.precision_digits {
        config.precision = Precision::new(digits).context("invalid --precision-digits")?;
    }

    let fixture = LoadedFixture::load(&args.fixture)
        .with_context(|| format!("loading {}", args.fixture.display()))?;

    let selection: Vec<ProductId> = if args.all_standard {
        fixture.standard_products()
    } else if args.products.is_empty() {
        bail!("select products with --product <CODE> or --all-standard");
    } else {
        args.products
            .iter()
            .map(|code| fixture.product_id(code))
            .collect::<Result<_, _>>()?
    };

    tracing::info!(
        products = selection.len(),
        cost_all = config.cost_all,
        precision_digits = config.precision.digits(),
        "updating cost from bom"
    );
    let changes = update_bom_cost(fixture.store(), &selection, config.settings(), Utc::now())
        .context("bom cost update failed")?;

    let report = CostUpdateReport::new(&fixture, &changes);
    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{report}");
    }
    Ok(())
}
