mod commands;

use commands::{CommandLine, Commands, rollup};

fn main() -> anyhow::Result<()> {
    let cli = CommandLine::parse_args();

    erpext_observability::subscriber::init(cli.log_format);

    match cli.command {
        Commands::Rollup(args) => rollup::run(args),
    }
}
