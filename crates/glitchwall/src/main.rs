mod cli;
mod run;

use anyhow::Result;

fn main() -> Result<()> {
    let cli = cli::parse();
    let config = run::load_config(cli.config.as_deref())?;
    run::initialise_tracing(config.log.filter.as_deref());
    run::run(cli, config)
}
