mod artwork;
mod cli;
mod config;
mod control;
mod run;

use anyhow::Result;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();
    run::run(cli.run)
}
