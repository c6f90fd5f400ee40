use clap::Parser;
use fluxshift_cli::rank::{run, RankArgs};

fn main() -> anyhow::Result<()> {
    fluxshift_cli::init_logging();
    let args = RankArgs::parse();
    run(&args)?;
    Ok(())
}
