use clap::Parser;
use fluxshift_cli::sample::{run, SampleArgs};

fn main() -> anyhow::Result<()> {
    fluxshift_cli::init_logging();
    let args = SampleArgs::parse();
    run(&args)?;
    Ok(())
}
