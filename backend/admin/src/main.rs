use clap::Parser;
use tracker_admin::Cli;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    println!("{}", tracker_admin::run(args)?);

    Ok(())
}
