//! cogcat CLI entrypoint.
//!
//! Thin wrapper over the `cli` module: parse args, build the catalog item,
//! and exit with a non-zero status on the first error.
//! For programmatic use, prefer the library API (`cogcat::api`).

use clap::Parser;

mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();
    cli::run(args)?;
    Ok(())
}
