mod cmd;
mod core;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cmd::batch::BatchCommand;
use cmd::calculate::CalculateCommand;
use cmd::compare::CompareCommand;
use cmd::params::ParamsCommand;
use cmd::schema::SchemaCommand;
use crate::core::{ParamSource, ParameterStore};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "taxben", version, about = "Quebec and federal household tax and benefit calculator")]
struct Cli {
    /// Directory of <program>.json parameter files replacing the built-in tables
    #[arg(long, global = true, value_name = "DIR")]
    params: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Itemized disposable income of one household
    Calculate(CalculateCommand),
    /// Evaluate one household per CSV row
    Batch(BatchCommand),
    /// Check results against golden records
    Compare(CompareCommand),
    /// Print a parameter table, or list the catalog
    Params(ParamsCommand),
    /// Print expected input formats
    Schema(SchemaCommand),
}

fn main() -> anyhow::Result<ExitCode> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    if let Command::Schema(schema) = &cli.command {
        schema.exec()?;
        return Ok(ExitCode::SUCCESS);
    }

    let source = cli.params.clone().map_or(ParamSource::Embedded, ParamSource::Dir);
    let store = ParameterStore::load(&source).context("failed to load parameter tables")?;

    match &cli.command {
        Command::Calculate(calculate) => calculate.exec(&store)?,
        Command::Batch(batch) => batch.exec(&store)?,
        Command::Compare(compare) => return compare.exec(&store),
        Command::Params(params) => params.exec(&store)?,
        Command::Schema(schema) => schema.exec()?,
    }
    Ok(ExitCode::SUCCESS)
}
