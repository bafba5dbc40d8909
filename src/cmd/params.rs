//! Params command - audit the loaded parameter tables

use crate::core::catalog;
use crate::core::{ParameterStore, TaxYear};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

#[derive(Args, Debug)]
pub struct ParamsCommand {
    /// Program identifier (e.g., quebec_income_tax)
    #[arg(required_unless_present = "list")]
    program: Option<String>,

    /// Tax year of the table
    #[arg(required_unless_present = "list")]
    year: Option<i32>,

    /// List every program with its configured years
    #[arg(short, long)]
    list: bool,
}

impl ParamsCommand {
    pub fn exec(&self, params: &ParameterStore) -> anyhow::Result<()> {
        match (&self.program, self.year) {
            (Some(program), Some(year)) if !self.list => {
                let table = params.describe(program, TaxYear(year))?;
                println!("{}", serde_json::to_string_pretty(table)?);
            }
            _ => print_catalog(params),
        }
        Ok(())
    }
}

fn print_catalog(params: &ParameterStore) {
    let rows: Vec<CatalogRow> = catalog::programs()
        .iter()
        .map(|p| CatalogRow {
            id: p.id().to_string(),
            name: p.id().name().to_string(),
            stage: p.stage().to_string(),
            years: params
                .years(p.id())
                .iter()
                .map(TaxYear::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

#[derive(Debug, Clone, Tabled)]
struct CatalogRow {
    #[tabled(rename = "Program")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Years")]
    years: String,
}
