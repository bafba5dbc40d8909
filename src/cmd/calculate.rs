//! Calculate command - itemized disposable income for one household

use crate::cmd::read_input;
use crate::core::{
    display_amount, Calculation, Household, HouseholdInput, ParameterStore, Pipeline, ResultStatus,
};
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct CalculateCommand {
    /// Household JSON file (or - for stdin)
    #[arg(short, long)]
    file: PathBuf,

    /// Output as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Print the supporting details of each program
    #[arg(short, long)]
    details: bool,
}

impl CalculateCommand {
    pub fn exec(&self, params: &ParameterStore) -> anyhow::Result<()> {
        let input: HouseholdInput = serde_json::from_slice(&read_input(&self.file)?)
            .context("invalid household JSON")?;
        let household = Household::from(input);
        let calc = Pipeline::new(params)?.calculate(&household)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&calc)?);
        } else {
            self.print_table(&household, &calc);
        }
        Ok(())
    }

    fn print_table(&self, household: &Household, calc: &Calculation) {
        let rows: Vec<ResultRow> = calc
            .results
            .values()
            .map(|r| ResultRow {
                program: r.name.to_string(),
                adult1: display_amount(r.adult1),
                adult2: if household.has_spouse() {
                    display_amount(r.adult2)
                } else {
                    String::new()
                },
                total: display_amount(r.total),
                note: match r.status {
                    ResultStatus::Computed => String::new(),
                    ResultStatus::NotImplemented => "not implemented".to_string(),
                },
            })
            .collect();

        println!();
        println!(
            "HOUSEHOLD ({}, {} children) - tax year {}",
            household.status,
            household.child_count(),
            calc.tax_year
        );
        println!();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(1..4)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        println!();
        println!("Gross income:       {:>12}", display_amount(calc.gross_income));
        println!("Disposable income:  {:>12}", display_amount(calc.disposable_income));

        if self.details {
            println!();
            for result in calc.results.values().filter(|r| !r.detail.is_empty()) {
                println!("{}", result.name);
                for (key, value) in &result.detail {
                    println!("  {:28} {}", key, value);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Tabled)]
struct ResultRow {
    #[tabled(rename = "Program")]
    program: String,
    #[tabled(rename = "Adult 1")]
    adult1: String,
    #[tabled(rename = "Adult 2")]
    adult2: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "")]
    note: String,
}
