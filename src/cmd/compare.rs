//! Compare command - run golden records and report differences

use crate::cmd::read_input;
use crate::core::{
    compare_record, display_amount, read_records, KeyComparison, ParameterStore, Pipeline,
};
use clap::Args;
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct CompareCommand {
    /// JSON file of golden records (or - for stdin)
    #[arg(short, long)]
    file: PathBuf,

    /// Largest accepted difference between magnitudes
    #[arg(short, long, default_value_t = dec!(1.00))]
    tolerance: Decimal,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct CompareOutput {
    records: usize,
    checks: usize,
    mismatch_count: usize,
    error_count: usize,
    mismatches: Vec<KeyComparison>,
    errors: Vec<String>,
}

impl CompareCommand {
    pub fn exec(&self, params: &ParameterStore) -> anyhow::Result<ExitCode> {
        let records = read_records(read_input(&self.file)?.as_slice())?;
        let pipeline = Pipeline::new(params)?;

        let outcomes: Vec<_> = records
            .par_iter()
            .map(|record| compare_record(&pipeline, record, self.tolerance))
            .collect();

        let mut checks = 0;
        let mut mismatches = Vec::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(comparisons) => {
                    checks += comparisons.len();
                    mismatches.extend(comparisons.into_iter().filter(|c| !c.matches));
                }
                Err(e) => {
                    log::warn!("{e}");
                    errors.push(e.to_string());
                }
            }
        }

        let output = CompareOutput {
            records: records.len(),
            checks,
            mismatch_count: mismatches.len(),
            error_count: errors.len(),
            mismatches,
            errors,
        };
        if self.json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            self.print_report(&output);
        }

        if output.mismatch_count > 0 || output.error_count > 0 {
            Ok(ExitCode::FAILURE)
        } else {
            Ok(ExitCode::SUCCESS)
        }
    }

    fn print_report(&self, output: &CompareOutput) {
        println!();
        println!(
            "GOLDEN COMPARISON ({} records, {} checks, tolerance {})",
            output.records,
            output.checks,
            display_amount(self.tolerance)
        );
        println!();

        if output.mismatches.is_empty() {
            println!("No mismatches");
        } else {
            let rows: Vec<MismatchRow> = output
                .mismatches
                .iter()
                .map(|m| MismatchRow {
                    record: m.record,
                    year: m.tax_year.to_string(),
                    key: m.key.clone(),
                    expected: display_amount(m.expected),
                    actual: display_amount(m.actual),
                    difference: display_amount(m.difference),
                })
                .collect();
            let table = Table::new(rows)
                .with(Style::rounded())
                .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
                .to_string();
            println!("{}", table);
        }

        for error in &output.errors {
            println!("error: {}", error);
        }
    }
}

#[derive(Debug, Clone, Tabled)]
struct MismatchRow {
    #[tabled(rename = "Record")]
    record: u32,
    #[tabled(rename = "Year")]
    year: String,
    #[tabled(rename = "Output")]
    key: String,
    #[tabled(rename = "Expected")]
    expected: String,
    #[tabled(rename = "Actual")]
    actual: String,
    #[tabled(rename = "Difference")]
    difference: String,
}
