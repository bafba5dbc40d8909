//! Batch command - one household per CSV row, totals per program out

use crate::cmd::read_input;
use crate::core::{
    AdultInput, Calculation, Child, FamilyInput, FamilyStatus, Household, ParameterStore,
    Pipeline, ProgramId, TaxYear,
};
use anyhow::Context;
use clap::Args;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io;
use std::path::PathBuf;
use taxben_derive::CsvSchema;

/// Column description produced by the `CsvSchema` derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvField {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Args, Debug)]
pub struct BatchCommand {
    /// CSV file with one household per row (or - for stdin)
    #[arg(short, long)]
    file: PathBuf,
}

/// One household as a flat CSV record
#[derive(Debug, Clone, Deserialize, CsvSchema)]
pub struct HouseholdRow {
    /// Tax year (e.g., 2024)
    pub tax_year: i32,
    /// single, single_parent, couple, retired_single or retired_couple
    pub status: FamilyStatus,
    /// Age of the primary adult
    pub age1: u32,
    /// Employment income of the primary adult
    pub work_income1: Option<Decimal>,
    /// Self-employment income of the primary adult
    pub self_employed_income1: Option<Decimal>,
    /// Retirement income of the primary adult
    pub retirement_income1: Option<Decimal>,
    /// Primary adult has a disability (true/false)
    pub disability1: Option<bool>,
    /// Age of the spouse (required for couples)
    pub age2: Option<u32>,
    /// Employment income of the spouse
    pub work_income2: Option<Decimal>,
    /// Self-employment income of the spouse
    pub self_employed_income2: Option<Decimal>,
    /// Retirement income of the spouse
    pub retirement_income2: Option<Decimal>,
    /// Spouse has a disability (true/false)
    pub disability2: Option<bool>,
    /// Children's ages separated by ';' (e.g., 6;3)
    pub child_ages: Option<String>,
    /// Annual daycare cost per child, same order as child_ages
    pub daycare_costs: Option<String>,
    /// Annual rent or housing cost
    pub housing_cost: Option<Decimal>,
    /// Annual medical expenses of the household
    pub medical_expenses: Option<Decimal>,
}

impl HouseholdRow {
    pub fn to_household(&self) -> anyhow::Result<Household> {
        let adult1 = AdultInput {
            age: self.age1,
            work_income: self.work_income1.unwrap_or_default(),
            self_employed_income: self.self_employed_income1.unwrap_or_default(),
            retirement_income: self.retirement_income1.unwrap_or_default(),
            has_disability: self.disability1.unwrap_or_default(),
            ..Default::default()
        };
        let adult2 = self.age2.map(|age| AdultInput {
            age,
            work_income: self.work_income2.unwrap_or_default(),
            self_employed_income: self.self_employed_income2.unwrap_or_default(),
            retirement_income: self.retirement_income2.unwrap_or_default(),
            has_disability: self.disability2.unwrap_or_default(),
            ..Default::default()
        });

        let ages: Vec<u32> = split_list(self.child_ages.as_deref())
            .map(|age| age.parse().with_context(|| format!("invalid child age '{age}'")))
            .collect::<anyhow::Result<_>>()?;
        let costs: Vec<Decimal> = split_list(self.daycare_costs.as_deref())
            .map(|cost| cost.parse().with_context(|| format!("invalid daycare cost '{cost}'")))
            .collect::<anyhow::Result<_>>()?;
        if costs.len() > ages.len() {
            anyhow::bail!("{} daycare costs for {} children", costs.len(), ages.len());
        }
        let children = ages
            .iter()
            .enumerate()
            .map(|(i, age)| Child {
                daycare_cost: costs.get(i).copied().unwrap_or_default(),
                ..Child::new(*age)
            })
            .collect();

        let family = FamilyInput {
            status: self.status,
            adult1,
            adult2,
            children,
            housing_cost: self.housing_cost.unwrap_or_default(),
            medical_expenses: self.medical_expenses.unwrap_or_default(),
            northern_village: false,
        };
        Ok(family.for_year(TaxYear(self.tax_year)))
    }
}

fn split_list(list: Option<&str>) -> impl Iterator<Item = &str> {
    list.unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

impl BatchCommand {
    pub fn exec(&self, params: &ParameterStore) -> anyhow::Result<()> {
        let input = read_input(&self.file)?;
        let mut reader = csv::Reader::from_reader(input.as_slice());
        let rows: Vec<HouseholdRow> = reader
            .deserialize()
            .enumerate()
            .map(|(i, row)| row.with_context(|| format!("invalid CSV row {}", i + 1)))
            .collect::<anyhow::Result<_>>()?;

        let pipeline = Pipeline::new(params)?;
        let outcomes: Vec<Result<Calculation, String>> = rows
            .par_iter()
            .map(|row| {
                let household = row.to_household().map_err(|e| format!("{e:#}"))?;
                pipeline.calculate(&household).map_err(|e| e.to_string())
            })
            .collect();

        let failed = outcomes.iter().filter(|o| o.is_err()).count();
        log::info!("batch: {} households, {} failed", outcomes.len(), failed);
        write_results(&outcomes)
    }
}

fn write_results(outcomes: &[Result<Calculation, String>]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(io::stdout());

    let mut header = vec!["row".to_string(), "tax_year".to_string()];
    header.extend(ProgramId::ALL.iter().map(|id| id.to_string()));
    header.push("disposable_income".to_string());
    header.push("error".to_string());
    wtr.write_record(&header)?;

    for (i, outcome) in outcomes.iter().enumerate() {
        let mut record = vec![(i + 1).to_string()];
        match outcome {
            Ok(calc) => {
                record.push(calc.tax_year.to_string());
                record.extend(ProgramId::ALL.iter().map(|id| calc.total(*id).to_string()));
                record.push(calc.disposable_income.to_string());
                record.push(String::new());
            }
            Err(message) => {
                log::warn!("row {}: {}", i + 1, message);
                record.push(String::new());
                record.extend(ProgramId::ALL.iter().map(|_| String::new()));
                record.push(String::new());
                record.push(message.clone());
            }
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse(csv: &str) -> Vec<HouseholdRow> {
        csv::Reader::from_reader(csv.as_bytes())
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    const HEADER: &str = "tax_year,status,age1,work_income1,self_employed_income1,retirement_income1,disability1,age2,work_income2,self_employed_income2,retirement_income2,disability2,child_ages,daycare_costs,housing_cost,medical_expenses";

    #[test]
    fn row_with_children() {
        let rows = parse(&format!(
            "{HEADER}\n2024,couple,38,80000,,,,36,55000,,,,6;3,8000;15000,,\n"
        ));
        let household = rows[0].to_household().unwrap();
        assert_eq!(household.status, FamilyStatus::Couple);
        assert_eq!(household.adult2.as_ref().unwrap().work_income, dec!(55000));
        assert_eq!(household.children.len(), 2);
        assert_eq!(household.children[1].age, 3);
        assert_eq!(household.children[1].daycare_cost, dec!(15000));
        assert_eq!(household.housing_cost, dec!(0));
    }

    #[test]
    fn empty_optional_columns_default() {
        let rows = parse(&format!("{HEADER}\n2023,single,30,45000,,,,,,,,,,,,\n"));
        let household = rows[0].to_household().unwrap();
        assert!(household.adult2.is_none());
        assert!(household.children.is_empty());
        assert!(!household.adult1.has_disability);
    }

    #[test]
    fn more_costs_than_children_is_an_error() {
        let rows = parse(&format!("{HEADER}\n2024,single_parent,30,0,,,,,,,,,4,100;200,,\n"));
        assert!(rows[0].to_household().is_err());
    }

    #[test]
    fn schema_lists_every_column() {
        assert_eq!(HouseholdRow::csv_columns().join(","), HEADER);
        let required: Vec<_> = HouseholdRow::csv_schema()
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();
        assert_eq!(required, vec!["tax_year", "status", "age1"]);
    }
}
