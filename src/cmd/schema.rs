//! Schema command - print expected input formats

use crate::cmd::batch::HouseholdRow;
use crate::core::HouseholdInput;
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format: json-schema, csv-header or csv-fields
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the household input of `calculate`
    JsonSchema,
    /// CSV header row for `batch`
    CsvHeader,
    /// CSV column descriptions for `batch`
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => self.print_json_schema(),
            SchemaFormat::CsvHeader => self.print_csv_header(),
            SchemaFormat::CsvFields => self.print_csv_fields(),
        }
    }

    fn print_json_schema(&self) -> anyhow::Result<()> {
        let schema = schema_for!(HouseholdInput);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }

    fn print_csv_header(&self) -> anyhow::Result<()> {
        println!("{}", HouseholdRow::csv_columns().join(","));
        Ok(())
    }

    fn print_csv_fields(&self) -> anyhow::Result<()> {
        println!("CSV Input Format");
        println!("================");
        println!();
        for field in HouseholdRow::csv_schema() {
            let req = if field.required { "required" } else { "optional" };
            println!("{:24} ({:8})  {}", field.name, req, field.description);
        }
        println!();
        println!("Amounts are annual, in dollars. Lists use ';' as separator.");
        Ok(())
    }
}
