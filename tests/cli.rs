//! E2E tests for the command-line surface

use std::process::{Command, Output};

fn taxben(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_taxben"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Itemized table for a single worker
#[test]
fn calculate_table() {
    let output = taxben(&["calculate", "-f", "tests/data/single_worker.json"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let stdout = stdout(&output);
    assert!(stdout.contains("Quebec Pension Plan"));
    assert!(stdout.contains("-2656.00"));
    assert!(stdout.contains("Federal Income Tax"));
    assert!(stdout.contains("not implemented"));
    assert!(stdout.contains("Disposable income"));
}

/// JSON output exposes every program and the aggregate
#[test]
fn calculate_json() {
    let output = taxben(&["calculate", "-f", "tests/data/couple_children.json", "--json"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["tax_year"], 2024);
    assert_eq!(json["gross_income"], "135000.00");
    assert_eq!(json["results"].as_object().unwrap().len(), 21);
    assert_eq!(json["results"]["childcare_credit"]["total"], "13356.45");
    assert!(json["disposable_income"].is_string());
}

/// Parameter tables can be read from a directory
#[test]
fn calculate_with_params_dir() {
    let output = taxben(&[
        "--params",
        "params",
        "calculate",
        "-f",
        "tests/data/single_worker.json",
        "--json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["results"]["pension_plan"]["total"], "-2656.00");
}

/// Validation errors are reported and fail the command
#[test]
fn calculate_invalid_household() {
    let output = taxben(&["calculate", "-f", "tests/data/invalid_couple.json"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("couple household requires a spouse"), "{stderr}");
}

/// Rows are processed independently; a failing row gets an error column
#[test]
fn batch_csv() {
    let output = taxben(&["batch", "-f", "tests/data/households.csv"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let stdout = stdout(&output);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("row,tax_year,employment_insurance"));
    assert!(lines[0].ends_with("disposable_income,error"));
    assert!(lines[1].starts_with("1,2024,-594.00"));
    assert!(lines[3].starts_with("3,,"));
    assert!(lines[3].contains("no parameters for tax year 2025"));
    assert!(lines[4].starts_with("4,2023,"));
}

/// Golden records within tolerance pass
#[test]
fn compare_passes() {
    let output = taxben(&["compare", "-f", "tests/data/golden.json"]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout(&output).contains("No mismatches"));
}

/// A tighter tolerance surfaces the mismatch and exits non-zero
#[test]
fn compare_reports_mismatch() {
    let output = taxben(&["compare", "-f", "tests/data/golden.json", "--tolerance", "0.01", "--json"]);
    assert_eq!(output.status.code(), Some(1));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["mismatch_count"], 1);
    assert_eq!(json["mismatches"][0]["key"], "gst_credit");
    assert_eq!(json["mismatches"][0]["difference"], "0.40");
}

#[test]
fn compare_mismatch_table() {
    let output = taxben(&["compare", "-f", "tests/data/golden_mismatch.json"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("pension_plan"));
}

/// Raw tables are printed for auditing
#[test]
fn params_table() {
    let output = taxben(&["params", "pension_plan", "2024"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["max_contribution"], "4348.00");
}

#[test]
fn params_unsupported_year() {
    let output = taxben(&["params", "parental_insurance", "2025"]);
    assert!(!output.status.success());
}

#[test]
fn params_list() {
    let output = taxben(&["params", "--list"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let stdout = stdout(&output);
    assert!(stdout.contains("old_age_security"));
    assert!(stdout.contains("2023, 2024"));
}

#[test]
fn schema_csv_header() {
    let output = taxben(&["schema", "csv-header"]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout(&output).starts_with("tax_year,status,age1,"));
}

#[test]
fn schema_json() {
    let output = taxben(&["schema"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["properties"]["tax_year"].is_object());
    assert!(json["properties"]["status"].is_object());
}
