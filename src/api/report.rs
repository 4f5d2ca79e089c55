use std::io;

use serde::Serialize;

use crate::core::{RetirementSummary, YearRecord};

pub const CSV_FILE_NAME: &str = "401k_projections.csv";

#[derive(Serialize)]
struct CsvRow {
    #[serde(rename = "Year")]
    year: i32,
    #[serde(rename = "Age")]
    age: u32,
    #[serde(rename = "Contribution Limit")]
    contribution_limit: f64,
    #[serde(rename = "Contribution")]
    contribution: f64,
    #[serde(rename = "Employer Match")]
    employer_match: f64,
    #[serde(rename = "Growth")]
    growth: f64,
    #[serde(rename = "RMD")]
    rmd: f64,
    #[serde(rename = "Withdrawal")]
    withdrawal: f64,
    #[serde(rename = "Start Balance")]
    balance_start: f64,
    #[serde(rename = "End Balance")]
    balance_end: f64,
    #[serde(rename = "Milestone")]
    milestone: bool,
}

impl From<&YearRecord> for CsvRow {
    fn from(r: &YearRecord) -> Self {
        Self {
            year: r.year,
            age: r.age,
            contribution_limit: round_cents(r.contribution_limit),
            contribution: round_cents(r.contribution),
            employer_match: round_cents(r.employer_match),
            growth: round_cents(r.growth_amount),
            rmd: round_cents(r.rmd),
            withdrawal: round_cents(r.withdrawal),
            balance_start: round_cents(r.balance_start),
            balance_end: round_cents(r.balance_end),
            milestone: r.is_milestone,
        }
    }
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

pub fn write_csv<W: io::Write>(records: &[YearRecord], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(CsvRow::from(record))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn csv_bytes(records: &[YearRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut buf = Vec::new();
    write_csv(records, &mut buf)?;
    Ok(buf)
}

pub fn format_table(records: &[YearRecord]) -> String {
    let mut lines = vec![
        format!(
            "{:>5} {:>4} {:>12} {:>12} {:>12} {:>12} {:>12} {:>14}",
            "Year", "Age", "Contrib", "Match", "Growth", "RMD", "Withdrawal", "End Balance"
        ),
        "-".repeat(90),
    ];
    lines.extend(records.iter().map(|r| {
        let marker = if r.is_milestone { " *" } else { "" };
        format!(
            "{:>5} {:>4} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>14.2}{marker}",
            r.year,
            r.age,
            r.contribution,
            r.employer_match,
            r.growth_amount,
            r.rmd,
            r.withdrawal,
            r.balance_end,
        )
    }));
    join_lines(lines)
}

fn dollars_or_na(amount: Option<f64>) -> String {
    amount.map_or_else(|| "N/A".to_string(), |v| format!("${v:.2}"))
}

pub fn format_summary(summary: &RetirementSummary) -> String {
    let mut lines = vec![
        "Summary:".to_string(),
        format!(
            "  Balance at retirement ({}): ${:.2}",
            summary.retirement_age, summary.balance_at_retirement
        ),
        format!("  First year withdrawal: ${:.2}", summary.first_withdrawal),
        format!(
            "  First RMD (age {}): {}",
            summary.first_rmd_age,
            dollars_or_na(summary.first_rmd)
        ),
    ];
    lines.extend(
        summary
            .balance_at_ages
            .iter()
            .map(|entry| format!("  Balance at {}: {}", entry.age, dollars_or_na(entry.balance))),
    );
    lines.extend([
        format!("  Total contributions: ${:.2}", summary.total_contributions),
        format!("  Total employer match: ${:.2}", summary.total_employer_match),
        format!("  Total withdrawals: ${:.2}", summary.total_withdrawals),
        format!("  Final balance: ${:.2}", summary.final_balance),
    ]);
    join_lines(lines)
}

// Every line, the last included, ends with a newline.
fn join_lines(lines: Vec<String>) -> String {
    lines.into_iter().map(|line| line + "\n").collect()
}
