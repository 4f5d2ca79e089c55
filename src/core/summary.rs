use serde::Serialize;

use super::types::{SimulationInput, YearRecord};

pub const KEY_AGES: [u32; 3] = [70, 80, 90];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeBalance {
    pub age: u32,
    pub balance: Option<f64>,
}

/// Headline figures derived from a finished projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementSummary {
    pub retirement_age: u32,
    pub balance_at_retirement: f64,
    pub first_withdrawal: f64,
    pub first_rmd_age: u32,
    pub first_rmd: Option<f64>,
    pub balance_at_ages: Vec<AgeBalance>,
    pub total_contributions: f64,
    pub total_employer_match: f64,
    pub total_withdrawals: f64,
    pub final_balance: f64,
}

pub fn summarize(input: &SimulationInput, records: &[YearRecord]) -> RetirementSummary {
    let p = input.params();
    let balance_at = |age: u32| records.iter().find(|r| r.age == age).map(|r| r.balance_end);

    // Balance entering retirement is the end of the last working year.
    let balance_at_retirement = p
        .retirement_age
        .checked_sub(1)
        .and_then(balance_at)
        .unwrap_or(p.current_balance);

    let first_withdrawal = records
        .iter()
        .map(|r| r.withdrawal)
        .find(|w| *w > 0.0)
        .unwrap_or(0.0);

    // RMDs are only drawn once retired, so a late retiree's first one comes later.
    let first_rmd_age = p.rmd_start_age.max(p.retirement_age);
    let first_rmd = if p.rmd_enabled {
        records
            .iter()
            .find(|r| r.age == first_rmd_age)
            .map(|r| r.rmd)
    } else {
        None
    };

    RetirementSummary {
        retirement_age: p.retirement_age,
        balance_at_retirement,
        first_withdrawal,
        first_rmd_age,
        first_rmd,
        balance_at_ages: KEY_AGES
            .iter()
            .map(|&age| AgeBalance {
                age,
                balance: balance_at(age),
            })
            .collect(),
        total_contributions: records.iter().map(|r| r.contribution).sum(),
        total_employer_match: records.iter().map(|r| r.employer_match).sum(),
        total_withdrawals: records.iter().map(|r| r.withdrawal).sum(),
        final_balance: records
            .last()
            .map(|r| r.balance_end)
            .unwrap_or(p.current_balance),
    }
}
