use serde::Serialize;

use super::error::SimulationError;
use super::limits::ContributionLimits;
use super::rmd::{DEFAULT_RMD_START_AGE, MAX_RMD_START_AGE, MIN_RMD_START_AGE};

pub const MAX_HORIZON_YEARS: u32 = 120;
pub const GLIDE_PATH_YEARS: u32 = 5;
pub const MAX_AGE: u32 = 150;
pub const MIN_CALENDAR_YEAR: i32 = 1900;
pub const MAX_CALENDAR_YEAR: i32 = 2500;

/// Raw projection parameters. Rates are fractions (0.07 = 7%), amounts are
/// dollars per year. Turn into a [`SimulationInput`] before simulating.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub current_age: u32,
    pub retirement_age: u32,
    pub end_age: u32,
    pub base_year: i32,
    pub current_balance: f64,
    pub annual_contribution: f64,
    pub max_out_contributions: bool,
    pub employer_match_rate: f64,
    /// Dollar ceiling on the yearly employer match.
    pub employer_match_cap: f64,
    pub annual_growth_rate: f64,
    /// Used instead of `annual_growth_rate` from five years before retirement.
    pub conservative_growth_rate: Option<f64>,
    pub withdrawal_rate: f64,
    pub rmd_enabled: bool,
    pub rmd_start_age: u32,
    pub limits: ContributionLimits,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            current_age: 40,
            retirement_age: 65,
            end_age: 100,
            base_year: 2024,
            current_balance: 10_000.0,
            annual_contribution: 12_000.0,
            max_out_contributions: false,
            employer_match_rate: 0.5,
            employer_match_cap: 5_000.0,
            annual_growth_rate: 0.07,
            conservative_growth_rate: None,
            withdrawal_rate: 0.04,
            rmd_enabled: true,
            rmd_start_age: DEFAULT_RMD_START_AGE,
            limits: ContributionLimits::default(),
        }
    }
}

/// Validated, read-only parameters for one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationInput {
    params: SimulationParams,
}

impl SimulationInput {
    pub fn new(params: SimulationParams) -> Result<Self, SimulationError> {
        validate(&params)?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn years(&self) -> usize {
        (self.params.end_age - self.params.current_age) as usize + 1
    }

    pub fn growth_rate_for_age(&self, age: u32) -> f64 {
        match self.params.conservative_growth_rate {
            Some(rate) if age + GLIDE_PATH_YEARS >= self.params.retirement_age => rate,
            _ => self.params.annual_growth_rate,
        }
    }

    pub fn is_milestone(&self, age: u32) -> bool {
        age % 10 == 0 || age + 1 == self.params.retirement_age
    }
}

fn validate(p: &SimulationParams) -> Result<(), SimulationError> {
    if p.retirement_age <= p.current_age {
        return Err(SimulationError::invalid(
            "retirement_age",
            format!("must be > current_age ({})", p.current_age),
        ));
    }

    if p.end_age < p.retirement_age {
        return Err(SimulationError::invalid(
            "end_age",
            format!("must be >= retirement_age ({})", p.retirement_age),
        ));
    }

    if p.end_age > MAX_AGE {
        return Err(SimulationError::invalid(
            "end_age",
            format!("must be <= {MAX_AGE}"),
        ));
    }

    // Bounded years keep every projected year and reference offset well inside i32.
    for (field, year) in [
        ("base_year", p.base_year),
        ("limits.reference_year", p.limits.reference_year),
    ] {
        if !(MIN_CALENDAR_YEAR..=MAX_CALENDAR_YEAR).contains(&year) {
            return Err(SimulationError::invalid(
                field,
                format!("must be between {MIN_CALENDAR_YEAR} and {MAX_CALENDAR_YEAR}"),
            ));
        }
    }

    if p.end_age - p.current_age >= MAX_HORIZON_YEARS {
        return Err(SimulationError::invalid(
            "end_age",
            format!("must be within {MAX_HORIZON_YEARS} years of current_age"),
        ));
    }

    for (field, amount) in [
        ("current_balance", p.current_balance),
        ("annual_contribution", p.annual_contribution),
        ("employer_match_cap", p.employer_match_cap),
    ] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(SimulationError::invalid(field, "must be a finite amount >= 0"));
        }
    }

    for (field, rate) in [
        ("employer_match_rate", p.employer_match_rate),
        ("withdrawal_rate", p.withdrawal_rate),
    ] {
        if !(0.0..=1.0).contains(&rate) {
            return Err(SimulationError::invalid(field, "must be between 0 and 1"));
        }
    }

    check_growth_rate("annual_growth_rate", p.annual_growth_rate)?;
    if let Some(rate) = p.conservative_growth_rate {
        check_growth_rate("conservative_growth_rate", rate)?;
    }

    if !(MIN_RMD_START_AGE..=MAX_RMD_START_AGE).contains(&p.rmd_start_age) {
        return Err(SimulationError::invalid(
            "rmd_start_age",
            format!("must be between {MIN_RMD_START_AGE} and {MAX_RMD_START_AGE}"),
        ));
    }

    let limits = &p.limits;
    for (field, amount) in [
        ("limits.base_limit", limits.base_limit),
        ("limits.base_annual_increment", limits.base_annual_increment),
        ("limits.catch_up_limit", limits.catch_up_limit),
        ("limits.catch_up_annual_increment", limits.catch_up_annual_increment),
    ] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(SimulationError::invalid(field, "must be a finite amount >= 0"));
        }
    }

    Ok(())
}

// A rate of -1 wipes the balance out; anything lower would drive it negative.
fn check_growth_rate(field: &'static str, rate: f64) -> Result<(), SimulationError> {
    if !rate.is_finite() || rate < -1.0 {
        return Err(SimulationError::invalid(field, "must be a finite rate >= -1"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub year: i32,
    pub age: u32,
    pub contribution_limit: f64,
    pub contribution: f64,
    pub employer_match: f64,
    pub growth_amount: f64,
    pub rmd: f64,
    pub withdrawal: f64,
    pub balance_start: f64,
    pub balance_end: f64,
    pub is_milestone: bool,
}
