use tracing::trace;

use super::rmd::required_minimum_distribution;
use super::types::{SimulationInput, YearRecord};

#[derive(Debug, Clone, Copy)]
struct ContributionFlow {
    limit: f64,
    employee: f64,
    employer_match: f64,
}

impl ContributionFlow {
    fn total(self) -> f64 {
        self.employee + self.employer_match
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct WithdrawalOutcome {
    rmd: f64,
    withdrawal: f64,
}

/// Projects the account one calendar year at a time from `current_age`
/// through `end_age`, inclusive.
///
/// Growth is applied to the start-of-year balance only; this year's
/// contribution and match earn nothing until the following year. After
/// retirement the withdrawal is the larger of the percentage withdrawal and
/// the RMD, never their sum.
pub fn simulate(input: &SimulationInput) -> Vec<YearRecord> {
    let p = input.params();
    let mut records = Vec::with_capacity(input.years());
    let mut balance = p.current_balance;

    for age in p.current_age..=p.end_age {
        let years_elapsed = age - p.current_age;
        let year = p.base_year + years_elapsed as i32;

        let flow = contributions_for_year(input, year, age);
        let balance_start = balance;
        let growth_amount = balance_start * input.growth_rate_for_age(age);
        let available = (balance_start + growth_amount + flow.total()).max(0.0);
        let outcome = withdrawal_for_year(input, age, available);
        balance = (available - outcome.withdrawal).max(0.0);

        records.push(YearRecord {
            year,
            age,
            contribution_limit: flow.limit,
            contribution: flow.employee,
            employer_match: flow.employer_match,
            growth_amount,
            rmd: outcome.rmd,
            withdrawal: outcome.withdrawal,
            balance_start,
            balance_end: balance,
            is_milestone: input.is_milestone(age),
        });
    }

    trace!(
        years = records.len(),
        final_balance = balance,
        "simulation complete"
    );
    records
}

fn contributions_for_year(input: &SimulationInput, year: i32, age: u32) -> ContributionFlow {
    let p = input.params();
    let limit = p.limits.limit_for(year, age);
    if age >= p.retirement_age {
        return ContributionFlow {
            limit,
            employee: 0.0,
            employer_match: 0.0,
        };
    }

    let requested = if p.max_out_contributions {
        limit
    } else {
        p.annual_contribution
    };
    let employee = requested.max(0.0).min(limit);
    let employer_match = (employee * p.employer_match_rate).min(p.employer_match_cap);

    ContributionFlow {
        limit,
        employee,
        employer_match,
    }
}

fn withdrawal_for_year(input: &SimulationInput, age: u32, available: f64) -> WithdrawalOutcome {
    let p = input.params();
    if age < p.retirement_age {
        return WithdrawalOutcome::default();
    }

    let target = available * p.withdrawal_rate;
    let rmd = if p.rmd_enabled && age >= p.rmd_start_age {
        required_minimum_distribution(available, age).unwrap_or(0.0)
    } else {
        0.0
    };

    WithdrawalOutcome {
        rmd,
        withdrawal: target.max(rmd).min(available),
    }
}
