mod engine;
mod error;
mod limits;
mod rmd;
mod summary;
mod types;

pub use engine::simulate;
pub use error::SimulationError;
pub use limits::{CATCH_UP_AGE, ContributionLimits};
pub use rmd::{
    DEFAULT_RMD_START_AGE, MAX_RMD_START_AGE, MIN_RMD_START_AGE, divisor_for_age,
    divisor_strict, required_minimum_distribution,
};
pub use summary::{AgeBalance, KEY_AGES, RetirementSummary, summarize};
pub use types::{
    GLIDE_PATH_YEARS, MAX_AGE, MAX_CALENDAR_YEAR, MAX_HORIZON_YEARS, MIN_CALENDAR_YEAR,
    SimulationInput, SimulationParams, YearRecord,
};
