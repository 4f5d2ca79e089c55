use super::error::SimulationError;

pub const DEFAULT_RMD_START_AGE: u32 = 73;
pub const MIN_RMD_START_AGE: u32 = 72;
pub const MAX_RMD_START_AGE: u32 = 75;

const TABLE_FIRST_AGE: u32 = 72;

// IRS Uniform Lifetime Table (2022 revision), ages 72 through 120.
const UNIFORM_LIFETIME_DIVISORS: [f64; 49] = [
    27.4, 26.5, 25.5, 24.6, 23.7, 22.9, 22.0, 21.1, 20.2, 19.4, // 72-81
    18.5, 17.7, 16.8, 16.0, 15.2, 14.4, 13.7, 12.9, 12.2, 11.5, // 82-91
    10.8, 10.1, 9.5, 8.9, 8.4, 7.8, 7.3, 6.8, 6.4, 6.0, // 92-101
    5.6, 5.2, 4.9, 4.6, 4.3, 4.1, 3.9, 3.7, 3.5, 3.4, // 102-111
    3.3, 3.1, 3.0, 2.9, 2.8, 2.7, 2.5, 2.3, 2.0, // 112-120
];

const TABLE_LAST_AGE: u32 = TABLE_FIRST_AGE + UNIFORM_LIFETIME_DIVISORS.len() as u32 - 1;

/// Divisor for `age`. Ages past the end of the table reuse the final divisor;
/// ages before the first entry have no RMD.
pub fn divisor_for_age(age: u32) -> Option<f64> {
    if age < TABLE_FIRST_AGE {
        return None;
    }
    let idx = (age.min(TABLE_LAST_AGE) - TABLE_FIRST_AGE) as usize;
    Some(UNIFORM_LIFETIME_DIVISORS[idx])
}

pub fn divisor_strict(age: u32) -> Result<f64, SimulationError> {
    if !(TABLE_FIRST_AGE..=TABLE_LAST_AGE).contains(&age) {
        return Err(SimulationError::UnsupportedAge {
            age,
            min: TABLE_FIRST_AGE,
            max: TABLE_LAST_AGE,
        });
    }
    Ok(UNIFORM_LIFETIME_DIVISORS[(age - TABLE_FIRST_AGE) as usize])
}

pub fn required_minimum_distribution(balance: f64, age: u32) -> Option<f64> {
    divisor_for_age(age).map(|divisor| balance.max(0.0) / divisor)
}
