pub const CATCH_UP_AGE: u32 = 50;

/// IRS elective deferral limits for a reference year, escalated linearly so
/// any future calendar year can be looked up without a stored table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContributionLimits {
    pub reference_year: i32,
    pub base_limit: f64,
    pub base_annual_increment: f64,
    pub catch_up_limit: f64,
    pub catch_up_annual_increment: f64,
}

impl ContributionLimits {
    pub const IRS_2024: Self = Self {
        reference_year: 2024,
        base_limit: 23_000.0,
        base_annual_increment: 500.0,
        catch_up_limit: 7_500.0,
        catch_up_annual_increment: 0.0,
    };

    // Years before the reference year keep the reference figures.
    fn years_from_reference(&self, year: i32) -> f64 {
        (year - self.reference_year).max(0) as f64
    }

    pub fn base_for_year(&self, year: i32) -> f64 {
        self.base_limit + self.base_annual_increment * self.years_from_reference(year)
    }

    pub fn catch_up_for_year(&self, year: i32) -> f64 {
        self.catch_up_limit + self.catch_up_annual_increment * self.years_from_reference(year)
    }

    pub fn limit_for(&self, year: i32, age: u32) -> f64 {
        let base = self.base_for_year(year);
        if age >= CATCH_UP_AGE {
            base + self.catch_up_for_year(year)
        } else {
            base
        }
    }
}

impl Default for ContributionLimits {
    fn default() -> Self {
        Self::IRS_2024
    }
}
