use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// A parameter is malformed or outside its valid range. Raised before any
    /// year is simulated.
    #[error("invalid input: {field} {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// Strict Uniform Lifetime Table lookup outside the published ages.
    #[error("unsupported age {age}: uniform lifetime table covers {min}..={max}")]
    UnsupportedAge { age: u32, min: u32, max: u32 },
}

impl SimulationError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}
