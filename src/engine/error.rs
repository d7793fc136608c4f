use chrono::NaiveDate;

use crate::models::ValidationError;

/// Failures surfaced by the aggregation engine.
///
/// Missing data is never an error; it aggregates to zeros.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid range: end date {end} is before start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid period key {0:?}: expected YYYY-MM")]
    InvalidPeriodKey(String),

    #[error("Invalid input: {0}")]
    InvalidInput(ValidationError),

    /// Stored amounts whose total does not fit in a decimal.
    #[error("Stored amounts are too large to total")]
    AmountOverflow,

    /// The backing store failed. Retrying is up to the store.
    #[error("{store} store unavailable")]
    StoreUnavailable {
        store: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl EngineError {
    pub fn is_validation(&self) -> bool {
        !matches!(self, EngineError::StoreUnavailable { .. })
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidRange { start, end } => {
                EngineError::InvalidRange { start, end }
            }
            ValidationError::InvalidPeriodKey(key) => EngineError::InvalidPeriodKey(key),
            other => EngineError::InvalidInput(other),
        }
    }
}
