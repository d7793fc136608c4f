use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Rejected model input.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Expense amount must not be negative (got {0})")]
    NegativeAmount(Decimal),

    #[error("Allocation for '{category}' must not be negative (got {amount})")]
    NegativeAllocation { category: String, amount: Decimal },

    #[error("Amount {0} is larger than the supported maximum of {max}", max = super::MAX_AMOUNT)]
    AmountTooLarge(Decimal),

    #[error("Category name must not be blank")]
    BlankCategory,

    #[error("Invalid period key {0:?}: expected YYYY-MM")]
    InvalidPeriodKey(String),

    #[error("Invalid date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid range: end date {end} is before start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}
