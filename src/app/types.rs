use serde::Serialize;

use crate::engine::{DisplayState, PercentChange, TrendDirection};

/// JSON output for the window an aggregate covers
#[derive(Debug, Serialize)]
pub struct WindowOutput {
    pub start: String,
    pub end: String,
    pub day_count: usize,
}

/// JSON output for one reconciled category line
#[derive(Debug, Serialize)]
pub struct CategoryOutput {
    pub category: String,
    pub spent: String,
    pub allocated: String,
    /// Negative once the category is overspent.
    pub remaining: String,
    pub percent_used: u32,
    pub over_budget: bool,
    pub display_state: DisplayState,
    pub expense_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spent_display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocated_display: Option<String>,
}

/// JSON output for a spending comparison
#[derive(Debug, Serialize)]
pub struct TrendOutput {
    pub prior_total: String,
    pub current_total: String,
    pub percent_change: PercentChange,
    pub direction: TrendDirection,
}

/// JSON output for the monthly dashboard
#[derive(Debug, Serialize)]
pub struct SnapshotOutput {
    pub user_id: String,
    pub period: String,
    pub window: WindowOutput,
    pub total_spent: String,
    pub total_allocated: String,
    pub remaining: String,
    pub percent_used: u32,
    pub over_budget: bool,
    pub display_state: DisplayState,
    pub expense_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_spent_display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_allocated_display: Option<String>,
    pub categories: Vec<CategoryOutput>,
    /// Against the previous calendar month.
    pub trend: TrendOutput,
}

#[derive(Debug, Serialize)]
pub struct SeriesPointOutput {
    pub date: String,
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct SeriesBucketOutput {
    pub start: String,
    pub end: String,
    pub amount: String,
}

/// JSON output for a custom-range report
#[derive(Debug, Serialize)]
pub struct RangeReportOutput {
    pub user_id: String,
    pub window: WindowOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub total_spent: String,
    pub total_allocated: String,
    pub percent_used: u32,
    pub over_budget: bool,
    pub display_state: DisplayState,
    pub expense_count: usize,
    pub daily_average: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_spent_display: Option<String>,
    pub categories: Vec<CategoryOutput>,
    /// First half of the range against the second half.
    pub trend: TrendOutput,
    pub daily: Vec<SeriesPointOutput>,
    pub weekly: Vec<SeriesBucketOutput>,
}

/// JSON output for a month-over-month comparison
#[derive(Debug, Serialize)]
pub struct TrendComparisonOutput {
    pub user_id: String,
    pub period: String,
    pub prior_period: String,
    #[serde(flatten)]
    pub trend: TrendOutput,
}

/// JSON output for a ledger entry
#[derive(Debug, Serialize)]
pub struct ExpenseOutput {
    pub id: String,
    pub date: String,
    pub amount: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_ref: Option<String>,
    pub recorded_at: String,
}

/// JSON output for one saved allocation
#[derive(Debug, Serialize)]
pub struct AllocationOutput {
    pub category: String,
    pub allocated: String,
}

/// JSON output for a saved budget
#[derive(Debug, Serialize)]
pub struct BudgetOutput {
    pub user_id: String,
    pub period: String,
    pub total_allocated: String,
    pub allocations: Vec<AllocationOutput>,
    /// Sum of the category allocations; may differ from the total.
    pub allocated_to_categories: String,
}
