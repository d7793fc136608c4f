use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::DateRange;

/// How a budget line should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayState {
    /// Nothing (or zero) was allocated.
    NoBudgetSet,
    OnTrack,
    /// At or above the configured warning percentage, not yet over.
    NearLimit,
    OverBudget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Stable,
    Falling,
}

/// Relative change between two totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum PercentChange {
    /// Whole percent, rounded half away from zero. Negative when spending fell.
    Percent(Decimal),
    /// The prior total was zero and the current one is not.
    IncreaseFromZero,
    /// Both totals were zero.
    NoChange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    pub prior_total: Decimal,
    pub current_total: Decimal,
    pub percent_change: PercentChange,
    pub direction: TrendDirection,
}

/// Spent-vs-allocated for one reconciled category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub spent: Decimal,
    pub allocated: Decimal,
    /// Clamped to 0..=100 for progress bars; see `over_budget` for overspend.
    pub percent_used: u32,
    pub over_budget: bool,
    pub display_state: DisplayState,
    pub expense_count: usize,
}

/// Spending against budget over a window. Always derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub window: DateRange,
    pub total_spent: Decimal,
    pub total_allocated: Decimal,
    pub percent_used: u32,
    pub over_budget: bool,
    pub display_state: DisplayState,
    pub expense_count: usize,
    pub per_category: Vec<CategorySummary>,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub amount: Decimal,
}

/// A week of spending, clipped to the report range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesBucket {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeReport {
    pub summary: AggregationResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_filter: Option<String>,
    pub day_count: usize,
    /// `total_spent / day_count`, rounded half-up to cents.
    pub daily_average: Decimal,
    /// One point per day in the range, zero-filled.
    pub daily_series: Vec<SeriesPoint>,
    pub weekly_series: Vec<SeriesBucket>,
}
