//! Budget and spending aggregation.
//!
//! [`AggregationEngine`] turns raw ledger and budget data into display-ready
//! rollups: the monthly dashboard snapshot, custom-range reports with dense
//! daily and weekly series, and month-over-month trends. It holds no mutable
//! state; every call reads the stores afresh, so concurrent calls for any
//! users are independent and a newer call simply supersedes an older one.

mod error;
pub mod percent;
mod range;
mod reconcile;
mod snapshot;
mod trend;
mod types;

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{
    BudgetPeriod, CategoryAllocation, CategoryCatalog, DateRange, Expense, Id, PeriodKey,
};
use crate::storage::{BudgetStore, LedgerStore};

pub use error::EngineError;
pub use types::{
    AggregationResult, CategorySummary, DisplayState, PercentChange, RangeReport, SeriesBucket,
    SeriesPoint, Trend, TrendDirection,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    Sunday,
    Monday,
}

impl WeekStart {
    /// First day of the week containing `date`.
    pub fn week_of(self, date: NaiveDate) -> NaiveDate {
        let wd = date.weekday();
        let offset = match self {
            WeekStart::Sunday => wd.num_days_from_sunday() as i64,
            WeekStart::Monday => wd.num_days_from_monday() as i64,
        };
        date - chrono::Duration::days(offset)
    }
}

/// Tunables for presentation thresholds.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Percent used at which a line turns `near-limit`.
    pub near_limit_percent: u32,
    /// Fractional tolerance for trend direction (0.1 = 10%).
    pub trend_deadband: Decimal,
    pub week_start: WeekStart,
    pub catalog: CategoryCatalog,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            near_limit_percent: 80,
            trend_deadband: Decimal::new(1, 1),
            week_start: WeekStart::Monday,
            catalog: CategoryCatalog::default(),
        }
    }
}

/// Stateless reporting layer over a ledger store and a budget store.
#[derive(Clone)]
pub struct AggregationEngine {
    ledger: Arc<dyn LedgerStore>,
    budgets: Arc<dyn BudgetStore>,
    settings: EngineSettings,
}

impl AggregationEngine {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        budgets: Arc<dyn BudgetStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            ledger,
            budgets,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    async fn expenses(&self, user_id: &Id, range: DateRange) -> Result<Vec<Expense>, EngineError> {
        let expenses = self
            .ledger
            .list_expenses(user_id, range)
            .await
            .map_err(|source| EngineError::StoreUnavailable {
                store: "ledger",
                source,
            })?;
        // Stores are asked for the range, but only in-range days may count.
        Ok(reconcile::in_ledger_order(
            expenses
                .into_iter()
                .filter(|e| range.contains(e.date))
                .collect(),
        ))
    }

    async fn budget_period(
        &self,
        user_id: &Id,
        period: PeriodKey,
    ) -> Result<Option<BudgetPeriod>, EngineError> {
        self.budgets
            .get_budget_period(user_id, period)
            .await
            .map_err(|source| EngineError::StoreUnavailable {
                store: "budget",
                source,
            })
    }

    async fn allocations(
        &self,
        user_id: &Id,
        period: PeriodKey,
    ) -> Result<Vec<CategoryAllocation>, EngineError> {
        self.budgets
            .list_category_allocations(user_id, period)
            .await
            .map_err(|source| EngineError::StoreUnavailable {
                store: "budget",
                source,
            })
    }

    async fn total_spent(&self, user_id: &Id, range: DateRange) -> Result<Decimal, EngineError> {
        percent::checked_sum(self.expenses(user_id, range).await?.iter().map(|e| e.amount))
    }

    fn trend_between(&self, prior: Decimal, current: Decimal) -> Trend {
        Trend {
            prior_total: prior,
            current_total: current,
            percent_change: percent::percent_change(prior, current),
            direction: percent::trend_direction(prior, current, self.settings.trend_deadband),
        }
    }
}
