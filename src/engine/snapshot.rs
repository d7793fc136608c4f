use rust_decimal::Decimal;

use crate::models::{Id, PeriodKey};

use super::percent::{checked_sum, display_state, is_over_budget, percent_used};
use super::reconcile::CategoryLedger;
use super::{AggregationEngine, AggregationResult, EngineError};

impl AggregationEngine {
    /// Dashboard view of one calendar month.
    ///
    /// A user with no budget and no expenses gets an all-zero result.
    pub async fn compute_monthly_snapshot(
        &self,
        user_id: &Id,
        period: PeriodKey,
    ) -> Result<AggregationResult, EngineError> {
        let window = period.date_range();

        let budget = self.budget_period(user_id, period).await?;
        let allocations = self.allocations(user_id, period).await?;
        let expenses = self.expenses(user_id, window).await?;
        let prior_total = self.total_spent(user_id, period.previous().date_range()).await?;

        let total_allocated = budget.map(|b| b.total_allocated).unwrap_or(Decimal::ZERO);
        let total_spent = checked_sum(expenses.iter().map(|e| e.amount))?;

        let mut ledger = CategoryLedger::new(None);
        ledger.add_allocations(&allocations)?;
        ledger.add_expenses(&expenses)?;
        let per_category =
            ledger.into_summaries(&self.settings.catalog, self.settings.near_limit_percent);

        let percent = percent_used(total_spent, total_allocated);
        let result = AggregationResult {
            window,
            total_spent,
            total_allocated,
            percent_used: percent,
            over_budget: is_over_budget(total_spent, total_allocated),
            display_state: display_state(
                total_spent,
                total_allocated,
                percent,
                self.settings.near_limit_percent,
            ),
            expense_count: expenses.len(),
            per_category,
            trend: self.trend_between(prior_total, total_spent),
        };

        tracing::debug!(
            user_id = %user_id,
            period = %period,
            total_spent = %result.total_spent,
            total_allocated = %result.total_allocated,
            categories = result.per_category.len(),
            "Computed monthly snapshot"
        );
        Ok(result)
    }
}
