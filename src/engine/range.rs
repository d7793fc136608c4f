use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{CategoryKey, DateRange, Expense, Id, PeriodKey, ValidationError};

use super::percent::{
    add_to, checked_sum, display_state, is_over_budget, percent_used, round_cents,
};
use super::reconcile::CategoryLedger;
use super::{
    AggregationEngine, AggregationResult, EngineError, RangeReport, SeriesBucket, SeriesPoint,
    WeekStart,
};

impl AggregationEngine {
    /// Report over an inclusive custom range, optionally narrowed to one
    /// category.
    ///
    /// Allocations count in full for every month the range touches. The
    /// trend compares the first half of the range with the second half.
    pub async fn compute_range_report(
        &self,
        user_id: &Id,
        start: NaiveDate,
        end: NaiveDate,
        category_filter: Option<&str>,
    ) -> Result<RangeReport, EngineError> {
        let window = DateRange::new(start, end)?;
        let filter = match category_filter {
            Some(raw) => {
                let key = CategoryKey::new(raw);
                if key.is_blank() {
                    return Err(ValidationError::BlankCategory.into());
                }
                Some(key)
            }
            None => None,
        };

        let periods = PeriodKey::spanning(&window);
        let mut ledger = CategoryLedger::new(filter.clone());
        let mut budget_total = Decimal::ZERO;
        for period in &periods {
            if let Some(budget) = self.budget_period(user_id, *period).await? {
                add_to(&mut budget_total, budget.total_allocated)?;
            }
            ledger.add_allocations(&self.allocations(user_id, *period).await?)?;
        }

        let expenses: Vec<Expense> = self
            .expenses(user_id, window)
            .await?
            .into_iter()
            .filter(|e| {
                filter
                    .as_ref()
                    .map_or(true, |f| *f == CategoryLedger::key_for(&e.category))
            })
            .collect();
        ledger.add_expenses(&expenses)?;

        let total_allocated = if filter.is_some() {
            ledger.allocated_total()?
        } else {
            budget_total
        };
        let total_spent = checked_sum(expenses.iter().map(|e| e.amount))?;

        let daily_series = daily_series(window, &expenses)?;
        let weekly_series = weekly_series(window, &daily_series, self.settings.week_start)?;
        let (first_half, second_half) = half_totals(&daily_series)?;

        let per_category =
            ledger.into_summaries(&self.settings.catalog, self.settings.near_limit_percent);
        let percent = percent_used(total_spent, total_allocated);
        let day_count = window.day_count();

        let summary = AggregationResult {
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
            trend: self.trend_between(first_half, second_half),
        };

        tracing::debug!(
            user_id = %user_id,
            start = %start,
            end = %end,
            months = periods.len(),
            total_spent = %total_spent,
            "Computed range report"
        );

        Ok(RangeReport {
            summary,
            category_filter: category_filter.map(|raw| self.settings.catalog.resolve(raw)),
            day_count,
            daily_average: round_cents(total_spent / Decimal::from(day_count as u64)),
            daily_series,
            weekly_series,
        })
    }
}

/// Dense per-day totals; days without expenses are zero.
fn daily_series(window: DateRange, expenses: &[Expense]) -> Result<Vec<SeriesPoint>, EngineError> {
    let mut by_day: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for expense in expenses {
        add_to(by_day.entry(expense.date).or_insert(Decimal::ZERO), expense.amount)?;
    }
    Ok(window
        .days()
        .map(|date| SeriesPoint {
            date,
            amount: by_day.get(&date).copied().unwrap_or(Decimal::ZERO),
        })
        .collect())
}

fn weekly_series(
    window: DateRange,
    daily: &[SeriesPoint],
    week_start: WeekStart,
) -> Result<Vec<SeriesBucket>, EngineError> {
    let mut buckets: Vec<SeriesBucket> = Vec::new();
    for point in daily {
        let week = week_start.week_of(point.date);
        match buckets.last_mut() {
            Some(bucket) if week_start.week_of(bucket.start) == week => {
                add_to(&mut bucket.amount, point.amount)?;
            }
            _ => {
                let week_end = week + chrono::Duration::days(6);
                buckets.push(SeriesBucket {
                    start: week.max(window.start()),
                    end: week_end.min(window.end()),
                    amount: point.amount,
                });
            }
        }
    }
    Ok(buckets)
}

/// Sums of the leading and trailing `n / 2` days. An odd middle day sits in
/// neither half.
fn half_totals(daily: &[SeriesPoint]) -> Result<(Decimal, Decimal), EngineError> {
    let half = daily.len() / 2;
    let first = checked_sum(daily[..half].iter().map(|p| p.amount))?;
    let second = checked_sum(daily[daily.len() - half..].iter().map(|p| p.amount))?;
    Ok((first, second))
}
