use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::clock::{Clock, SystemClock};
use crate::config::ResolvedConfig;
use crate::engine::{AggregationEngine, CategorySummary, Trend};
use crate::format::MoneyFormat;
use crate::models::{parse_date, DateRange, Id, PeriodKey};

use super::types::{
    CategoryOutput, RangeReportOutput, SeriesBucketOutput, SeriesPointOutput, SnapshotOutput,
    TrendComparisonOutput, TrendOutput, WindowOutput,
};

fn format_ymd(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn window_output(window: &DateRange) -> WindowOutput {
    WindowOutput {
        start: format_ymd(window.start()),
        end: format_ymd(window.end()),
        day_count: window.day_count(),
    }
}

fn category_output(money: &MoneyFormat, line: &CategorySummary) -> CategoryOutput {
    CategoryOutput {
        category: line.category.clone(),
        spent: money.value(line.spent),
        allocated: money.value(line.allocated),
        remaining: money.value(line.allocated - line.spent),
        percent_used: line.percent_used,
        over_budget: line.over_budget,
        display_state: line.display_state,
        expense_count: line.expense_count,
        spent_display: money.optional_display(line.spent),
        allocated_display: money.optional_display(line.allocated),
    }
}

fn trend_output(money: &MoneyFormat, trend: &Trend) -> TrendOutput {
    TrendOutput {
        prior_total: money.value(trend.prior_total),
        current_total: money.value(trend.current_total),
        percent_change: trend.percent_change,
        direction: trend.direction,
    }
}

/// Parses `YYYY-MM`, defaulting to the month containing today.
pub(crate) fn resolve_period(period: Option<&str>, clock: &dyn Clock) -> Result<PeriodKey> {
    match period {
        Some(raw) => raw
            .parse::<PeriodKey>()
            .with_context(|| format!("Invalid period: {raw}")),
        None => Ok(clock.current_period()),
    }
}

pub async fn monthly_snapshot(
    engine: &AggregationEngine,
    config: &ResolvedConfig,
    user_id: &Id,
    period: Option<&str>,
) -> Result<SnapshotOutput> {
    monthly_snapshot_at(engine, config, user_id, period, &SystemClock).await
}

pub async fn monthly_snapshot_at(
    engine: &AggregationEngine,
    config: &ResolvedConfig,
    user_id: &Id,
    period: Option<&str>,
    clock: &dyn Clock,
) -> Result<SnapshotOutput> {
    let period = resolve_period(period, clock)?;
    let snapshot = engine
        .compute_monthly_snapshot(user_id, period)
        .await
        .with_context(|| format!("Failed to compute snapshot for {period}"))?;

    let money = MoneyFormat::from(&config.display);
    Ok(SnapshotOutput {
        user_id: user_id.to_string(),
        period: period.to_string(),
        window: window_output(&snapshot.window),
        total_spent: money.value(snapshot.total_spent),
        total_allocated: money.value(snapshot.total_allocated),
        remaining: money.value(snapshot.total_allocated - snapshot.total_spent),
        percent_used: snapshot.percent_used,
        over_budget: snapshot.over_budget,
        display_state: snapshot.display_state,
        expense_count: snapshot.expense_count,
        total_spent_display: money.optional_display(snapshot.total_spent),
        total_allocated_display: money.optional_display(snapshot.total_allocated),
        categories: snapshot
            .per_category
            .iter()
            .map(|line| category_output(&money, line))
            .collect(),
        trend: trend_output(&money, &snapshot.trend),
    })
}

pub async fn range_report(
    engine: &AggregationEngine,
    config: &ResolvedConfig,
    user_id: &Id,
    start: &str,
    end: &str,
    category: Option<&str>,
) -> Result<RangeReportOutput> {
    let start_date = parse_date(start).context("Invalid --start date")?;
    let end_date = parse_date(end).context("Invalid --end date")?;

    let report = engine
        .compute_range_report(user_id, start_date, end_date, category)
        .await
        .with_context(|| format!("Failed to compute report for {start}..{end}"))?;

    let money = MoneyFormat::from(&config.display);
    let summary = &report.summary;
    Ok(RangeReportOutput {
        user_id: user_id.to_string(),
        window: window_output(&summary.window),
        category: report.category_filter.clone(),
        total_spent: money.value(summary.total_spent),
        total_allocated: money.value(summary.total_allocated),
        percent_used: summary.percent_used,
        over_budget: summary.over_budget,
        display_state: summary.display_state,
        expense_count: summary.expense_count,
        daily_average: money.value(report.daily_average),
        total_spent_display: money.optional_display(summary.total_spent),
        categories: summary
            .per_category
            .iter()
            .map(|line| category_output(&money, line))
            .collect(),
        trend: trend_output(&money, &summary.trend),
        daily: report
            .daily_series
            .iter()
            .map(|p| SeriesPointOutput {
                date: format_ymd(p.date),
                amount: money.value(p.amount),
            })
            .collect(),
        weekly: report
            .weekly_series
            .iter()
            .map(|b| SeriesBucketOutput {
                start: format_ymd(b.start),
                end: format_ymd(b.end),
                amount: money.value(b.amount),
            })
            .collect(),
    })
}

pub async fn trend_comparison(
    engine: &AggregationEngine,
    config: &ResolvedConfig,
    user_id: &Id,
    period: Option<&str>,
) -> Result<TrendComparisonOutput> {
    trend_comparison_at(engine, config, user_id, period, &SystemClock).await
}

pub async fn trend_comparison_at(
    engine: &AggregationEngine,
    config: &ResolvedConfig,
    user_id: &Id,
    period: Option<&str>,
    clock: &dyn Clock,
) -> Result<TrendComparisonOutput> {
    let period = resolve_period(period, clock)?;
    let trend = engine
        .compute_trend_comparison(user_id, period)
        .await
        .with_context(|| format!("Failed to compare {period} with the previous month"))?;

    let money = MoneyFormat::from(&config.display);
    Ok(TrendComparisonOutput {
        user_id: user_id.to_string(),
        period: period.to_string(),
        prior_period: period.previous().to_string(),
        trend: trend_output(&money, &trend),
    })
}
