mod config;
mod mutations;
mod report;
mod types;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::ResolvedConfig;
use crate::engine::AggregationEngine;
use crate::models::Id;
use crate::storage::JsonFileStorage;

pub use config::config_output;
pub use mutations::{
    add_expense, add_expense_with, edit_expense, remove_expense, set_budget, ExpenseFields,
};
pub use report::{
    monthly_snapshot, monthly_snapshot_at, range_report, trend_comparison, trend_comparison_at,
};
pub use types::{
    AllocationOutput, BudgetOutput, CategoryOutput, ExpenseOutput, RangeReportOutput,
    SeriesBucketOutput, SeriesPointOutput, SnapshotOutput, TrendComparisonOutput, TrendOutput,
    WindowOutput,
};

/// The user a command acts on: `--user` if given, else `default_user`.
pub fn resolve_user(config: &ResolvedConfig, user: Option<&str>) -> Result<Id> {
    let raw = user
        .or(config.default_user.as_deref())
        .context("No user given; pass --user or set default_user in the config file")?;
    Id::from_string_checked(raw).with_context(|| format!("Invalid user id: {raw}"))
}

/// File-backed storage under the configured data directory and an engine
/// reading from it.
pub fn open(config: &ResolvedConfig) -> (Arc<JsonFileStorage>, AggregationEngine) {
    let storage = Arc::new(JsonFileStorage::new(&config.data_dir));
    let engine =
        AggregationEngine::new(storage.clone(), storage.clone(), config.engine_settings());
    (storage, engine)
}
