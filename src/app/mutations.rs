use std::collections::HashSet;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use rust_decimal::Decimal;

use crate::clock::{Clock, SystemClock};
use crate::config::ResolvedConfig;
use crate::format::MoneyFormat;
use crate::models::{
    parse_date, BudgetPeriod, CategoryAllocation, CategoryKey, Expense, Id, IdGenerator,
    PeriodKey, UuidIdGenerator,
};
use crate::storage::{BudgetStore, LedgerStore};

use super::types::{AllocationOutput, BudgetOutput, ExpenseOutput};

/// Fields for adding or editing a ledger entry, as given on the command line.
///
/// For edits, `None` leaves the stored value alone and an empty `note` or
/// `receipt_ref` clears it.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFields {
    pub date: Option<String>,
    pub amount: Option<String>,
    pub category: Option<String>,
    pub note: Option<String>,
    pub receipt_ref: Option<String>,
}

fn parse_amount(label: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).with_context(|| format!("Invalid {label}: {raw}"))
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn expense_output(money: &MoneyFormat, expense: &Expense) -> ExpenseOutput {
    ExpenseOutput {
        id: expense.id.to_string(),
        date: expense.date.format("%Y-%m-%d").to_string(),
        amount: money.value(expense.amount),
        category: expense.category.clone(),
        note: expense.note.clone(),
        receipt_ref: expense.receipt_ref.clone(),
        recorded_at: expense
            .recorded_at
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

/// Catalog spelling for `raw`, warning when it is not a catalog category.
fn resolve_category(config: &ResolvedConfig, raw: &str) -> String {
    let settings = config.engine_settings();
    if settings.catalog.canonical(raw).is_none() {
        tracing::warn!(category = raw, "Category is not in the configured catalog");
    }
    settings.catalog.resolve(raw)
}

pub async fn add_expense(
    ledger: &dyn LedgerStore,
    config: &ResolvedConfig,
    user_id: &Id,
    fields: ExpenseFields,
) -> Result<serde_json::Value> {
    add_expense_with(ledger, config, user_id, fields, &UuidIdGenerator, &SystemClock).await
}

pub async fn add_expense_with(
    ledger: &dyn LedgerStore,
    config: &ResolvedConfig,
    user_id: &Id,
    fields: ExpenseFields,
    ids: &dyn IdGenerator,
    clock: &dyn Clock,
) -> Result<serde_json::Value> {
    let amount = parse_amount(
        "amount",
        fields.amount.as_deref().context("An amount is required")?,
    )?;
    let category = resolve_category(
        config,
        fields.category.as_deref().context("A category is required")?,
    );
    let date = match fields.date.as_deref() {
        Some(raw) => parse_date(raw).context("Invalid --date")?,
        None => clock.today(),
    };

    let mut expense =
        Expense::new_with_generator(ids, clock, user_id.clone(), date, amount, category)?;
    expense.note = fields.note.as_deref().and_then(non_empty);
    expense.receipt_ref = fields.receipt_ref.as_deref().and_then(non_empty);

    ledger
        .insert_expense(&expense)
        .await
        .context("Failed to record expense")?;

    let money = MoneyFormat::from(&config.display);
    Ok(serde_json::json!({
        "success": true,
        "expense": expense_output(&money, &expense),
    }))
}

pub async fn edit_expense(
    ledger: &dyn LedgerStore,
    config: &ResolvedConfig,
    user_id: &Id,
    id_str: &str,
    fields: ExpenseFields,
) -> Result<serde_json::Value> {
    let id =
        Id::from_string_checked(id_str).with_context(|| format!("Invalid expense id: {id_str}"))?;

    let Some(mut expense) = ledger.get_expense(user_id, &id).await? else {
        return Ok(serde_json::json!({
            "success": false,
            "error": "Expense not found",
            "id": id_str
        }));
    };

    if let Some(raw) = fields.date.as_deref() {
        expense.date = parse_date(raw).context("Invalid --date")?;
    }
    if let Some(raw) = fields.amount.as_deref() {
        expense.amount = parse_amount("amount", raw)?;
    }
    if let Some(raw) = fields.category.as_deref() {
        expense.category = resolve_category(config, raw);
    }
    if let Some(raw) = fields.note.as_deref() {
        expense.note = non_empty(raw);
    }
    if let Some(raw) = fields.receipt_ref.as_deref() {
        expense.receipt_ref = non_empty(raw);
    }
    expense.validate()?;

    if !ledger.update_expense(&expense).await? {
        anyhow::bail!("Expense disappeared while editing: {id_str}");
    }

    let money = MoneyFormat::from(&config.display);
    Ok(serde_json::json!({
        "success": true,
        "expense": expense_output(&money, &expense),
    }))
}

pub async fn remove_expense(
    ledger: &dyn LedgerStore,
    user_id: &Id,
    id_str: &str,
) -> Result<serde_json::Value> {
    let id =
        Id::from_string_checked(id_str).with_context(|| format!("Invalid expense id: {id_str}"))?;

    if !ledger.delete_expense(user_id, &id).await? {
        return Ok(serde_json::json!({
            "success": false,
            "error": "Expense not found",
            "id": id_str
        }));
    }

    Ok(serde_json::json!({
        "success": true,
        "id": id_str
    }))
}

/// Parses `NAME=AMOUNT`. The last `=` separates the two, so names may
/// contain `=`.
fn parse_allocation_arg(raw: &str) -> Result<(String, Decimal)> {
    let (name, amount) = raw
        .rsplit_once('=')
        .with_context(|| format!("Invalid allocation (expected NAME=AMOUNT): {raw}"))?;
    Ok((name.to_string(), parse_amount("allocation amount", amount)?))
}

/// Saves the total for `period` and replaces its category allocations with
/// exactly `allocations`.
pub async fn set_budget(
    budgets: &dyn BudgetStore,
    config: &ResolvedConfig,
    user_id: &Id,
    period: &str,
    total: &str,
    allocations: &[String],
) -> Result<BudgetOutput> {
    let period: PeriodKey = period
        .parse()
        .with_context(|| format!("Invalid period: {period}"))?;
    let total = parse_amount("total", total)?;
    if total.is_sign_negative() && !total.is_zero() {
        anyhow::bail!("Budget total must not be negative: {total}");
    }

    let settings = config.engine_settings();
    let mut seen: HashSet<CategoryKey> = HashSet::new();
    let mut lines = Vec::with_capacity(allocations.len());
    for raw in allocations {
        let (name, amount) = parse_allocation_arg(raw)?;
        let allocation = CategoryAllocation::new(
            user_id.clone(),
            period,
            settings.catalog.resolve(&name),
            amount,
        )?;
        if !seen.insert(allocation.category_key()) {
            anyhow::bail!("Category allocated twice: {}", allocation.category);
        }
        lines.push(allocation);
    }

    let allocated_to_categories: Decimal = lines.iter().map(|a| a.allocated).sum();
    if allocated_to_categories > total {
        tracing::warn!(
            period = %period,
            total = %total,
            allocated = %allocated_to_categories,
            "Category allocations exceed the budget total"
        );
    }

    let budget = BudgetPeriod::new(user_id.clone(), period, total);
    budget.validate()?;
    budgets
        .save_budget_period(&budget)
        .await
        .with_context(|| format!("Failed to save budget for {period}"))?;
    budgets
        .replace_category_allocations(user_id, period, &lines)
        .await
        .with_context(|| format!("Failed to save allocations for {period}"))?;

    let money = MoneyFormat::from(&config.display);
    Ok(BudgetOutput {
        user_id: user_id.to_string(),
        period: period.to_string(),
        total_allocated: money.value(total),
        allocations: lines
            .iter()
            .map(|a| AllocationOutput {
                category: a.category.clone(),
                allocated: money.value(a.allocated),
            })
            .collect(),
        allocated_to_categories: money.value(allocated_to_categories),
    })
}
