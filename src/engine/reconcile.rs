//! Merges allocations and expenses into one row per canonical category.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::models::{tidy, CategoryAllocation, CategoryCatalog, CategoryKey, Expense};

use super::percent::{add_to, checked_sum, display_state, is_over_budget, percent_used};
use super::types::CategorySummary;
use super::EngineError;

const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Default)]
struct Row {
    allocation_name: Option<String>,
    expense_name: Option<String>,
    allocated: Decimal,
    spent: Decimal,
    expense_count: usize,
}

/// Relevant category set for a window: every category with an allocation
/// plus every category with at least one expense.
pub(crate) struct CategoryLedger {
    filter: Option<CategoryKey>,
    rows: BTreeMap<CategoryKey, Row>,
}

impl CategoryLedger {
    pub(crate) fn new(filter: Option<CategoryKey>) -> Self {
        Self {
            filter,
            rows: BTreeMap::new(),
        }
    }

    /// Matching key for a stored name. Blank names count as uncategorized.
    pub(crate) fn key_for(raw: &str) -> CategoryKey {
        let key = CategoryKey::new(raw);
        if key.is_blank() {
            tracing::warn!("Blank category name in stored data; counting it as uncategorized");
            CategoryKey::new(UNCATEGORIZED)
        } else {
            key
        }
    }

    fn display_name(raw: &str) -> String {
        let name = tidy(raw);
        if name.is_empty() {
            UNCATEGORIZED.to_string()
        } else {
            name
        }
    }

    fn admits(&self, key: &CategoryKey) -> bool {
        self.filter.as_ref().map_or(true, |f| f == key)
    }

    /// Allocations for the same key add up, so multi-month windows see the
    /// sum of each month's amount.
    pub(crate) fn add_allocations(
        &mut self,
        allocations: &[CategoryAllocation],
    ) -> Result<(), EngineError> {
        let mut sorted: Vec<&CategoryAllocation> = allocations.iter().collect();
        sorted.sort_by(|a, b| a.period.cmp(&b.period).then_with(|| a.category.cmp(&b.category)));

        for allocation in sorted {
            let key = Self::key_for(&allocation.category);
            if !self.admits(&key) {
                continue;
            }
            let row = self.rows.entry(key).or_default();
            add_to(&mut row.allocated, allocation.allocated)?;
            if row.allocation_name.is_none() {
                row.allocation_name = Some(Self::display_name(&allocation.category));
            }
        }
        Ok(())
    }

    /// `expenses` must already be in (date, id) order.
    pub(crate) fn add_expenses(&mut self, expenses: &[Expense]) -> Result<(), EngineError> {
        for expense in expenses {
            let key = Self::key_for(&expense.category);
            if !self.admits(&key) {
                continue;
            }
            let row = self.rows.entry(key).or_default();
            add_to(&mut row.spent, expense.amount)?;
            row.expense_count += 1;
            if row.expense_name.is_none() {
                row.expense_name = Some(Self::display_name(&expense.category));
            }
        }
        Ok(())
    }

    pub(crate) fn allocated_total(&self) -> Result<Decimal, EngineError> {
        checked_sum(self.rows.values().map(|r| r.allocated))
    }

    pub(crate) fn into_summaries(
        self,
        catalog: &CategoryCatalog,
        near_limit_percent: u32,
    ) -> Vec<CategorySummary> {
        self.rows
            .into_iter()
            .map(|(key, row)| {
                let category = catalog
                    .canonical(key.as_str())
                    .map(str::to_string)
                    .or(row.allocation_name)
                    .or(row.expense_name)
                    .unwrap_or_else(|| key.to_string());
                let percent = percent_used(row.spent, row.allocated);
                CategorySummary {
                    category,
                    spent: row.spent,
                    allocated: row.allocated,
                    percent_used: percent,
                    over_budget: is_over_budget(row.spent, row.allocated),
                    display_state: display_state(
                        row.spent,
                        row.allocated,
                        percent,
                        near_limit_percent,
                    ),
                    expense_count: row.expense_count,
                }
            })
            .collect()
    }
}

/// Sorts expenses so reconciliation never depends on store order.
pub(crate) fn in_ledger_order(mut expenses: Vec<Expense>) -> Vec<Expense> {
    expenses.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
    expenses
}
