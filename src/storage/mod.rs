mod json_file;
mod memory;
mod notify;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;
pub use notify::{ChangeFeed, ChangeNotifier, StoreChange};

use anyhow::Result;

use crate::models::{BudgetPeriod, CategoryAllocation, DateRange, Expense, Id, PeriodKey};

/// Expense records per user.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    /// Expenses of `user_id` dated within `range` (inclusive), in no particular order.
    async fn list_expenses(&self, user_id: &Id, range: DateRange) -> Result<Vec<Expense>>;
    async fn get_expense(&self, user_id: &Id, id: &Id) -> Result<Option<Expense>>;
    /// Fails if an expense with the same id already exists.
    async fn insert_expense(&self, expense: &Expense) -> Result<()>;
    /// Returns `false` when there is no such expense.
    async fn update_expense(&self, expense: &Expense) -> Result<bool>;
    async fn delete_expense(&self, user_id: &Id, id: &Id) -> Result<bool>;
}

/// Monthly budgets per user.
#[async_trait::async_trait]
pub trait BudgetStore: Send + Sync {
    async fn get_budget_period(
        &self,
        user_id: &Id,
        period: PeriodKey,
    ) -> Result<Option<BudgetPeriod>>;

    /// Upsert: the latest write wins.
    async fn save_budget_period(&self, budget: &BudgetPeriod) -> Result<()>;

    async fn list_category_allocations(
        &self,
        user_id: &Id,
        period: PeriodKey,
    ) -> Result<Vec<CategoryAllocation>>;

    /// Replaces the whole allocation set of a period. Categories missing from
    /// `allocations` are removed.
    async fn replace_category_allocations(
        &self,
        user_id: &Id,
        period: PeriodKey,
        allocations: &[CategoryAllocation],
    ) -> Result<()>;
}

fn check_allocation_scope(
    user_id: &Id,
    period: PeriodKey,
    allocations: &[CategoryAllocation],
) -> Result<()> {
    for allocation in allocations {
        if &allocation.user_id != user_id || allocation.period != period {
            anyhow::bail!(
                "Allocation for '{}' belongs to {}/{}, not {user_id}/{period}",
                allocation.category,
                allocation.user_id,
                allocation.period
            );
        }
        allocation.validate()?;
    }
    Ok(())
}
