//! In-memory storage implementation for tests and embedded use.

use std::collections::HashMap;

use anyhow::Result;
use tokio::sync::{broadcast, Mutex};

use crate::models::{BudgetPeriod, CategoryAllocation, DateRange, Expense, Id, PeriodKey};

use super::{
    check_allocation_scope, BudgetStore, ChangeFeed, ChangeNotifier, LedgerStore, StoreChange,
};

/// Ledger and budget store held in process memory.
pub struct MemoryStorage {
    expenses: Mutex<HashMap<Id, HashMap<Id, Expense>>>,
    budgets: Mutex<HashMap<(Id, PeriodKey), BudgetPeriod>>,
    allocations: Mutex<HashMap<(Id, PeriodKey), Vec<CategoryAllocation>>>,
    notifier: ChangeNotifier,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            expenses: Mutex::new(HashMap::new()),
            budgets: Mutex::new(HashMap::new()),
            allocations: Mutex::new(HashMap::new()),
            notifier: ChangeNotifier::new(),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed for MemoryStorage {
    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.notifier.subscribe()
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryStorage {
    async fn list_expenses(&self, user_id: &Id, range: DateRange) -> Result<Vec<Expense>> {
        let expenses = self.expenses.lock().await;
        Ok(expenses
            .get(user_id)
            .map(|by_id| {
                by_id
                    .values()
                    .filter(|e| range.contains(e.date))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_expense(&self, user_id: &Id, id: &Id) -> Result<Option<Expense>> {
        let expenses = self.expenses.lock().await;
        Ok(expenses.get(user_id).and_then(|by_id| by_id.get(id)).cloned())
    }

    async fn insert_expense(&self, expense: &Expense) -> Result<()> {
        expense.validate()?;
        {
            let mut expenses = self.expenses.lock().await;
            let by_id = expenses.entry(expense.user_id.clone()).or_default();
            if by_id.contains_key(&expense.id) {
                anyhow::bail!("Expense already exists: {}", expense.id);
            }
            by_id.insert(expense.id.clone(), expense.clone());
        }
        self.notifier.notify(StoreChange::ExpensesChanged {
            user_id: expense.user_id.clone(),
            dates: vec![expense.date],
        });
        Ok(())
    }

    async fn update_expense(&self, expense: &Expense) -> Result<bool> {
        expense.validate()?;
        let previous = {
            let mut expenses = self.expenses.lock().await;
            match expenses
                .get_mut(&expense.user_id)
                .and_then(|by_id| by_id.get_mut(&expense.id))
            {
                Some(existing) => std::mem::replace(existing, expense.clone()),
                None => return Ok(false),
            }
        };
        let mut dates = vec![previous.date];
        if expense.date != previous.date {
            dates.push(expense.date);
        }
        self.notifier.notify(StoreChange::ExpensesChanged {
            user_id: expense.user_id.clone(),
            dates,
        });
        Ok(true)
    }

    async fn delete_expense(&self, user_id: &Id, id: &Id) -> Result<bool> {
        let removed = {
            let mut expenses = self.expenses.lock().await;
            expenses.get_mut(user_id).and_then(|by_id| by_id.remove(id))
        };
        match removed {
            Some(expense) => {
                self.notifier.notify(StoreChange::ExpensesChanged {
                    user_id: user_id.clone(),
                    dates: vec![expense.date],
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait::async_trait]
impl BudgetStore for MemoryStorage {
    async fn get_budget_period(
        &self,
        user_id: &Id,
        period: PeriodKey,
    ) -> Result<Option<BudgetPeriod>> {
        let budgets = self.budgets.lock().await;
        Ok(budgets.get(&(user_id.clone(), period)).cloned())
    }

    async fn save_budget_period(&self, budget: &BudgetPeriod) -> Result<()> {
        {
            let mut budgets = self.budgets.lock().await;
            budgets.insert((budget.user_id.clone(), budget.period), budget.clone());
        }
        self.notifier.notify(StoreChange::BudgetChanged {
            user_id: budget.user_id.clone(),
            period: budget.period,
        });
        Ok(())
    }

    async fn list_category_allocations(
        &self,
        user_id: &Id,
        period: PeriodKey,
    ) -> Result<Vec<CategoryAllocation>> {
        let allocations = self.allocations.lock().await;
        Ok(allocations
            .get(&(user_id.clone(), period))
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_category_allocations(
        &self,
        user_id: &Id,
        period: PeriodKey,
        allocations: &[CategoryAllocation],
    ) -> Result<()> {
        check_allocation_scope(user_id, period, allocations)?;
        {
            let mut stored = self.allocations.lock().await;
            stored.insert((user_id.clone(), period), allocations.to_vec());
        }
        self.notifier.notify(StoreChange::BudgetChanged {
            user_id: user_id.clone(),
            period,
        });
        Ok(())
    }
}
