#![allow(dead_code)]

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tallybook::engine::{AggregationEngine, EngineSettings};
use tallybook::models::{BudgetPeriod, CategoryAllocation, DateRange, Expense, Id, PeriodKey};
use tallybook::storage::{BudgetStore, ChangeFeed, LedgerStore, MemoryStorage, StoreChange};
use tokio::sync::broadcast;

pub fn d(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal")
}

pub fn day(y: i32, m: u32, dd: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, dd).expect("valid date")
}

pub fn period(s: &str) -> PeriodKey {
    s.parse().expect("valid period")
}

pub fn engine_over<S>(storage: &Arc<S>) -> AggregationEngine
where
    S: LedgerStore + BudgetStore + 'static,
{
    AggregationEngine::new(storage.clone(), storage.clone(), EngineSettings::default())
}

pub async fn seed_expense(
    ledger: &dyn LedgerStore,
    user: &Id,
    id: &str,
    date: NaiveDate,
    category: &str,
    amount: &str,
) -> Result<Expense> {
    let expense =
        Expense::new(user.clone(), date, d(amount), category)?.with_id(Id::from_string(id));
    ledger.insert_expense(&expense).await?;
    Ok(expense)
}

/// Saves a budget whose total is the sum of `lines`.
pub async fn seed_budget(
    budgets: &dyn BudgetStore,
    user: &Id,
    key: &str,
    lines: &[(&str, &str)],
) -> Result<()> {
    let key = period(key);
    let allocations = lines
        .iter()
        .map(|(category, amount)| CategoryAllocation::new(user.clone(), key, *category, d(amount)))
        .collect::<Result<Vec<_>, _>>()?;
    let total = allocations.iter().map(|a| a.allocated).sum();
    budgets
        .save_budget_period(&BudgetPeriod::new(user.clone(), key, total))
        .await?;
    budgets
        .replace_category_allocations(user, key, &allocations)
        .await?;
    Ok(())
}

/// Memory-backed store whose reads can be switched to fail.
#[derive(Default)]
pub struct FlakyStorage {
    pub inner: MemoryStorage,
    pub fail_ledger: AtomicBool,
    pub fail_budget: AtomicBool,
}

impl FlakyStorage {
    pub fn set_failing(&self, ledger: bool, budget: bool) {
        self.fail_ledger.store(ledger, Ordering::SeqCst);
        self.fail_budget.store(budget, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, store: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            anyhow::bail!("{store} backend offline");
        }
        Ok(())
    }
}

impl ChangeFeed for FlakyStorage {
    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.inner.subscribe()
    }
}

#[async_trait]
impl LedgerStore for FlakyStorage {
    async fn list_expenses(&self, user_id: &Id, range: DateRange) -> Result<Vec<Expense>> {
        Self::check(&self.fail_ledger, "ledger")?;
        self.inner.list_expenses(user_id, range).await
    }

    async fn get_expense(&self, user_id: &Id, id: &Id) -> Result<Option<Expense>> {
        Self::check(&self.fail_ledger, "ledger")?;
        self.inner.get_expense(user_id, id).await
    }

    async fn insert_expense(&self, expense: &Expense) -> Result<()> {
        self.inner.insert_expense(expense).await
    }

    async fn update_expense(&self, expense: &Expense) -> Result<bool> {
        self.inner.update_expense(expense).await
    }

    async fn delete_expense(&self, user_id: &Id, id: &Id) -> Result<bool> {
        self.inner.delete_expense(user_id, id).await
    }
}

#[async_trait]
impl BudgetStore for FlakyStorage {
    async fn get_budget_period(
        &self,
        user_id: &Id,
        period: PeriodKey,
    ) -> Result<Option<BudgetPeriod>> {
        Self::check(&self.fail_budget, "budget")?;
        self.inner.get_budget_period(user_id, period).await
    }

    async fn save_budget_period(&self, budget: &BudgetPeriod) -> Result<()> {
        self.inner.save_budget_period(budget).await
    }

    async fn list_category_allocations(
        &self,
        user_id: &Id,
        period: PeriodKey,
    ) -> Result<Vec<CategoryAllocation>> {
        Self::check(&self.fail_budget, "budget")?;
        self.inner.list_category_allocations(user_id, period).await
    }

    async fn replace_category_allocations(
        &self,
        user_id: &Id,
        period: PeriodKey,
        allocations: &[CategoryAllocation],
    ) -> Result<()> {
        self.inner
            .replace_category_allocations(user_id, period, allocations)
            .await
    }
}
