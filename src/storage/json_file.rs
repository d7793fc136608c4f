use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, Mutex};

use crate::models::{BudgetPeriod, CategoryAllocation, DateRange, Expense, Id, PeriodKey};

use super::{
    check_allocation_scope, BudgetStore, ChangeFeed, ChangeNotifier, LedgerStore, StoreChange,
};

/// One line of a user's expense log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum LedgerRecord {
    Put { expense: Expense },
    Delete { id: Id },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BudgetFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    budget: Option<BudgetPeriod>,
    #[serde(default)]
    allocations: Vec<CategoryAllocation>,
}

/// JSON file-based storage implementation.
///
/// Directory structure:
/// ```text
/// data/
///   users/
///     {user_id}/
///       expenses.jsonl      append-only put/delete log, last write wins
///       budgets/
///         {YYYY-MM}.json    period total + full allocation set
/// ```
pub struct JsonFileStorage {
    base_path: PathBuf,
    write_lock: Mutex<()>,
    notifier: ChangeNotifier,
}

impl JsonFileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
            notifier: ChangeNotifier::new(),
        }
    }

    fn user_dir(&self, user_id: &Id) -> Result<PathBuf> {
        if !Id::is_path_safe(user_id.as_str()) {
            anyhow::bail!("User id is not a safe path segment: {user_id:?}");
        }
        Ok(self.base_path.join("users").join(user_id.as_str()))
    }

    fn expenses_file(&self, user_id: &Id) -> Result<PathBuf> {
        Ok(self.user_dir(user_id)?.join("expenses.jsonl"))
    }

    fn budget_file(&self, user_id: &Id, period: PeriodKey) -> Result<PathBuf> {
        Ok(self
            .user_dir(user_id)?
            .join("budgets")
            .join(format!("{period}.json")))
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        Ok(())
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {}", path.display()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Writes through a temp file so readers never see a half-written budget.
    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        self.ensure_dir(path).await?;
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    async fn read_ledger(&self, user_id: &Id) -> Result<Vec<Expense>> {
        let path = self.expenses_file(user_id)?;
        let file = match fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", path.display()))
            }
        };

        let mut lines = BufReader::new(file).lines();
        let mut by_id: HashMap<Id, usize> = HashMap::new();
        let mut slots: Vec<Option<Expense>> = Vec::new();

        while let Some(line) = lines.next_line().await.context("Failed to read line")? {
            if line.trim().is_empty() {
                continue;
            }
            let record: LedgerRecord = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse ledger line: {line}"))?;
            match record {
                LedgerRecord::Put { expense } => match by_id.get(&expense.id).copied() {
                    Some(idx) => slots[idx] = Some(expense),
                    None => {
                        by_id.insert(expense.id.clone(), slots.len());
                        slots.push(Some(expense));
                    }
                },
                LedgerRecord::Delete { id } => {
                    if let Some(idx) = by_id.get(&id).copied() {
                        slots[idx] = None;
                    }
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }

    async fn append_record(&self, user_id: &Id, record: &LedgerRecord) -> Result<()> {
        let path = self.expenses_file(user_id)?;
        self.ensure_dir(&path).await?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {} for append", path.display()))?;

        let mut line = serde_json::to_string(record).context("Failed to serialize record")?;
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read_budget_file(&self, user_id: &Id, period: PeriodKey) -> Result<BudgetFile> {
        let path = self.budget_file(user_id, period)?;
        Ok(self.read_json(&path).await?.unwrap_or_default())
    }
}

impl ChangeFeed for JsonFileStorage {
    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.notifier.subscribe()
    }
}

#[async_trait::async_trait]
impl LedgerStore for JsonFileStorage {
    async fn list_expenses(&self, user_id: &Id, range: DateRange) -> Result<Vec<Expense>> {
        let mut expenses = self.read_ledger(user_id).await?;
        expenses.retain(|e| range.contains(e.date));
        Ok(expenses)
    }

    async fn get_expense(&self, user_id: &Id, id: &Id) -> Result<Option<Expense>> {
        Ok(self
            .read_ledger(user_id)
            .await?
            .into_iter()
            .find(|e| &e.id == id))
    }

    async fn insert_expense(&self, expense: &Expense) -> Result<()> {
        expense.validate()?;
        let _guard = self.write_lock.lock().await;
        if self.get_expense(&expense.user_id, &expense.id).await?.is_some() {
            anyhow::bail!("Expense already exists: {}", expense.id);
        }
        self.append_record(
            &expense.user_id,
            &LedgerRecord::Put {
                expense: expense.clone(),
            },
        )
        .await?;
        self.notifier.notify(StoreChange::ExpensesChanged {
            user_id: expense.user_id.clone(),
            dates: vec![expense.date],
        });
        Ok(())
    }

    async fn update_expense(&self, expense: &Expense) -> Result<bool> {
        expense.validate()?;
        let _guard = self.write_lock.lock().await;
        let Some(previous) = self.get_expense(&expense.user_id, &expense.id).await? else {
            return Ok(false);
        };
        self.append_record(
            &expense.user_id,
            &LedgerRecord::Put {
                expense: expense.clone(),
            },
        )
        .await?;
        let mut dates = vec![previous.date];
        if previous.date != expense.date {
            dates.push(expense.date);
        }
        self.notifier.notify(StoreChange::ExpensesChanged {
            user_id: expense.user_id.clone(),
            dates,
        });
        Ok(true)
    }

    async fn delete_expense(&self, user_id: &Id, id: &Id) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let Some(previous) = self.get_expense(user_id, id).await? else {
            return Ok(false);
        };
        self.append_record(user_id, &LedgerRecord::Delete { id: id.clone() })
            .await?;
        self.notifier.notify(StoreChange::ExpensesChanged {
            user_id: user_id.clone(),
            dates: vec![previous.date],
        });
        Ok(true)
    }
}

#[async_trait::async_trait]
impl BudgetStore for JsonFileStorage {
    async fn get_budget_period(
        &self,
        user_id: &Id,
        period: PeriodKey,
    ) -> Result<Option<BudgetPeriod>> {
        Ok(self.read_budget_file(user_id, period).await?.budget)
    }

    async fn save_budget_period(&self, budget: &BudgetPeriod) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.read_budget_file(&budget.user_id, budget.period).await?;
        file.budget = Some(budget.clone());
        let path = self.budget_file(&budget.user_id, budget.period)?;
        self.write_json(&path, &file).await?;
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
        Ok(self.read_budget_file(user_id, period).await?.allocations)
    }

    async fn replace_category_allocations(
        &self,
        user_id: &Id,
        period: PeriodKey,
        allocations: &[CategoryAllocation],
    ) -> Result<()> {
        check_allocation_scope(user_id, period, allocations)?;
        let _guard = self.write_lock.lock().await;
        let mut file = self.read_budget_file(user_id, period).await?;
        file.allocations = allocations.to_vec();
        let path = self.budget_file(user_id, period)?;
        self.write_json(&path, &file).await?;
        self.notifier.notify(StoreChange::BudgetChanged {
            user_id: user_id.clone(),
            period,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn user() -> Id {
        Id::from_string("user-1")
    }

    fn expense(id: &str, day: u32, amount: i64) -> Expense {
        Expense::new(
            user(),
            NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            Decimal::new(amount, 2),
            "Food",
        )
        .unwrap()
        .with_id(Id::from_string(id))
    }

    fn march() -> DateRange {
        "2024-03".parse::<PeriodKey>().unwrap().date_range()
    }

    #[tokio::test]
    async fn ledger_replays_puts_and_deletes() -> Result<()> {
        let dir = TempDir::new()?;
        let storage = JsonFileStorage::new(dir.path());

        storage.insert_expense(&expense("a", 1, 1000)).await?;
        storage.insert_expense(&expense("b", 2, 2000)).await?;
        assert!(storage.update_expense(&expense("a", 1, 1500)).await?);
        assert!(storage.delete_expense(&user(), &Id::from_string("b")).await?);

        let listed = storage.list_expenses(&user(), march()).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].amount, Decimal::new(1500, 2));

        // A fresh handle over the same directory sees the same state.
        let reopened = JsonFileStorage::new(dir.path());
        assert_eq!(reopened.list_expenses(&user(), march()).await?, listed);
        Ok(())
    }

    #[tokio::test]
    async fn deleted_ids_can_be_reinserted() -> Result<()> {
        let dir = TempDir::new()?;
        let storage = JsonFileStorage::new(dir.path());

        storage.insert_expense(&expense("a", 1, 1000)).await?;
        storage.delete_expense(&user(), &Id::from_string("a")).await?;
        storage.insert_expense(&expense("a", 3, 700)).await?;

        let got = storage.get_expense(&user(), &Id::from_string("a")).await?;
        assert_eq!(got.map(|e| e.amount), Some(Decimal::new(700, 2)));
        Ok(())
    }

    #[tokio::test]
    async fn budget_total_and_allocations_are_saved_independently() -> Result<()> {
        let dir = TempDir::new()?;
        let storage = JsonFileStorage::new(dir.path());
        let period: PeriodKey = "2024-03".parse()?;

        let food = CategoryAllocation::new(user(), period, "Food", Decimal::new(10000, 2))?;
        storage
            .replace_category_allocations(&user(), period, &[food.clone()])
            .await?;
        storage
            .save_budget_period(&BudgetPeriod::new(user(), period, Decimal::new(50000, 2)))
            .await?;

        assert_eq!(
            storage.list_category_allocations(&user(), period).await?,
            vec![food]
        );
        assert_eq!(
            storage
                .get_budget_period(&user(), period)
                .await?
                .map(|b| b.total_allocated),
            Some(Decimal::new(50000, 2))
        );
        Ok(())
    }

    #[tokio::test]
    async fn replacing_allocations_drops_omitted_categories() -> Result<()> {
        let dir = TempDir::new()?;
        let storage = JsonFileStorage::new(dir.path());
        let period: PeriodKey = "2024-03".parse()?;
        let food = CategoryAllocation::new(user(), period, "Food", Decimal::new(10000, 2))?;
        let rent = CategoryAllocation::new(user(), period, "Rent", Decimal::new(90000, 2))?;

        storage
            .replace_category_allocations(&user(), period, &[food.clone(), rent])
            .await?;
        storage
            .replace_category_allocations(&user(), period, &[food.clone()])
            .await?;

        let reopened = JsonFileStorage::new(dir.path());
        assert_eq!(
            reopened.list_category_allocations(&user(), period).await?,
            vec![food]
        );
        Ok(())
    }

    #[tokio::test]
    async fn rejects_unsafe_user_ids() -> Result<()> {
        let dir = TempDir::new()?;
        let storage = JsonFileStorage::new(dir.path());
        let err = storage
            .list_expenses(&Id::from_string("../escape"), march())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("safe path segment"));
        Ok(())
    }
}
