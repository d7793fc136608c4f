mod support;

use std::sync::Arc;

use anyhow::Result;
use rust_decimal::Decimal;
use support::{d, day, engine_over, period, seed_budget, seed_expense};
use tallybook::engine::{DisplayState, EngineError, TrendDirection};
use tallybook::models::Id;
use tallybook::storage::{JsonFileStorage, LedgerStore};
use tempfile::TempDir;

/// Writes a ledger for `alex` directly, bypassing store validation.
async fn write_raw_ledger(dir: &TempDir, rows: &[(&str, &str, &str, String)]) -> Result<()> {
    let user_dir = dir.path().join("users").join("alex");
    tokio::fs::create_dir_all(&user_dir).await?;
    let mut content = String::new();
    for (id, date, category, amount) in rows {
        let record = serde_json::json!({
            "op": "put",
            "expense": {
                "id": id,
                "user_id": "alex",
                "date": date,
                "recorded_at": "2024-05-01T00:00:00Z",
                "amount": amount,
                "category": category,
            }
        });
        content.push_str(&record.to_string());
        content.push('\n');
    }
    tokio::fs::write(user_dir.join("expenses.jsonl"), content).await?;
    Ok(())
}

#[tokio::test]
async fn engine_reads_budgets_and_expenses_from_disk() -> Result<()> {
    let dir = TempDir::new()?;
    let user = Id::from_string("alex");
    {
        let storage = JsonFileStorage::new(dir.path());
        seed_budget(&storage, &user, "2024-05", &[("Food", "200"), ("Transport", "60")]).await?;
        seed_expense(&storage, &user, "a", day(2024, 5, 2), "Food", "150.00").await?;
        seed_expense(&storage, &user, "b", day(2024, 5, 9), "Transport", "61.00").await?;
    }

    // A fresh handle sees the same data.
    let storage = Arc::new(JsonFileStorage::new(dir.path()));
    let snap = engine_over(&storage)
        .compute_monthly_snapshot(&user, period("2024-05"))
        .await?;

    assert_eq!(snap.total_spent, d("211.00"));
    assert_eq!(snap.total_allocated, d("260"));
    assert_eq!(snap.display_state, DisplayState::NearLimit);

    let food = snap.per_category.iter().find(|c| c.category == "Food").unwrap();
    assert_eq!(food.percent_used, 75);
    assert_eq!(food.display_state, DisplayState::OnTrack);

    let transport = snap
        .per_category
        .iter()
        .find(|c| c.category == "Transport")
        .unwrap();
    assert!(transport.over_budget);
    assert_eq!(transport.display_state, DisplayState::OverBudget);
    Ok(())
}

#[tokio::test]
async fn edits_and_deletes_survive_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let user = Id::from_string("alex");
    let storage = JsonFileStorage::new(dir.path());

    let mut expense = seed_expense(&storage, &user, "a", day(2024, 5, 2), "Food", "10").await?;
    seed_expense(&storage, &user, "b", day(2024, 5, 3), "Food", "20").await?;
    expense.amount = d("12.50");
    expense.date = day(2024, 6, 1);
    assert!(storage.update_expense(&expense).await?);
    assert!(storage.delete_expense(&user, &Id::from_string("b")).await?);

    let reopened = Arc::new(JsonFileStorage::new(dir.path()));
    let engine = engine_over(&reopened);
    let may = engine
        .compute_monthly_snapshot(&user, period("2024-05"))
        .await?;
    let june = engine
        .compute_monthly_snapshot(&user, period("2024-06"))
        .await?;
    assert_eq!(may.expense_count, 0);
    assert_eq!(june.total_spent, d("12.50"));
    assert_eq!(june.trend.prior_total, d("0"));
    Ok(())
}

#[tokio::test]
async fn missing_user_directory_reads_as_empty() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = Arc::new(JsonFileStorage::new(dir.path()));

    let report = engine_over(&storage)
        .compute_range_report(&Id::from_string("nobody"), day(2024, 5, 1), day(2024, 5, 7), None)
        .await?;
    assert_eq!(report.summary.total_spent, d("0"));
    assert_eq!(report.daily_series.len(), 7);
    assert_eq!(report.summary.display_state, DisplayState::NoBudgetSet);
    Ok(())
}

#[tokio::test]
async fn corrupt_ledger_surfaces_as_store_unavailable() -> Result<()> {
    let dir = TempDir::new()?;
    let user_dir = dir.path().join("users").join("alex");
    tokio::fs::create_dir_all(&user_dir).await?;
    tokio::fs::write(user_dir.join("expenses.jsonl"), "{not json}\n").await?;

    let storage = Arc::new(JsonFileStorage::new(dir.path()));
    let err = engine_over(&storage)
        .compute_monthly_snapshot(&Id::from_string("alex"), period("2024-05"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StoreUnavailable { store: "ledger", .. }));
    Ok(())
}

#[tokio::test]
async fn path_traversal_user_ids_are_refused() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = Arc::new(JsonFileStorage::new(dir.path()));

    let err = engine_over(&storage)
        .compute_monthly_snapshot(&Id::from_string(".."), period("2024-05"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StoreUnavailable { .. }));
    Ok(())
}

#[tokio::test]
async fn oversized_stored_amounts_error_instead_of_panicking() -> Result<()> {
    let dir = TempDir::new()?;
    let max = Decimal::MAX.to_string();
    write_raw_ledger(
        &dir,
        &[
            ("a", "2024-03-01", "Food", max.clone()),
            ("b", "2024-03-02", "Food", max.clone()),
        ],
    )
    .await?;
    let storage = Arc::new(JsonFileStorage::new(dir.path()));
    let engine = engine_over(&storage);
    let alex = Id::from_string("alex");

    let err = engine
        .compute_monthly_snapshot(&alex, period("2024-03"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AmountOverflow));

    let err = engine
        .compute_range_report(&alex, day(2024, 3, 1), day(2024, 3, 2), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AmountOverflow));

    write_raw_ledger(&dir, &[("a", "2024-03-01", "Food", max)]).await?;
    let trend = engine
        .compute_trend_comparison(&alex, period("2024-04"))
        .await?;
    assert_eq!(trend.prior_total, Decimal::MAX);
    assert_eq!(trend.direction, TrendDirection::Falling);

    let march = engine
        .compute_monthly_snapshot(&alex, period("2024-03"))
        .await?;
    assert_eq!(march.total_spent, Decimal::MAX);
    Ok(())
}

#[tokio::test]
async fn blank_stored_categories_can_be_filtered_as_uncategorized() -> Result<()> {
    let dir = TempDir::new()?;
    write_raw_ledger(
        &dir,
        &[
            ("a", "2024-05-01", "   ", "5.00".to_string()),
            ("b", "2024-05-02", "Food", "7.00".to_string()),
        ],
    )
    .await?;
    let storage = Arc::new(JsonFileStorage::new(dir.path()));
    let engine = engine_over(&storage);
    let alex = Id::from_string("alex");

    let all = engine
        .compute_range_report(&alex, day(2024, 5, 1), day(2024, 5, 7), None)
        .await?;
    let uncategorized = all
        .summary
        .per_category
        .iter()
        .find(|c| c.category == "Uncategorized")
        .unwrap();
    assert_eq!(uncategorized.spent, d("5.00"));

    let filtered = engine
        .compute_range_report(&alex, day(2024, 5, 1), day(2024, 5, 7), Some("uncategorized"))
        .await?;
    assert_eq!(filtered.summary.total_spent, d("5.00"));
    assert_eq!(filtered.summary.expense_count, 1);
    assert_eq!(filtered.daily_series[0].amount, d("5.00"));
    Ok(())
}
