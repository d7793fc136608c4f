mod support;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use support::{d, day, engine_over, period, seed_budget, seed_expense, FlakyStorage};
use tallybook::live::spawn_snapshot_refresher;
use tallybook::models::Id;
use tallybook::storage::JsonFileStorage;
use tempfile::TempDir;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn file_store_writes_refresh_the_dashboard() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = Arc::new(JsonFileStorage::new(dir.path()));
    let user = Id::from_string("alex");

    let refresher = spawn_snapshot_refresher(
        engine_over(&storage),
        storage.clone(),
        user.clone(),
        period("2024-05"),
    )
    .await?;
    let mut rx = refresher.subscribe();

    seed_budget(storage.as_ref(), &user, "2024-05", &[("Food", "100")]).await?;
    seed_expense(storage.as_ref(), &user, "a", day(2024, 5, 4), "Food", "85").await?;

    // Budget and expense writes may coalesce; wait until both are visible.
    timeout(WAIT, async {
        loop {
            rx.changed().await?;
            let snap = rx.borrow_and_update().clone();
            if snap.total_spent == d("85") && snap.total_allocated == d("100") {
                return anyhow::Ok(snap);
            }
        }
    })
    .await??;

    assert_eq!(refresher.latest().per_category[0].percent_used, 85);
    refresher.stop();
    Ok(())
}

#[tokio::test]
async fn failed_refresh_keeps_last_good_snapshot() -> Result<()> {
    let storage = Arc::new(FlakyStorage::default());
    let user = Id::from_string("alex");
    seed_expense(&storage.inner, &user, "a", day(2024, 5, 1), "Food", "10").await?;

    let refresher = spawn_snapshot_refresher(
        engine_over(&storage),
        storage.clone(),
        user.clone(),
        period("2024-05"),
    )
    .await?;
    let mut rx = refresher.subscribe();
    assert_eq!(refresher.latest().total_spent, d("10"));

    storage.set_failing(true, false);
    seed_expense(storage.as_ref(), &user, "b", day(2024, 5, 2), "Food", "5").await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!rx.has_changed()?);
    assert_eq!(refresher.latest().total_spent, d("10"));
    assert!(!refresher.is_finished());

    storage.set_failing(false, false);
    seed_expense(storage.as_ref(), &user, "c", day(2024, 5, 3), "Food", "1").await?;
    timeout(WAIT, rx.changed()).await??;
    assert_eq!(rx.borrow_and_update().total_spent, d("16"));

    refresher.stop();
    Ok(())
}

#[tokio::test]
async fn unrelated_writes_do_not_republish() -> Result<()> {
    let storage = Arc::new(FlakyStorage::default());
    let user = Id::from_string("alex");

    let refresher = spawn_snapshot_refresher(
        engine_over(&storage),
        storage.clone(),
        user.clone(),
        period("2024-05"),
    )
    .await?;
    let rx = refresher.subscribe();

    let sam = Id::from_string("sam");
    seed_expense(storage.as_ref(), &sam, "a", day(2024, 5, 1), "Food", "10").await?;
    seed_expense(storage.as_ref(), &user, "b", day(2024, 9, 1), "Food", "10").await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!rx.has_changed()?);
    assert_eq!(refresher.latest().total_spent, d("0"));
    refresher.stop();
    Ok(())
}

#[tokio::test]
async fn initial_failure_is_returned() -> Result<()> {
    let storage = Arc::new(FlakyStorage::default());
    storage.set_failing(false, true);

    let result = spawn_snapshot_refresher(
        engine_over(&storage),
        storage.clone(),
        Id::from_string("alex"),
        period("2024-05"),
    )
    .await;
    assert!(result.is_err());
    Ok(())
}
