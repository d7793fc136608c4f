//! Keeps a monthly snapshot current as the stores change.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::{AggregationEngine, AggregationResult, EngineError};
use crate::models::{Id, PeriodKey};
use crate::storage::{ChangeFeed, StoreChange};

/// Handle to a background task that republishes one user's snapshot.
pub struct SnapshotRefresher {
    updates: watch::Receiver<AggregationResult>,
    task: JoinHandle<()>,
}

impl SnapshotRefresher {
    /// Latest published snapshot.
    pub fn latest(&self) -> AggregationResult {
        self.updates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AggregationResult> {
        self.updates.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

/// Computes the snapshot for `user_id`/`period` and spawns a task that
/// recomputes it whenever `feed` reports a change that could affect it.
///
/// A failed initial computation is returned. Later failures are logged and
/// the last good snapshot stays published. The task ends when the feed closes
/// or every receiver, including the returned handle, is dropped.
pub async fn spawn_snapshot_refresher(
    engine: AggregationEngine,
    feed: Arc<dyn ChangeFeed>,
    user_id: Id,
    period: PeriodKey,
) -> Result<SnapshotRefresher, EngineError> {
    // Subscribe first so nothing written during the initial read is missed.
    let mut changes = feed.subscribe();
    let initial = engine.compute_monthly_snapshot(&user_id, period).await?;
    let (tx, updates) = watch::channel(initial);

    let task = tokio::spawn(async move {
        loop {
            let refresh = tokio::select! {
                _ = tx.closed() => break,
                received = changes.recv() => match received {
                    Ok(change) => wants_refresh(&change, &user_id, period),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Snapshot refresher lagged behind store changes");
                        true
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            if !refresh {
                continue;
            }

            match engine.compute_monthly_snapshot(&user_id, period).await {
                Ok(snapshot) => {
                    tx.send_if_modified(|current| {
                        if *current == snapshot {
                            false
                        } else {
                            *current = snapshot;
                            true
                        }
                    });
                }
                Err(err) => {
                    warn!(
                        user_id = %user_id,
                        period = %period,
                        error = %err,
                        "Snapshot refresh failed; keeping previous snapshot"
                    );
                }
            }
        }
        debug!(user_id = %user_id, period = %period, "Snapshot refresher stopped");
    });

    Ok(SnapshotRefresher { updates, task })
}

fn wants_refresh(change: &StoreChange, user_id: &Id, period: PeriodKey) -> bool {
    change.affects(user_id, period)
}
