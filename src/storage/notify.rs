use chrono::NaiveDate;
use tokio::sync::broadcast;

use crate::models::{Id, PeriodKey};

const CHANNEL_CAPACITY: usize = 64;

/// Emitted by a store after a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// Expenses on these dates were added, edited or removed.
    ExpensesChanged { user_id: Id, dates: Vec<NaiveDate> },
    /// The total or the allocation set of a period was saved.
    BudgetChanged { user_id: Id, period: PeriodKey },
}

impl StoreChange {
    pub fn user_id(&self) -> &Id {
        match self {
            StoreChange::ExpensesChanged { user_id, .. } => user_id,
            StoreChange::BudgetChanged { user_id, .. } => user_id,
        }
    }

    /// Whether a snapshot of `period` could be affected.
    ///
    /// Month-over-month trends read the previous month, so changes there
    /// count too.
    pub fn affects(&self, user_id: &Id, period: PeriodKey) -> bool {
        if self.user_id() != user_id {
            return false;
        }
        let previous = period.previous();
        match self {
            StoreChange::ExpensesChanged { dates, .. } => dates
                .iter()
                .any(|d| period.contains(*d) || previous.contains(*d)),
            StoreChange::BudgetChanged { period: changed, .. } => *changed == period,
        }
    }
}

/// Source of store change notifications.
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Broadcast sender shared by the store backends.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<StoreChange>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn notify(&self, change: StoreChange) {
        // No subscribers is fine; nobody is watching.
        let _ = self.tx.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.tx.subscribe()
    }
}
