use crate::models::{Id, PeriodKey};

use super::{AggregationEngine, EngineError, Trend};

impl AggregationEngine {
    /// Month-over-month spending change: `current` against the calendar
    /// month before it.
    pub async fn compute_trend_comparison(
        &self,
        user_id: &Id,
        current: PeriodKey,
    ) -> Result<Trend, EngineError> {
        let prior = current.previous();
        let prior_total = self.total_spent(user_id, prior.date_range()).await?;
        let current_total = self.total_spent(user_id, current.date_range()).await?;
        Ok(self.trend_between(prior_total, current_total))
    }
}
