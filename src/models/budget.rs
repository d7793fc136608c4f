use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::expense::check_upper_bound;
use super::{CategoryKey, Id, PeriodKey, ValidationError};

/// A user's overall allocation for one month. Saving replaces any previous value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetPeriod {
    pub user_id: Id,
    pub period: PeriodKey,
    pub total_allocated: Decimal,
}

impl BudgetPeriod {
    pub fn new(user_id: Id, period: PeriodKey, total_allocated: Decimal) -> Self {
        Self {
            user_id,
            period,
            total_allocated,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_upper_bound(self.total_allocated)
    }
}

/// Amount budgeted for one category within a [`BudgetPeriod`].
///
/// The allocations of a period are always saved as a complete set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAllocation {
    pub user_id: Id,
    pub period: PeriodKey,
    pub category: String,
    /// May be zero.
    pub allocated: Decimal,
}

impl CategoryAllocation {
    pub fn new(
        user_id: Id,
        period: PeriodKey,
        category: impl Into<String>,
        allocated: Decimal,
    ) -> Result<Self, ValidationError> {
        let allocation = Self {
            user_id,
            period,
            category: category.into(),
            allocated,
        };
        allocation.validate()?;
        Ok(allocation)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.category_key().is_blank() {
            return Err(ValidationError::BlankCategory);
        }
        if self.allocated.is_sign_negative() && !self.allocated.is_zero() {
            return Err(ValidationError::NegativeAllocation {
                category: self.category.clone(),
                amount: self.allocated,
            });
        }
        check_upper_bound(self.allocated)
    }

    pub fn category_key(&self) -> CategoryKey {
        CategoryKey::new(&self.category)
    }
}
