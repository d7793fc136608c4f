use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};

use super::{CategoryKey, Id, IdGenerator, UuidIdGenerator, ValidationError};

/// Largest amount a single expense, allocation or budget total may carry.
///
/// Totals over many records stay far below `Decimal::MAX`.
// 1_000_000_000_000_000 (10^18), scale 0; `Decimal::new` is not const.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA764_0000, 0x0DE0_B6B3, 0, false, 0);

pub(crate) fn check_upper_bound(amount: Decimal) -> Result<(), ValidationError> {
    if amount > MAX_AMOUNT {
        return Err(ValidationError::AmountTooLarge(amount));
    }
    Ok(())
}

/// A single spending record in a user's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Id,
    pub user_id: Id,
    /// Calendar day the money was spent. Aggregation works at day granularity.
    pub date: NaiveDate,
    /// When the record was written.
    pub recorded_at: DateTime<Utc>,
    /// Non-negative amount in the user's currency.
    pub amount: Decimal,
    /// Free-form category name as entered.
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Opaque reference to an uploaded receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_ref: Option<String>,
}

impl Expense {
    pub fn new(
        user_id: Id,
        date: NaiveDate,
        amount: Decimal,
        category: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Self::new_with_generator(
            &UuidIdGenerator,
            &SystemClock,
            user_id,
            date,
            amount,
            category,
        )
    }

    pub fn new_with_generator(
        ids: &dyn IdGenerator,
        clock: &dyn Clock,
        user_id: Id,
        date: NaiveDate,
        amount: Decimal,
        category: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let expense = Self {
            id: ids.new_id(),
            user_id,
            date,
            recorded_at: clock.now(),
            amount,
            category: category.into(),
            note: None,
            receipt_ref: None,
        };
        expense.validate()?;
        Ok(expense)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(ValidationError::NegativeAmount(self.amount));
        }
        check_upper_bound(self.amount)?;
        if self.category_key().is_blank() {
            return Err(ValidationError::BlankCategory);
        }
        Ok(())
    }

    pub fn category_key(&self) -> CategoryKey {
        CategoryKey::new(&self.category)
    }

    pub fn with_id(mut self, id: Id) -> Self {
        self.id = id;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_receipt_ref(mut self, receipt_ref: impl Into<String>) -> Self {
        self.receipt_ref = Some(receipt_ref.into());
        self
    }

    pub fn with_recorded_at(mut self, recorded_at: DateTime<Utc>) -> Self {
        self.recorded_at = recorded_at;
        self
    }
}
