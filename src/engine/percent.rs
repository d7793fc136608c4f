//! Percentage and trend arithmetic. Exact decimals only, never floats.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::types::{DisplayState, PercentChange, TrendDirection};
use super::EngineError;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

fn round_whole(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Share of `allocated` consumed by `spent`, as a whole percent in 0..=100.
///
/// With nothing allocated, any spending reads as fully used (100) and no
/// spending reads as 0.
pub fn percent_used(spent: Decimal, allocated: Decimal) -> u32 {
    if allocated <= Decimal::ZERO {
        return if spent > Decimal::ZERO { 100 } else { 0 };
    }
    let ratio = match spent.checked_div(allocated).and_then(|r| r.checked_mul(HUNDRED)) {
        Some(r) => round_whole(r),
        None => return 100,
    };
    if ratio <= Decimal::ZERO {
        0
    } else if ratio >= HUNDRED {
        100
    } else {
        ratio.to_u32().unwrap_or(100)
    }
}

pub fn is_over_budget(spent: Decimal, allocated: Decimal) -> bool {
    spent > allocated
}

pub fn display_state(
    spent: Decimal,
    allocated: Decimal,
    percent_used: u32,
    near_limit_percent: u32,
) -> DisplayState {
    if allocated <= Decimal::ZERO {
        DisplayState::NoBudgetSet
    } else if spent > allocated {
        DisplayState::OverBudget
    } else if percent_used >= near_limit_percent {
        DisplayState::NearLimit
    } else {
        DisplayState::OnTrack
    }
}

pub fn percent_change(prior: Decimal, current: Decimal) -> PercentChange {
    if prior.is_zero() {
        return if current.is_zero() {
            PercentChange::NoChange
        } else {
            PercentChange::IncreaseFromZero
        };
    }
    match (current - prior)
        .checked_div(prior)
        .and_then(|r| r.checked_mul(HUNDRED))
    {
        Some(change) => PercentChange::Percent(round_whole(change).normalize()),
        None => PercentChange::IncreaseFromZero,
    }
}

/// Compares `current` against `prior` with a symmetric deadband.
///
/// `deadband` is a fraction: `0.1` means rising only above 110% of prior and
/// falling only below 90%.
pub fn trend_direction(prior: Decimal, current: Decimal, deadband: Decimal) -> TrendDirection {
    // An upper bound past Decimal::MAX is above any current total.
    let upper = prior.checked_mul(Decimal::ONE + deadband);
    let lower = prior.checked_mul(Decimal::ONE - deadband);
    if upper.is_some_and(|upper| current > upper) {
        TrendDirection::Rising
    } else if lower.is_some_and(|lower| current < lower) {
        TrendDirection::Falling
    } else {
        TrendDirection::Stable
    }
}

/// Sum of `amounts`, or `AmountOverflow` instead of a panic.
pub fn checked_sum<I>(amounts: I) -> Result<Decimal, EngineError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
        .ok_or(EngineError::AmountOverflow)
}

pub(crate) fn add_to(total: &mut Decimal, amount: Decimal) -> Result<(), EngineError> {
    *total = total
        .checked_add(amount)
        .ok_or(EngineError::AmountOverflow)?;
    Ok(())
}

/// Money rounded half-up to cents.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn percent_used_handles_zero_allocation() {
        assert_eq!(percent_used(d("0"), d("0")), 0);
        assert_eq!(percent_used(d("42.00"), d("0")), 100);
        assert!(is_over_budget(d("42.00"), d("0")));
        assert!(!is_over_budget(d("0"), d("0")));
    }

    #[test]
    fn percent_used_rounds_half_up() {
        assert_eq!(percent_used(d("50.00"), d("100.00")), 50);
        assert_eq!(percent_used(d("1"), d("8")), 13); // 12.5
        assert_eq!(percent_used(d("1"), d("3")), 33);
        assert_eq!(percent_used(d("2"), d("3")), 67);
        assert_eq!(percent_used(d("0.01"), d("300")), 0);
    }

    #[test]
    fn percent_used_clamps_overspend() {
        assert_eq!(percent_used(d("250"), d("100")), 100);
        assert_eq!(percent_used(d("100"), d("100")), 100);
        assert!(is_over_budget(d("100.01"), d("100")));
        assert!(!is_over_budget(d("100.00"), d("100")));
    }

    #[test]
    fn display_states() {
        assert_eq!(display_state(d("5"), d("0"), 100, 80), DisplayState::NoBudgetSet);
        assert_eq!(display_state(d("0"), d("0"), 0, 80), DisplayState::NoBudgetSet);
        assert_eq!(display_state(d("50"), d("100"), 50, 80), DisplayState::OnTrack);
        assert_eq!(display_state(d("80"), d("100"), 80, 80), DisplayState::NearLimit);
        assert_eq!(display_state(d("100"), d("100"), 100, 80), DisplayState::NearLimit);
        assert_eq!(display_state(d("101"), d("100"), 100, 80), DisplayState::OverBudget);
    }

    #[test]
    fn percent_change_special_cases_zero_prior() {
        assert_eq!(percent_change(d("0"), d("50.00")), PercentChange::IncreaseFromZero);
        assert_eq!(percent_change(d("0.00"), d("0")), PercentChange::NoChange);
        assert_eq!(percent_change(d("100"), d("109")), PercentChange::Percent(d("9")));
        assert_eq!(percent_change(d("100"), d("50")), PercentChange::Percent(d("-50")));
        assert_eq!(percent_change(d("100"), d("100")), PercentChange::Percent(d("0")));
    }

    #[test]
    fn trend_deadband_is_ten_percent() {
        let band = d("0.1");
        assert_eq!(trend_direction(d("100.00"), d("109.00"), band), TrendDirection::Stable);
        assert_eq!(trend_direction(d("100.00"), d("110.00"), band), TrendDirection::Stable);
        assert_eq!(trend_direction(d("100.00"), d("111.00"), band), TrendDirection::Rising);
        assert_eq!(trend_direction(d("100.00"), d("90.00"), band), TrendDirection::Stable);
        assert_eq!(trend_direction(d("100.00"), d("89.99"), band), TrendDirection::Falling);
        assert_eq!(trend_direction(d("0"), d("0"), band), TrendDirection::Stable);
        assert_eq!(trend_direction(d("0"), d("0.01"), band), TrendDirection::Rising);
    }

    #[test]
    fn huge_priors_do_not_overflow_the_deadband() {
        let band = d("0.1");
        assert_eq!(trend_direction(Decimal::MAX, Decimal::MAX, band), TrendDirection::Stable);
        assert_eq!(trend_direction(Decimal::MAX, d("1"), band), TrendDirection::Falling);
    }

    #[test]
    fn checked_sum_reports_overflow() {
        let half = Decimal::MAX / d("2") + Decimal::ONE;
        assert!(matches!(checked_sum([half, half]), Err(EngineError::AmountOverflow)));
        assert_eq!(checked_sum([d("1.10"), d("2.20")]).unwrap(), d("3.30"));
        assert_eq!(checked_sum(Vec::<Decimal>::new()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn round_cents_is_half_up() {
        assert_eq!(round_cents(d("10.005")), d("10.01"));
        assert_eq!(round_cents(d("10.004")), d("10.00"));
    }
}
