//! Money rendering for command output.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::DisplayConfig;

/// Renders amounts according to the `[display]` config section.
#[derive(Debug, Clone, Default)]
pub struct MoneyFormat {
    decimals: Option<u32>,
    grouping: bool,
    symbol: Option<String>,
    fixed_decimals: bool,
}

impl From<&DisplayConfig> for MoneyFormat {
    fn from(display: &DisplayConfig) -> Self {
        Self {
            decimals: display.currency_decimals,
            grouping: display.currency_grouping,
            symbol: display.currency_symbol.clone(),
            fixed_decimals: display.currency_fixed_decimals,
        }
    }
}

impl MoneyFormat {
    fn rounded(&self, value: Decimal) -> Decimal {
        match self.decimals {
            Some(dp) => value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
            None => value,
        }
    }

    /// Canonical machine-readable amount: rounded if configured, trailing
    /// zeros stripped, no symbol or separators.
    pub fn value(&self, value: Decimal) -> String {
        self.rounded(value).normalize().to_string()
    }

    /// Human-facing amount, e.g. `-$1,234.50`.
    pub fn display(&self, value: Decimal) -> String {
        let rounded = self.rounded(value);

        let mut digits = rounded.abs().normalize().to_string();
        if let (true, Some(dp)) = (self.fixed_decimals, self.decimals) {
            digits = with_fraction_digits(&digits, dp as usize);
        }
        if self.grouping {
            digits = with_thousands(&digits);
        }

        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        format!("{sign}{}{digits}", self.symbol.as_deref().unwrap_or(""))
    }

    /// `display` output, but only when some display option is configured.
    pub fn optional_display(&self, value: Decimal) -> Option<String> {
        let styled = self.grouping || self.symbol.is_some() || self.fixed_decimals;
        styled.then(|| self.display(value))
    }
}

/// Pads or truncates the fraction of a plain decimal string to `dp` digits.
fn with_fraction_digits(s: &str, dp: usize) -> String {
    let (int_part, frac) = s.split_once('.').unwrap_or((s, ""));
    if dp == 0 {
        return int_part.to_string();
    }
    let frac: String = frac.chars().chain(std::iter::repeat('0')).take(dp).collect();
    format!("{int_part}.{frac}")
}

fn with_thousands(s: &str) -> String {
    let (int_part, frac) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match frac {
        Some(f) if !f.is_empty() => format!("{grouped}.{f}"),
        _ => grouped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn value_strips_trailing_zeros_and_rounds_half_up() {
        let plain = MoneyFormat::default();
        assert_eq!(plain.value(d("42.00")), "42");
        assert_eq!(plain.value(d("0.10")), "0.1");

        let cents = MoneyFormat {
            decimals: Some(2),
            ..Default::default()
        };
        assert_eq!(cents.value(d("10.005")), "10.01");
        assert_eq!(cents.value(d("-10.005")), "-10.01");
    }

    #[test]
    fn display_applies_symbol_grouping_and_padding() {
        let fmt = MoneyFormat::from(&DisplayConfig {
            currency_decimals: Some(2),
            currency_grouping: true,
            currency_symbol: Some("$".to_string()),
            currency_fixed_decimals: true,
        });
        assert_eq!(fmt.display(d("1234.5")), "$1,234.50");
        assert_eq!(fmt.display(d("-1234567")), "-$1,234,567.00");
        assert_eq!(fmt.display(d("999")), "$999.00");
        assert_eq!(fmt.display(d("-0.001")), "$0.00");
    }

    #[test]
    fn display_without_options_matches_value() {
        let fmt = MoneyFormat::default();
        assert_eq!(fmt.display(d("1234.50")), "1234.5");
    }
}
