//! Predicted price value

use std::fmt;

use estimo_core::round_cents;
use serde::Serialize;

/// Invert the `log1p` transform applied to prices at training time.
pub fn inverse_log_target(raw: f64) -> f64 {
    raw.exp_m1()
}

/// A non-negative price in euros, rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PredictedPrice(f64);

impl PredictedPrice {
    /// Price from a raw model output on the log scale.
    pub fn from_raw(raw: f64) -> Self {
        Self(round_cents(inverse_log_target(raw).max(0.0)))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Display form used in listings: `€ 245 000,00`.
    pub fn formatted(&self) -> String {
        let text = format!("{:.2}", self.0);
        let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, digit) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(' ');
            }
            grouped.push(digit);
        }
        format!("€ {},{}", grouped, cents)
    }
}

impl fmt::Display for PredictedPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_margin_is_zero_price() {
        assert_eq!(PredictedPrice::from_raw(0.0).value(), 0.0);
    }

    #[test]
    fn test_ln2_margin_is_one_euro() {
        assert_eq!(PredictedPrice::from_raw(std::f64::consts::LN_2).value(), 1.00);
    }

    #[test]
    fn test_negative_margin_clamps_to_zero() {
        assert_eq!(PredictedPrice::from_raw(-3.0).value(), 0.0);
    }

    #[test]
    fn test_rounds_to_cents() {
        let price = PredictedPrice::from_raw(12.0);
        assert_eq!(price.value(), 162_753.79);
    }

    #[test]
    fn test_formatted() {
        assert_eq!(PredictedPrice(245_000.0).formatted(), "€ 245 000,00");
        assert_eq!(PredictedPrice(1_234_567.5).formatted(), "€ 1 234 567,50");
        assert_eq!(PredictedPrice(999.99).formatted(), "€ 999,99");
        assert_eq!(PredictedPrice(0.0).to_string(), "€ 0,00");
    }
}
