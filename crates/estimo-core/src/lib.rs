//! estimo-core - Feature preparation for property price estimation
//!
//! This crate turns raw property attributes into the exact feature row a
//! trained price model expects:
//!
//! - **Postal**: postal code validation and the postal code → province rule table
//! - **Income**: postal code → average taxable income reference table
//! - **Subtype**: property subtype → coarse category grouping
//! - **Condition**: the seven building condition labels
//! - **Features**: assembly of the ordered, typed model input row
//!
//! # Design
//!
//! Categorical values are typed enums from the moment they are parsed, so the
//! row handed to the model never needs string re-casting. Every lookup that
//! can miss fails with a specific [`EstimoError`] instead of producing a
//! partially filled row.

pub mod condition;
pub mod config;
pub mod error;
pub mod features;
pub mod income;
pub mod postal;
pub mod subtype;

pub use condition::*;
pub use config::*;
pub use error::*;
pub use features::*;
pub use income::*;
pub use postal::*;
pub use subtype::*;

/// Round a monetary value to two decimals.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(2000.0), 2000.0);
        assert_eq!(round_cents(1234.5678), 1234.57);
        assert_eq!(round_cents(0.004), 0.0);
    }
}
