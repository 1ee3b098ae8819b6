//! Building condition labels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EstimoError, Result};

/// State of the building, one of the seven labels used in the listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingCondition {
    #[serde(rename = "As new")]
    AsNew,
    #[serde(rename = "Just renovated")]
    JustRenovated,
    Good,
    #[serde(rename = "To be done up")]
    ToBeDoneUp,
    #[serde(rename = "To renovate")]
    ToRenovate,
    #[serde(rename = "To restore")]
    ToRestore,
    #[serde(rename = "Not specified")]
    NotSpecified,
}

impl BuildingCondition {
    pub const ALL: [BuildingCondition; 7] = [
        Self::AsNew,
        Self::JustRenovated,
        Self::Good,
        Self::ToBeDoneUp,
        Self::ToRenovate,
        Self::ToRestore,
        Self::NotSpecified,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::AsNew => "As new",
            Self::JustRenovated => "Just renovated",
            Self::Good => "Good",
            Self::ToBeDoneUp => "To be done up",
            Self::ToRenovate => "To renovate",
            Self::ToRestore => "To restore",
            Self::NotSpecified => "Not specified",
        }
    }
}

impl fmt::Display for BuildingCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BuildingCondition {
    type Err = EstimoError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EstimoError::UnknownCondition(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_label_roundtrip() {
        for condition in BuildingCondition::ALL {
            assert_eq!(condition.label().parse::<BuildingCondition>().unwrap(), condition);
        }
    }

    #[test]
    fn condition_parse_is_case_insensitive() {
        assert_eq!(
            "to BE done up".parse::<BuildingCondition>().unwrap(),
            BuildingCondition::ToBeDoneUp
        );
        assert!("Ruined".parse::<BuildingCondition>().is_err());
    }
}
