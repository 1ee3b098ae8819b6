//! Postal codes and the postal code → province rule table
//!
//! Belgian postal codes are four digits. The province is decided by the first
//! two digits alone, using the range table in [`PROVINCE_RULES`]. Prefixes
//! 57–59 are not assigned to any province and are rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EstimoError, Result};

/// A validated four-digit Belgian postal code (1000–9999).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "PostalCodeInput", into = "String")]
pub struct PostalCode(u16);

impl PostalCode {
    pub const MIN: u16 = 1000;
    pub const MAX: u16 = 9999;

    /// Parse a postal code from text, tolerating surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.len() != 4 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EstimoError::InvalidPostalCode(input.to_string()));
        }
        let value: u16 = trimmed
            .parse()
            .map_err(|_| EstimoError::InvalidPostalCode(input.to_string()))?;
        Self::from_number(u32::from(value))
    }

    /// Build a postal code from its numeric form.
    pub fn from_number(value: u32) -> Result<Self> {
        if (u32::from(Self::MIN)..=u32::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u16))
        } else {
            Err(EstimoError::InvalidPostalCode(value.to_string()))
        }
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    /// First two digits, the key of the province rule table.
    pub fn prefix(&self) -> u8 {
        (self.0 / 100) as u8
    }

    /// The province this postal code belongs to.
    pub fn province(&self) -> Result<Province> {
        province_of(*self)
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PostalCode {
    type Err = EstimoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<PostalCode> for String {
    fn from(code: PostalCode) -> Self {
        code.to_string()
    }
}

/// Unvalidated wire form of a postal code: callers send either a number or a string.
///
/// Request bodies can hold this and validate later, so a bad code surfaces as
/// [`EstimoError::InvalidPostalCode`] rather than a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PostalCodeInput {
    Number(u32),
    Text(String),
}

impl TryFrom<PostalCodeInput> for PostalCode {
    type Error = EstimoError;

    fn try_from(raw: PostalCodeInput) -> Result<Self> {
        match raw {
            PostalCodeInput::Number(n) => Self::from_number(n),
            PostalCodeInput::Text(s) => Self::parse(&s),
        }
    }
}

/// The eleven Belgian regions a postal code resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Province {
    #[serde(rename = "Brussels-Capital Region")]
    BrusselsCapital,
    #[serde(rename = "Province of Walloon Brabant")]
    WalloonBrabant,
    #[serde(rename = "Province of Flemish Brabant")]
    FlemishBrabant,
    #[serde(rename = "Province of Antwerp")]
    Antwerp,
    #[serde(rename = "Province of Limburg")]
    Limburg,
    #[serde(rename = "Province of Liège")]
    Liege,
    #[serde(rename = "Province of Namur")]
    Namur,
    #[serde(rename = "Province of Hainaut")]
    Hainaut,
    #[serde(rename = "Province of Luxembourg")]
    Luxembourg,
    #[serde(rename = "Province of West Flanders")]
    WestFlanders,
    #[serde(rename = "Province of East Flanders")]
    EastFlanders,
}

impl Province {
    pub const ALL: [Province; 11] = [
        Province::BrusselsCapital,
        Province::WalloonBrabant,
        Province::FlemishBrabant,
        Province::Antwerp,
        Province::Limburg,
        Province::Liege,
        Province::Namur,
        Province::Hainaut,
        Province::Luxembourg,
        Province::WestFlanders,
        Province::EastFlanders,
    ];

    /// Label used in the training data and in model category vocabularies.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BrusselsCapital => "Brussels-Capital Region",
            Self::WalloonBrabant => "Province of Walloon Brabant",
            Self::FlemishBrabant => "Province of Flemish Brabant",
            Self::Antwerp => "Province of Antwerp",
            Self::Limburg => "Province of Limburg",
            Self::Liege => "Province of Liège",
            Self::Namur => "Province of Namur",
            Self::Hainaut => "Province of Hainaut",
            Self::Luxembourg => "Province of Luxembourg",
            Self::WestFlanders => "Province of West Flanders",
            Self::EastFlanders => "Province of East Flanders",
        }
    }
}

impl fmt::Display for Province {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Province {
    type Err = EstimoError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EstimoError::UnknownProvince(s.to_string()))
    }
}

/// Inclusive two-digit prefix ranges and the province they map to.
pub const PROVINCE_RULES: [(u8, u8, Province); 13] = [
    (10, 12, Province::BrusselsCapital),
    (13, 14, Province::WalloonBrabant),
    (15, 19, Province::FlemishBrabant),
    (30, 34, Province::FlemishBrabant),
    (20, 29, Province::Antwerp),
    (35, 39, Province::Limburg),
    (40, 49, Province::Liege),
    (66, 69, Province::Luxembourg),
    (50, 56, Province::Namur),
    (60, 65, Province::Hainaut),
    (70, 79, Province::Hainaut),
    (80, 89, Province::WestFlanders),
    (90, 99, Province::EastFlanders),
];

/// Resolve the province of a postal code from its two-digit prefix.
pub fn province_of(code: PostalCode) -> Result<Province> {
    let prefix = code.prefix();
    PROVINCE_RULES
        .iter()
        .find(|(start, end, _)| (*start..=*end).contains(&prefix))
        .map(|(_, _, province)| *province)
        .ok_or_else(|| EstimoError::InvalidPostalCode(code.to_string()))
}

/// Parse raw text and resolve its province in one step.
pub fn province_for(raw: &str) -> Result<Province> {
    province_of(PostalCode::parse(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1000", Province::BrusselsCapital)]
    #[case("1299", Province::BrusselsCapital)]
    #[case("1300", Province::WalloonBrabant)]
    #[case("1500", Province::FlemishBrabant)]
    #[case("3000", Province::FlemishBrabant)]
    #[case("2000", Province::Antwerp)]
    #[case("3500", Province::Limburg)]
    #[case("4000", Province::Liege)]
    #[case("5000", Province::Namur)]
    #[case("6000", Province::Hainaut)]
    #[case("7000", Province::Hainaut)]
    #[case("6600", Province::Luxembourg)]
    #[case("8000", Province::WestFlanders)]
    #[case("9000", Province::EastFlanders)]
    #[case(" 9999 ", Province::EastFlanders)]
    fn test_province_for(#[case] input: &str, #[case] expected: Province) {
        assert_eq!(province_for(input).unwrap(), expected, "postal code {}", input);
    }

    #[rstest]
    #[case("")]
    #[case("9")]
    #[case("612")]
    #[case("0999")]
    #[case("10000")]
    #[case("10a0")]
    #[case("5700")]
    #[case("5999")]
    fn test_province_for_rejects(#[case] input: &str) {
        assert!(
            matches!(province_for(input), Err(EstimoError::InvalidPostalCode(_))),
            "postal code {:?} should be rejected",
            input
        );
    }

    #[test]
    fn test_brussels_range() {
        for n in 1000..=1299 {
            let code = PostalCode::from_number(n).unwrap();
            assert_eq!(province_of(code).unwrap(), Province::BrusselsCapital);
        }
    }

    #[test]
    fn test_east_flanders_range() {
        for n in 9000..=9999 {
            let code = PostalCode::from_number(n).unwrap();
            assert_eq!(province_of(code).unwrap(), Province::EastFlanders);
        }
    }

    #[test]
    fn test_rules_do_not_overlap() {
        for prefix in 10u8..=99 {
            let claims: Vec<Province> = PROVINCE_RULES
                .iter()
                .filter(|(start, end, _)| (*start..=*end).contains(&prefix))
                .map(|(_, _, p)| *p)
                .collect();
            assert!(
                claims.len() <= 1,
                "prefix {} claimed by {:?}",
                prefix,
                claims
            );
        }
    }

    #[test]
    fn test_uncovered_prefixes() {
        let uncovered: Vec<u8> = (10u8..=99)
            .filter(|prefix| {
                !PROVINCE_RULES
                    .iter()
                    .any(|(start, end, _)| (*start..=*end).contains(prefix))
            })
            .collect();
        assert_eq!(uncovered, vec![57, 58, 59]);
    }

    #[test]
    fn test_postal_code_serde() {
        let from_number: PostalCode = from_toml_value("1000");
        let from_text: PostalCode = from_toml_value("\"1000\"");
        assert_eq!(from_number, from_text);
        assert_eq!(String::from(from_number), "1000");
    }

    fn from_toml_value(raw: &str) -> PostalCode {
        // toml has no bare scalars, wrap in a table
        #[derive(Deserialize)]
        struct Wrapper {
            code: PostalCode,
        }
        let wrapped: Wrapper = toml::from_str(&format!("code = {}", raw)).unwrap();
        wrapped.code
    }

    #[rstest]
    #[case(PostalCodeInput::Number(1000), Some(1000))]
    #[case(PostalCodeInput::Text(" 9000".to_string()), Some(9000))]
    #[case(PostalCodeInput::Number(612), None)]
    #[case(PostalCodeInput::Text("10a0".to_string()), None)]
    fn test_postal_code_input(#[case] raw: PostalCodeInput, #[case] expected: Option<u16>) {
        let parsed = PostalCode::try_from(raw);
        match expected {
            Some(value) => assert_eq!(parsed.unwrap().value(), value),
            None => assert!(matches!(parsed, Err(EstimoError::InvalidPostalCode(_)))),
        }
    }

    #[test]
    fn test_province_from_str() {
        assert_eq!(
            "Province of Liège".parse::<Province>().unwrap(),
            Province::Liege
        );
        assert!("Atlantis".parse::<Province>().is_err());
    }
}
