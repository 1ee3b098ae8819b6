//! Property subtypes and their coarse grouping.
//!
//! The model was trained on four subtype groups rather than the 23 listing
//! subtypes. Unknown labels are rejected under [`SubtypePolicy::Strict`]; the
//! lenient policy forwards them unchanged as the category value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EstimoError, Result};

/// Listing subtype as entered by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertySubtype {
    House,
    Villa,
    TownHouse,
    Bungalow,
    Farmhouse,
    CountryCottage,
    Chalet,
    Apartment,
    ApartmentBlock,
    Duplex,
    Penthouse,
    GroundFloor,
    FlatStudio,
    Triplex,
    ServiceFlat,
    Mansion,
    ExceptionalProperty,
    Castle,
    ManorHouse,
    MixedUseBuilding,
    Loft,
    Kot,
    OtherProperty,
}

impl PropertySubtype {
    pub const ALL: [PropertySubtype; 23] = [
        Self::House,
        Self::Villa,
        Self::TownHouse,
        Self::Bungalow,
        Self::Farmhouse,
        Self::CountryCottage,
        Self::Chalet,
        Self::Apartment,
        Self::ApartmentBlock,
        Self::Duplex,
        Self::Penthouse,
        Self::GroundFloor,
        Self::FlatStudio,
        Self::Triplex,
        Self::ServiceFlat,
        Self::Mansion,
        Self::ExceptionalProperty,
        Self::Castle,
        Self::ManorHouse,
        Self::MixedUseBuilding,
        Self::Loft,
        Self::Kot,
        Self::OtherProperty,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::House => "house",
            Self::Villa => "villa",
            Self::TownHouse => "town-house",
            Self::Bungalow => "bungalow",
            Self::Farmhouse => "farmhouse",
            Self::CountryCottage => "country-cottage",
            Self::Chalet => "chalet",
            Self::Apartment => "apartment",
            Self::ApartmentBlock => "apartment-block",
            Self::Duplex => "duplex",
            Self::Penthouse => "penthouse",
            Self::GroundFloor => "ground-floor",
            Self::FlatStudio => "flat-studio",
            Self::Triplex => "triplex",
            Self::ServiceFlat => "service-flat",
            Self::Mansion => "mansion",
            Self::ExceptionalProperty => "exceptional-property",
            Self::Castle => "castle",
            Self::ManorHouse => "manor-house",
            Self::MixedUseBuilding => "mixed-use-building",
            Self::Loft => "loft",
            Self::Kot => "kot",
            Self::OtherProperty => "other-property",
        }
    }

    /// Parse a listing label, ignoring case and surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(wanted))
    }

    pub fn group(&self) -> SubtypeGroup {
        match self {
            Self::House
            | Self::TownHouse
            | Self::Bungalow
            | Self::Farmhouse
            | Self::CountryCottage => SubtypeGroup::Houses,
            Self::Apartment
            | Self::Duplex
            | Self::Penthouse
            | Self::GroundFloor
            | Self::FlatStudio
            | Self::Triplex
            | Self::ServiceFlat
            | Self::Kot => SubtypeGroup::Apartments,
            Self::Villa
            | Self::Chalet
            | Self::Mansion
            | Self::ExceptionalProperty
            | Self::Castle
            | Self::ManorHouse => SubtypeGroup::LuxuryProperties,
            Self::ApartmentBlock
            | Self::MixedUseBuilding
            | Self::Loft
            | Self::OtherProperty => SubtypeGroup::SpecializedProperties,
        }
    }
}

impl fmt::Display for PropertySubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PropertySubtype {
    type Err = EstimoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_label(s).ok_or_else(|| EstimoError::UnknownSubtype(s.to_string()))
    }
}

/// Coarse subtype category the model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubtypeGroup {
    Houses,
    Apartments,
    #[serde(rename = "Luxury Properties")]
    LuxuryProperties,
    #[serde(rename = "Specialized Properties")]
    SpecializedProperties,
}

impl SubtypeGroup {
    pub const ALL: [SubtypeGroup; 4] = [
        Self::Houses,
        Self::Apartments,
        Self::LuxuryProperties,
        Self::SpecializedProperties,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Houses => "Houses",
            Self::Apartments => "Apartments",
            Self::LuxuryProperties => "Luxury Properties",
            Self::SpecializedProperties => "Specialized Properties",
        }
    }
}

impl fmt::Display for SubtypeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What to do with a subtype label missing from the group table.
///
/// Under both policies a label is first matched ignoring case and
/// surrounding whitespace, so `"Villa"` groups as `Luxury Properties`.
/// Only labels that still match nothing are rejected or passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtypePolicy {
    /// Fail with [`EstimoError::UnknownSubtype`].
    #[default]
    Strict,
    /// Forward an unmatched label unchanged as the category value.
    Lenient,
}

/// Value of the grouped-subtype column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubtypeCategory {
    Group(SubtypeGroup),
    /// Unrecognized label kept as-is under the lenient policy.
    Unmapped(String),
}

impl SubtypeCategory {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Group(group) => group.label(),
            Self::Unmapped(label) => label,
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}

impl fmt::Display for SubtypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw subtype label to its category under the given policy.
pub fn group_subtype(label: &str, policy: SubtypePolicy) -> Result<SubtypeCategory> {
    match PropertySubtype::from_label(label) {
        Some(subtype) => Ok(SubtypeCategory::Group(subtype.group())),
        None => match policy {
            SubtypePolicy::Strict => Err(EstimoError::UnknownSubtype(label.to_string())),
            SubtypePolicy::Lenient => {
                tracing::warn!("Subtype {:?} has no group, passing it through", label);
                Ok(SubtypeCategory::Unmapped(label.to_string()))
            }
        },
    }
}
