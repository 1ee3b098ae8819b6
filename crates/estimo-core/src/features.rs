//! Feature row assembly
//!
//! A [`FeatureRow`] is the exact record the price model scores. Its column
//! names, order and kinds are published in [`FeatureRow::SCHEMA`]; the model
//! loader checks a trained model against that constant, so renaming or
//! reordering a column here is a breaking change for every trained artifact.

use serde::{Deserialize, Serialize};

use crate::condition::BuildingCondition;
use crate::error::{EstimoError, Result};
use crate::income::IncomeTable;
use crate::postal::{province_of, PostalCode, Province};
use crate::subtype::{group_subtype, SubtypeCategory, SubtypePolicy};

/// Raw attributes of one property, as a caller submits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInput {
    /// Livable space in square meters
    pub livable_space: i64,
    /// Listing subtype label, e.g. `apartment` or `villa`
    pub subtype: String,
    pub postal_code: PostalCode,
    pub condition: BuildingCondition,
}

/// Column-oriented batch of property inputs.
///
/// All columns must hold the same number of values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyBatch {
    pub livable_space: Vec<i64>,
    pub subtype: Vec<String>,
    pub postal_code: Vec<PostalCode>,
    pub province: Vec<Province>,
    pub condition: Vec<BuildingCondition>,
}

impl PropertyBatch {
    /// A one-row batch.
    pub fn single(input: PropertyInput, province: Province) -> Self {
        Self {
            livable_space: vec![input.livable_space],
            subtype: vec![input.subtype],
            postal_code: vec![input.postal_code],
            province: vec![province],
            condition: vec![input.condition],
        }
    }

    /// Number of rows, after checking every column agrees on it.
    pub fn row_count(&self) -> Result<usize> {
        let expected = self.livable_space.len();
        let columns = [
            ("subtype", self.subtype.len()),
            ("postal_code", self.postal_code.len()),
            ("province", self.province.len()),
            ("condition", self.condition.len()),
        ];
        for (column, actual) in columns {
            if actual != expected {
                return Err(EstimoError::RowMismatch {
                    column,
                    expected,
                    actual,
                });
            }
        }
        Ok(expected)
    }

    pub fn is_empty(&self) -> bool {
        self.livable_space.is_empty()
    }
}

/// How a model column is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Integer,
    Float,
    Categorical,
}

/// Name and kind of one model input column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

/// A single cell of a feature row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue<'a> {
    Integer(i64),
    Float(f64),
    Category(&'a str),
}

impl FeatureValue<'_> {
    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Integer(_) => ColumnKind::Integer,
            Self::Float(_) => ColumnKind::Float,
            Self::Category(_) => ColumnKind::Categorical,
        }
    }
}

/// Ready-to-score model input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    #[serde(rename = "Livable Space (m2)")]
    pub livable_space: i64,
    #[serde(rename = "Avg_Taxable_Income")]
    pub avg_taxable_income: f64,
    #[serde(rename = "Province")]
    pub province: Province,
    #[serde(rename = "State of the Building")]
    pub condition: BuildingCondition,
    #[serde(rename = "Subtype of Property_Grouped")]
    pub subtype_group: SubtypeCategory,
}

impl FeatureRow {
    pub const SCHEMA: [ColumnSpec; 5] = [
        ColumnSpec {
            name: "Livable Space (m2)",
            kind: ColumnKind::Integer,
        },
        ColumnSpec {
            name: "Avg_Taxable_Income",
            kind: ColumnKind::Float,
        },
        ColumnSpec {
            name: "Province",
            kind: ColumnKind::Categorical,
        },
        ColumnSpec {
            name: "State of the Building",
            kind: ColumnKind::Categorical,
        },
        ColumnSpec {
            name: "Subtype of Property_Grouped",
            kind: ColumnKind::Categorical,
        },
    ];

    /// Cell values in [`FeatureRow::SCHEMA`] order.
    pub fn values(&self) -> [FeatureValue<'_>; 5] {
        [
            FeatureValue::Integer(self.livable_space),
            FeatureValue::Float(self.avg_taxable_income),
            FeatureValue::Category(self.province.name()),
            FeatureValue::Category(self.condition.label()),
            FeatureValue::Category(self.subtype_group.as_str()),
        ]
    }

    pub fn column_names() -> impl Iterator<Item = &'static str> {
        Self::SCHEMA.iter().map(|c| c.name)
    }
}

/// Builds feature rows against a loaded income table.
#[derive(Debug, Clone, Copy)]
pub struct FeatureBuilder<'a> {
    income: &'a IncomeTable,
    policy: SubtypePolicy,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(income: &'a IncomeTable) -> Self {
        Self {
            income,
            policy: SubtypePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SubtypePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> SubtypePolicy {
        self.policy
    }

    /// Assemble one row from its parts.
    pub fn build_features(
        &self,
        livable_space: i64,
        subtype: &str,
        postal_code: &PostalCode,
        province: Province,
        condition: BuildingCondition,
    ) -> Result<FeatureRow> {
        if livable_space <= 0 {
            return Err(EstimoError::InvalidLivableSpace(livable_space));
        }
        let avg_taxable_income = self.income.average_income(postal_code)?;
        let subtype_group = group_subtype(subtype, self.policy)?;

        tracing::debug!(
            "Built features for {} ({}): {} m2, {}",
            postal_code,
            province,
            livable_space,
            subtype_group
        );
        Ok(FeatureRow {
            livable_space,
            avg_taxable_income,
            province,
            condition,
            subtype_group,
        })
    }

    /// Assemble one row, deriving the province from the postal code.
    pub fn build(&self, input: &PropertyInput) -> Result<FeatureRow> {
        let province = province_of(input.postal_code)?;
        self.build_features(
            input.livable_space,
            &input.subtype,
            &input.postal_code,
            province,
            input.condition,
        )
    }

    /// Assemble every row of a batch; the first failing row aborts the batch.
    pub fn build_batch(&self, batch: &PropertyBatch) -> Result<Vec<FeatureRow>> {
        let rows = batch.row_count()?;
        (0..rows)
            .map(|i| {
                self.build_features(
                    batch.livable_space[i],
                    &batch.subtype[i],
                    &batch.postal_code[i],
                    batch.province[i],
                    batch.condition[i],
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::income::IncomeRecord;
    use crate::subtype::SubtypeGroup;

    fn table() -> IncomeTable {
        IncomeTable::from_records(vec![
            IncomeRecord {
                postal_code: "1000".to_string(),
                nis_code: "21004".to_string(),
                avg_taxable_income: Some(18_500.55),
            },
            IncomeRecord {
                postal_code: "9000".to_string(),
                nis_code: "44021".to_string(),
                avg_taxable_income: Some(21_300.0),
            },
            IncomeRecord {
                postal_code: "1020".to_string(),
                nis_code: "21004".to_string(),
                avg_taxable_income: None,
            },
        ])
    }

    fn input(subtype: &str, postal: &str) -> PropertyInput {
        PropertyInput {
            livable_space: 80,
            subtype: subtype.to_string(),
            postal_code: PostalCode::parse(postal).unwrap(),
            condition: BuildingCondition::Good,
        }
    }

    #[test]
    fn test_build_apartment_in_brussels() {
        let income = table();
        let row = FeatureBuilder::new(&income)
            .build(&input("apartment", "1000"))
            .unwrap();

        assert_eq!(row.livable_space, 80);
        assert_eq!(row.avg_taxable_income, 18_500.55);
        assert_eq!(row.province, Province::BrusselsCapital);
        assert_eq!(row.condition, BuildingCondition::Good);
        assert_eq!(row.subtype_group, SubtypeCategory::Group(SubtypeGroup::Apartments));
    }

    #[test]
    fn test_values_follow_schema() {
        let income = table();
        let row = FeatureBuilder::new(&income)
            .build(&input("villa", "9000"))
            .unwrap();
        let values = row.values();

        for (spec, value) in FeatureRow::SCHEMA.iter().zip(values.iter()) {
            assert_eq!(spec.kind, value.kind(), "column {}", spec.name);
        }
        assert_eq!(values[2], FeatureValue::Category("Province of East Flanders"));
        assert_eq!(values[4], FeatureValue::Category("Luxury Properties"));
    }

    #[test]
    fn test_column_order() {
        let names: Vec<&str> = FeatureRow::column_names().collect();
        assert_eq!(
            names,
            vec![
                "Livable Space (m2)",
                "Avg_Taxable_Income",
                "Province",
                "State of the Building",
                "Subtype of Property_Grouped",
            ]
        );
    }

    #[test]
    fn test_missing_income_is_rejected() {
        let income = table();
        let builder = FeatureBuilder::new(&income);

        let err = builder.build(&input("house", "1020")).unwrap_err();
        assert!(matches!(err, EstimoError::MissingIncomeData(ref c) if c == "1020"));

        let err = builder.build(&input("house", "4000")).unwrap_err();
        assert!(matches!(err, EstimoError::MissingIncomeData(ref c) if c == "4000"));
    }

    #[test]
    fn test_non_positive_livable_space() {
        let income = table();
        let mut bad = input("house", "1000");
        bad.livable_space = 0;
        assert!(matches!(
            FeatureBuilder::new(&income).build(&bad),
            Err(EstimoError::InvalidLivableSpace(0))
        ));
    }

    #[test]
    fn test_subtype_policy() {
        let income = table();
        let strict = FeatureBuilder::new(&income);
        assert!(matches!(
            strict.build(&input("houseboat", "1000")),
            Err(EstimoError::UnknownSubtype(_))
        ));

        let lenient = strict.with_policy(SubtypePolicy::Lenient);
        let row = lenient.build(&input("houseboat", "1000")).unwrap();
        assert_eq!(row.subtype_group.as_str(), "houseboat");
    }

    #[test]
    fn test_build_batch() {
        let income = table();
        let builder = FeatureBuilder::new(&income);
        let mut batch = PropertyBatch::single(input("kot", "1000"), Province::BrusselsCapital);
        batch.livable_space.push(140);
        batch.subtype.push("house".to_string());
        batch.postal_code.push(PostalCode::parse("9000").unwrap());
        batch.province.push(Province::EastFlanders);
        batch.condition.push(BuildingCondition::ToRenovate);

        let rows = builder.build_batch(&batch).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].livable_space, 140);
        assert_eq!(rows[1].subtype_group.as_str(), "Houses");
    }

    #[test]
    fn test_batch_row_mismatch() {
        let income = table();
        let mut batch = PropertyBatch::single(input("kot", "1000"), Province::BrusselsCapital);
        batch.subtype.push("house".to_string());

        let err = FeatureBuilder::new(&income).build_batch(&batch).unwrap_err();
        assert!(matches!(
            err,
            EstimoError::RowMismatch {
                column: "subtype",
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_feature_row_serializes_with_model_column_names() {
        let income = table();
        let row = FeatureBuilder::new(&income)
            .build(&input("apartment", "1000"))
            .unwrap();
        let text = toml::to_string(&row).unwrap();
        assert!(text.contains("\"Livable Space (m2)\" = 80"));
        assert!(text.contains("Province = \"Brussels-Capital Region\""));
        assert!(text.contains("\"Subtype of Property_Grouped\" = \"Apartments\""));
    }
}
