//! Postal code → average taxable income reference table
//!
//! The table is derived offline by [`build_income_table`] from two public
//! datasets and persisted as CSV with the columns `Post code`, `nisCode` and
//! `Avg_Taxable_Income`. At runtime it is loaded once with
//! [`IncomeTable::load`] and only read afterwards.
//!
//! # Build rules
//!
//! - Geo-reference rows are deduplicated per postal code; the row with the
//!   lowest municipality (NIS) code wins, whatever the input order.
//! - Income rows are filtered to one fiscal year and averaged as
//!   total net taxable income / number of non-zero filers, rounded to cents.
//! - The join is a left join: postal codes without income keep an empty figure.
//! - Known-bad postal codes are dropped from the result.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EstimoError, Result, TableError};
use crate::postal::PostalCode;
use crate::round_cents;

/// One row of the derived income table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeRecord {
    #[serde(rename = "Post code")]
    pub postal_code: String,
    #[serde(rename = "nisCode")]
    pub nis_code: String,
    #[serde(rename = "Avg_Taxable_Income")]
    pub avg_taxable_income: Option<f64>,
}

/// Read-only postal code → income lookup, ordered by postal code.
#[derive(Debug, Clone, Default)]
pub struct IncomeTable {
    records: BTreeMap<String, IncomeRecord>,
}

impl IncomeTable {
    /// Build a table from records; the first record for a postal code wins.
    pub fn from_records(records: impl IntoIterator<Item = IncomeRecord>) -> Self {
        let mut table = BTreeMap::new();
        for record in records {
            if table.contains_key(&record.postal_code) {
                tracing::warn!(
                    "Duplicate postal code {} in income table, keeping first",
                    record.postal_code
                );
                continue;
            }
            table.insert(record.postal_code.clone(), record);
        }
        Self { records: table }
    }

    /// Load the derived table from a CSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = open_csv(path, b',')?;
        let records = reader
            .deserialize::<IncomeRecord>()
            .map(|row| row.map_err(|e| invalid_format(path, e)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let table = Self::from_records(records.into_iter().map(|mut record| {
            record.postal_code = normalize_code(&record.postal_code);
            record
        }));
        tracing::debug!("Loaded {} income records from {:?}", table.len(), path);
        Ok(table)
    }

    /// Persist the table in the same CSV layout [`IncomeTable::load`] reads.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| TableError::OpenFailed(format!("{}: {}", path.display(), e)))?;
        for record in self.records.values() {
            writer
                .serialize(record)
                .map_err(|e| TableError::Io(e.to_string()))?;
        }
        writer.flush().map_err(|e| TableError::Io(e.to_string()))?;
        tracing::debug!("Wrote {} income records to {:?}", self.len(), path);
        Ok(())
    }

    pub fn get(&self, postal_code: &str) -> Option<&IncomeRecord> {
        self.records.get(postal_code)
    }

    /// Average taxable income for a postal code.
    ///
    /// Fails with [`EstimoError::MissingIncomeData`] when the code is absent or
    /// its joined income figure is empty.
    pub fn average_income(&self, postal_code: &PostalCode) -> Result<f64> {
        let key = postal_code.to_string();
        self.records
            .get(&key)
            .and_then(|record| record.avg_taxable_income)
            .filter(|income| income.is_finite())
            .ok_or(EstimoError::MissingIncomeData(key))
    }

    /// Known postal codes in ascending order.
    pub fn postal_codes(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(|k| k.as_str())
    }

    pub fn records(&self) -> impl Iterator<Item = &IncomeRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Options for [`build_income_table`]
#[derive(Debug, Clone, PartialEq)]
pub struct IncomeBuildOptions {
    /// Fiscal year kept from the income dataset
    pub year: i32,
    /// Postal codes dropped from the result
    pub excluded_postal_codes: Vec<String>,
    pub geo_delimiter: u8,
    pub income_delimiter: u8,
}

impl Default for IncomeBuildOptions {
    fn default() -> Self {
        Self {
            year: 2022,
            excluded_postal_codes: vec!["9".to_string(), "612".to_string()],
            geo_delimiter: b',',
            income_delimiter: b',',
        }
    }
}

impl IncomeBuildOptions {
    pub fn for_year(year: i32) -> Self {
        Self {
            year,
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeoRow {
    #[serde(rename = "Post code")]
    postal_code: String,
    #[serde(rename = "Municipality code")]
    municipality_code: String,
}

/// Measures stay optional; blank cells only matter in the selected year.
#[derive(Debug, Deserialize)]
struct IncomeRow {
    #[serde(rename = "CD_YEAR")]
    year: Option<i32>,
    #[serde(rename = "CD_MUNTY_REFNIS")]
    municipality_code: String,
    #[serde(rename = "MS_TOT_NET_TAXABLE_INC")]
    total_taxable_income: Option<f64>,
    #[serde(rename = "MS_NBR_NON_ZERO_INC")]
    non_zero_filers: Option<f64>,
}

impl IncomeRow {
    /// Average income, or `None` when either measure is blank or there are no filers.
    fn average(&self, nis: i64, year: i32) -> Option<f64> {
        let Some(total) = self.total_taxable_income else {
            tracing::warn!("Municipality {} has no total taxable income in {}", nis, year);
            return None;
        };
        match self.non_zero_filers {
            Some(filers) if filers > 0.0 => Some(round_cents(total / filers)),
            _ => {
                tracing::warn!("Municipality {} has no non-zero filers in {}", nis, year);
                None
            }
        }
    }
}

/// Join the geo-reference table to the income table for one year.
pub fn build_income_table(
    geo_path: impl AsRef<Path>,
    income_path: impl AsRef<Path>,
    options: &IncomeBuildOptions,
) -> Result<IncomeTable> {
    let postal_to_nis = read_geo_reference(geo_path.as_ref(), options.geo_delimiter)?;
    let income_by_nis = read_income(income_path.as_ref(), options)?;

    let mut missing = 0usize;
    let records: Vec<IncomeRecord> = postal_to_nis
        .into_iter()
        .filter(|(postal_code, _)| !options.excluded_postal_codes.contains(postal_code))
        .map(|(postal_code, (_, nis_code))| {
            let avg_taxable_income = income_by_nis.get(&nis_code).copied().flatten();
            if avg_taxable_income.is_none() {
                missing += 1;
            }
            IncomeRecord {
                postal_code,
                nis_code,
                avg_taxable_income,
            }
        })
        .collect();

    if missing > 0 {
        tracing::warn!(
            "{} postal codes have no {} income figure",
            missing,
            options.year
        );
    }
    let table = IncomeTable::from_records(records);
    tracing::info!(
        "Built income table for {}: {} postal codes",
        options.year,
        table.len()
    );
    Ok(table)
}

/// Postal code → (numeric NIS code, NIS code), lowest NIS code per postal code.
fn read_geo_reference(path: &Path, delimiter: u8) -> Result<BTreeMap<String, (i64, String)>> {
    let mut reader = open_csv(path, delimiter)?;
    let mut postal_to_nis: BTreeMap<String, (i64, String)> = BTreeMap::new();
    let mut duplicates = 0usize;

    for row in reader.deserialize::<GeoRow>() {
        let row = row.map_err(|e| invalid_format(path, e))?;
        let Some(nis) = parse_integer_like(&row.municipality_code) else {
            tracing::warn!(
                "Skipping postal code {:?} with municipality code {:?}",
                row.postal_code,
                row.municipality_code
            );
            continue;
        };
        let postal_code = normalize_code(&row.postal_code);

        match postal_to_nis.get_mut(&postal_code) {
            Some(existing) => {
                duplicates += 1;
                if nis < existing.0 {
                    *existing = (nis, nis.to_string());
                }
            }
            None => {
                postal_to_nis.insert(postal_code, (nis, nis.to_string()));
            }
        }
    }

    tracing::debug!(
        "Read {} postal codes from {:?} ({} duplicate rows collapsed)",
        postal_to_nis.len(),
        path,
        duplicates
    );
    Ok(postal_to_nis)
}

/// NIS code → average income for the requested year (`None` when no filers).
fn read_income(path: &Path, options: &IncomeBuildOptions) -> Result<HashMap<String, Option<f64>>> {
    let mut reader = open_csv(path, options.income_delimiter)?;
    let mut income_by_nis = HashMap::new();

    for row in reader.deserialize::<IncomeRow>() {
        let row = row.map_err(|e| invalid_format(path, e))?;
        if row.year != Some(options.year) {
            continue;
        }
        let Some(nis) = parse_integer_like(&row.municipality_code) else {
            tracing::warn!("Skipping income row with municipality {:?}", row.municipality_code);
            continue;
        };

        let average = row.average(nis, options.year);

        match income_by_nis.entry(nis.to_string()) {
            Entry::Occupied(_) => {
                tracing::warn!("Duplicate income row for municipality {}, keeping first", nis);
            }
            Entry::Vacant(slot) => {
                slot.insert(average);
            }
        }
    }

    tracing::debug!(
        "Read {} municipalities for {} from {:?}",
        income_by_nis.len(),
        options.year,
        path
    );
    Ok(income_by_nis)
}

fn open_csv(path: &Path, delimiter: u8) -> Result<csv::Reader<BufReader<File>>> {
    if !path.exists() {
        return Err(TableError::FileNotFound(path.display().to_string()).into());
    }
    let file = File::open(path)
        .map_err(|e| TableError::OpenFailed(format!("{}: {}", path.display(), e)))?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file)))
}

fn invalid_format(path: &Path, err: csv::Error) -> EstimoError {
    TableError::InvalidFormat {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
    .into()
}

/// Parse integer-like text such as `21004` or `21004.0`.
fn parse_integer_like(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }
    let value = trimmed.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 {
        Some(value as i64)
    } else {
        None
    }
}

/// Canonical text form of a code column (`1000.0` → `1000`).
fn normalize_code(raw: &str) -> String {
    parse_integer_like(raw)
        .map(|n| n.to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(postal: &str, income: Option<f64>) -> IncomeRecord {
        IncomeRecord {
            postal_code: postal.to_string(),
            nis_code: "21004".to_string(),
            avg_taxable_income: income,
        }
    }

    #[test]
    fn test_parse_integer_like() {
        assert_eq!(parse_integer_like("21004"), Some(21004));
        assert_eq!(parse_integer_like(" 21004.0 "), Some(21004));
        assert_eq!(parse_integer_like("21004.5"), None);
        assert_eq!(parse_integer_like(""), None);
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("1000.0"), "1000");
        assert_eq!(normalize_code(" 1000 "), "1000");
        assert_eq!(normalize_code("B-1000"), "B-1000");
    }

    #[test]
    fn test_average_income_lookup() {
        let table = IncomeTable::from_records(vec![
            record("1000", Some(18_500.55)),
            record("1020", None),
        ]);
        let brussels = PostalCode::parse("1000").unwrap();
        assert_eq!(table.average_income(&brussels).unwrap(), 18_500.55);

        let laeken = PostalCode::parse("1020").unwrap();
        assert!(matches!(
            table.average_income(&laeken),
            Err(EstimoError::MissingIncomeData(ref code)) if code == "1020"
        ));

        let absent = PostalCode::parse("9000").unwrap();
        assert!(matches!(
            table.average_income(&absent),
            Err(EstimoError::MissingIncomeData(_))
        ));
    }

    #[test]
    fn test_first_record_wins() {
        let table = IncomeTable::from_records(vec![
            record("1000", Some(1.0)),
            record("1000", Some(2.0)),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("1000").unwrap().avg_taxable_income, Some(1.0));
    }

    #[test]
    fn test_postal_codes_sorted() {
        let table = IncomeTable::from_records(vec![
            record("9000", Some(1.0)),
            record("1000", Some(1.0)),
            record("4000", Some(1.0)),
        ]);
        let codes: Vec<&str> = table.postal_codes().collect();
        assert_eq!(codes, vec!["1000", "4000", "9000"]);
    }

    #[test]
    fn test_income_row_average() {
        let row = |total: Option<f64>, filers: Option<f64>| IncomeRow {
            year: Some(2022),
            municipality_code: "21004".to_string(),
            total_taxable_income: total,
            non_zero_filers: filers,
        };
        assert_eq!(row(Some(1_000_000.0), Some(500.0)).average(21004, 2022), Some(2000.0));
        assert_eq!(row(None, Some(500.0)).average(21004, 2022), None);
        assert_eq!(row(Some(1_000_000.0), None).average(21004, 2022), None);
        assert_eq!(row(Some(100.0), Some(0.0)).average(21004, 2022), None);
    }

    #[test]
    fn test_default_build_options() {
        let options = IncomeBuildOptions::default();
        assert_eq!(options.year, 2022);
        assert_eq!(options.excluded_postal_codes, vec!["9", "612"]);
        assert_eq!(IncomeBuildOptions::for_year(2021).year, 2021);
    }
}
