//! Error types for estimo-core

use thiserror::Error;

/// Result type alias for estimo operations
pub type Result<T> = std::result::Result<T, EstimoError>;

/// Pipeline stage a failure belongs to, reported to callers alongside the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Lookup,
    Features,
    Inference,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lookup => "lookup",
            Self::Features => "features",
            Self::Inference => "inference",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for feature preparation
#[derive(Error, Debug)]
pub enum EstimoError {
    /// Malformed postal code, or a prefix no province rule covers
    #[error("Invalid postal code: {0}")]
    InvalidPostalCode(String),

    /// Postal code absent from the income table, or present without a figure
    #[error("No income data for postal code {0}")]
    MissingIncomeData(String),

    #[error("Unknown property subtype: {0}")]
    UnknownSubtype(String),

    #[error("Unknown building condition: {0}")]
    UnknownCondition(String),

    #[error("Unknown province: {0}")]
    UnknownProvince(String),

    #[error("Livable space must be positive, got {0}")]
    InvalidLivableSpace(i64),

    /// Batched columns of different lengths
    #[error("Row mismatch: column {column} has {actual} values, expected {expected}")]
    RowMismatch {
        column: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Reference table could not be read or written
    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

impl EstimoError {
    /// Stage of the pipeline that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            Self::InvalidPostalCode(_) | Self::UnknownProvince(_) | Self::Table(_) => Stage::Lookup,
            Self::MissingIncomeData(_)
            | Self::UnknownSubtype(_)
            | Self::UnknownCondition(_)
            | Self::InvalidLivableSpace(_)
            | Self::RowMismatch { .. } => Stage::Features,
        }
    }
}

/// Errors reading or writing the CSV reference tables
#[derive(Error, Debug)]
pub enum TableError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to open file: {0}")]
    OpenFailed(String),

    #[error("Invalid format in {path}: {reason}")]
    InvalidFormat { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_stages() {
        assert_eq!(
            EstimoError::InvalidPostalCode("12".into()).stage(),
            Stage::Lookup
        );
        assert_eq!(
            EstimoError::MissingIncomeData("1000".into()).stage(),
            Stage::Features
        );
        assert_eq!(Stage::Inference.to_string(), "inference");
    }

    #[test]
    fn test_error_messages_name_the_input() {
        let err = EstimoError::UnknownSubtype("igloo".into());
        assert!(err.to_string().contains("igloo"));

        let err = EstimoError::RowMismatch {
            column: "subtype",
            expected: 2,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "Row mismatch: column subtype has 1 values, expected 2"
        );
    }
}
