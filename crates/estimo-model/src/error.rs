//! Error types for estimo-model

use estimo_core::{EstimoError, Stage};
use thiserror::Error;

/// Result type alias for scoring operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while loading a model or scoring a row
#[derive(Error, Debug)]
pub enum ModelError {
    /// Model artifact missing, unreadable or not a valid tree ensemble
    #[error("Failed to load model from {path}: {reason}")]
    LoadFailure { path: String, reason: String },

    /// Model columns, order or kinds disagree with the feature row layout
    #[error("Feature schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Lookup or feature assembly failed before scoring
    #[error(transparent)]
    Features(#[from] EstimoError),
}

impl ModelError {
    pub(crate) fn load_failure(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::LoadFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Stage of the pipeline that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            Self::LoadFailure { .. } | Self::SchemaMismatch(_) => Stage::Inference,
            Self::Features(err) => err.stage(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_forwarding() {
        let err = ModelError::from(EstimoError::InvalidPostalCode("5800".into()));
        assert_eq!(err.stage(), Stage::Lookup);
        assert_eq!(err.to_string(), "Invalid postal code: 5800");

        let err = ModelError::SchemaMismatch("column 2".into());
        assert_eq!(err.stage(), Stage::Inference);
    }
}
