//! Scoring adapter
//!
//! [`PriceModel`] binds a tree ensemble to the [`FeatureRow`] layout. Loading
//! checks the model's column names, order and kinds against
//! [`FeatureRow::SCHEMA`] and builds one encoder per column; categorical
//! labels are encoded as their index in the model's `category_vocabularies`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use estimo_core::{ColumnKind, FeatureRow, FeatureValue};

use crate::ensemble::{LearnerDocument, ModelDocument, TreeEnsemble};
use crate::error::{ModelError, Result};
use crate::price::PredictedPrice;

#[derive(Debug, Clone)]
enum ColumnEncoder {
    Numeric,
    Categorical {
        column: &'static str,
        codes: HashMap<String, u32>,
    },
}

fn accepts(kind: ColumnKind, model_type: &str) -> bool {
    match kind {
        ColumnKind::Integer => matches!(model_type, "int" | "q"),
        ColumnKind::Float => matches!(model_type, "float" | "q"),
        ColumnKind::Categorical => model_type == "c",
    }
}

fn expected_type(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Integer => "int",
        ColumnKind::Float => "float",
        ColumnKind::Categorical => "c",
    }
}

fn check_schema(
    learner: &LearnerDocument,
    vocabularies: &HashMap<String, Vec<String>>,
) -> Result<Vec<ColumnEncoder>> {
    let names = &learner.feature_names;
    if names.len() != FeatureRow::SCHEMA.len() {
        return Err(ModelError::SchemaMismatch(format!(
            "model has {} columns {:?}, feature rows have {} {:?}",
            names.len(),
            names,
            FeatureRow::SCHEMA.len(),
            FeatureRow::column_names().collect::<Vec<_>>()
        )));
    }
    if learner.feature_types.len() != names.len() {
        return Err(ModelError::SchemaMismatch(format!(
            "model declares {} feature types for {} columns",
            learner.feature_types.len(),
            names.len()
        )));
    }

    let mut encoders = Vec::with_capacity(names.len());
    for (i, spec) in FeatureRow::SCHEMA.iter().enumerate() {
        if names[i] != spec.name {
            return Err(ModelError::SchemaMismatch(format!(
                "column {}: model has {:?}, feature row has {:?}",
                i, names[i], spec.name
            )));
        }
        let model_type = learner.feature_types[i].as_str();
        if !accepts(spec.kind, model_type) {
            return Err(ModelError::SchemaMismatch(format!(
                "column {:?}: model type {:?}, expected {:?}",
                spec.name,
                model_type,
                expected_type(spec.kind)
            )));
        }

        let encoder = match spec.kind {
            ColumnKind::Integer | ColumnKind::Float => ColumnEncoder::Numeric,
            ColumnKind::Categorical => {
                let vocabulary = vocabularies.get(spec.name).ok_or_else(|| {
                    ModelError::SchemaMismatch(format!(
                        "no category vocabulary for column {:?}",
                        spec.name
                    ))
                })?;
                let mut codes = HashMap::with_capacity(vocabulary.len());
                for (code, label) in vocabulary.iter().enumerate() {
                    if codes.insert(label.clone(), code as u32).is_some() {
                        return Err(ModelError::SchemaMismatch(format!(
                            "duplicate category {:?} in column {:?}",
                            label, spec.name
                        )));
                    }
                }
                ColumnEncoder::Categorical {
                    column: spec.name,
                    codes,
                }
            }
        };
        encoders.push(encoder);
    }
    Ok(encoders)
}

/// A trained price model ready to score feature rows.
#[derive(Debug, Clone)]
pub struct PriceModel {
    ensemble: TreeEnsemble,
    encoders: Vec<ColumnEncoder>,
    source: PathBuf,
}

impl PriceModel {
    /// Load and validate a model file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        if !path.exists() {
            return Err(ModelError::load_failure(shown, "file not found"));
        }
        let bytes = std::fs::read(path).map_err(|e| ModelError::load_failure(&shown, e))?;
        let document: ModelDocument =
            serde_json::from_slice(&bytes).map_err(|e| ModelError::load_failure(&shown, e))?;
        let model = Self::from_document(document, path.to_path_buf())?;

        tracing::info!(
            "Loaded price model from {} ({} trees)",
            shown,
            model.ensemble.num_trees()
        );
        Ok(model)
    }

    /// Load a model from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: ModelDocument =
            serde_json::from_str(json).map_err(|e| ModelError::load_failure("<memory>", e))?;
        Self::from_document(document, PathBuf::from("<memory>"))
    }

    fn from_document(document: ModelDocument, source: PathBuf) -> Result<Self> {
        let encoders = check_schema(&document.learner, &document.category_vocabularies)?;
        let ensemble = TreeEnsemble::from_learner(&document.learner, encoders.len())
            .map_err(|reason| ModelError::load_failure(source.display().to_string(), reason))?;
        Ok(Self {
            ensemble,
            encoders,
            source,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn ensemble(&self) -> &TreeEnsemble {
        &self.ensemble
    }

    /// Encode a row for the ensemble. Labels the model never saw become
    /// missing values and follow each split's default direction.
    pub fn encode(&self, row: &FeatureRow) -> Result<Vec<f32>> {
        self.encoders
            .iter()
            .zip(row.values())
            .map(|(encoder, value)| match (encoder, value) {
                (ColumnEncoder::Numeric, FeatureValue::Integer(v)) => Ok(v as f32),
                (ColumnEncoder::Numeric, FeatureValue::Float(v)) => Ok(v as f32),
                (ColumnEncoder::Categorical { column, codes }, FeatureValue::Category(label)) => {
                    Ok(match codes.get(label) {
                        Some(&code) => code as f32,
                        None => {
                            tracing::warn!(
                                "Category {:?} unseen in training for column {:?}, scoring as missing",
                                label,
                                column
                            );
                            f32::NAN
                        }
                    })
                }
                (_, value) => Err(ModelError::SchemaMismatch(format!(
                    "cannot encode {:?} value for this column",
                    value.kind()
                ))),
            })
            .collect()
    }

    /// Raw model output on the log scale.
    pub fn predict_raw(&self, row: &FeatureRow) -> Result<f64> {
        let encoded = self.encode(row)?;
        Ok(self.ensemble.predict_margin(&encoded))
    }

    pub fn predict_price(&self, row: &FeatureRow) -> Result<PredictedPrice> {
        let raw = self.predict_raw(row)?;
        let price = PredictedPrice::from_raw(raw);
        tracing::debug!("Scored row: raw {:.6} -> {}", raw, price);
        Ok(price)
    }

    pub fn predict_batch(&self, rows: &[FeatureRow]) -> Result<Vec<PredictedPrice>> {
        rows.iter().map(|row| self.predict_price(row)).collect()
    }
}

/// Load the model at `model_path` and score one row.
///
/// Reloads on every call; use [`ModelHandle`] to load once.
pub fn predict_price(model_path: impl AsRef<Path>, row: &FeatureRow) -> Result<PredictedPrice> {
    PriceModel::load(model_path)?.predict_price(row)
}

/// Lazily loaded model shared across callers.
///
/// The model is read on first use. A failed load is not cached, so a later
/// call retries.
#[derive(Debug)]
pub struct ModelHandle {
    path: PathBuf,
    model: OnceLock<Arc<PriceModel>>,
}

impl ModelHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            model: OnceLock::new(),
        }
    }

    /// Handle around an already loaded model.
    pub fn preloaded(model: PriceModel) -> Self {
        let path = model.source.clone();
        let handle = Self::new(path);
        let _ = handle.model.set(Arc::new(model));
        handle
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    pub fn get(&self) -> Result<Arc<PriceModel>> {
        if let Some(model) = self.model.get() {
            return Ok(Arc::clone(model));
        }
        let loaded = Arc::new(PriceModel::load(&self.path)?);
        // A concurrent first call may have won; keep whichever landed first
        Ok(Arc::clone(self.model.get_or_init(|| loaded)))
    }
}
