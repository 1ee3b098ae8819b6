//! End-to-end estimation: postal lookup, feature assembly, scoring

use std::sync::Arc;

use estimo_core::{
    province_of, EstimoConfig, FeatureBuilder, FeatureRow, IncomeTable, PropertyInput, Province,
    SubtypePolicy,
};
use serde::Serialize;

use crate::error::Result;
use crate::price::PredictedPrice;
use crate::scoring::{ModelHandle, PriceModel};

/// Outcome of one estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub province: Province,
    pub features: FeatureRow,
    pub price: PredictedPrice,
}

/// Income table and model loaded once, shared by every request.
#[derive(Debug)]
pub struct Estimator {
    income: IncomeTable,
    model: ModelHandle,
    policy: SubtypePolicy,
}

impl Estimator {
    pub fn new(income: IncomeTable, model: ModelHandle) -> Self {
        Self {
            income,
            model,
            policy: SubtypePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SubtypePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Load the income table eagerly; the model loads on first estimate.
    pub fn from_config(config: &EstimoConfig) -> Result<Self> {
        let income = IncomeTable::load(&config.paths.income_table)?;
        Ok(Self::new(income, ModelHandle::new(&config.paths.model))
            .with_policy(config.features.subtype_policy))
    }

    pub fn income(&self) -> &IncomeTable {
        &self.income
    }

    pub fn policy(&self) -> SubtypePolicy {
        self.policy
    }

    pub fn model(&self) -> Result<Arc<PriceModel>> {
        self.model.get()
    }

    pub fn features(&self, input: &PropertyInput) -> Result<FeatureRow> {
        let province = province_of(input.postal_code)?;
        self.features_in(input, province)
    }

    fn features_in(&self, input: &PropertyInput, province: Province) -> Result<FeatureRow> {
        let row = FeatureBuilder::new(&self.income)
            .with_policy(self.policy)
            .build_features(
                input.livable_space,
                &input.subtype,
                &input.postal_code,
                province,
                input.condition,
            )?;
        Ok(row)
    }

    pub fn estimate(&self, input: &PropertyInput) -> Result<Estimate> {
        let province = province_of(input.postal_code)?;
        let features = self.features_in(input, province)?;
        let price = self.model()?.predict_price(&features)?;

        tracing::info!(
            "Estimated {} m2 {} in {} at {}",
            input.livable_space,
            input.subtype,
            input.postal_code,
            price
        );
        Ok(Estimate {
            province,
            features,
            price,
        })
    }
}
