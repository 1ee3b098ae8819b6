//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use estimo_core::{
    province_for, BuildingCondition, FeatureRow, PostalCode, PostalCodeInput, PropertyInput,
    PropertySubtype, Province, Result as CoreResult,
};

use crate::error::ApiError;
use crate::AppState;

/// Liveness check
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "postcodes": state.estimator.income().len(),
    }))
}

/// Response for a province lookup
#[derive(Debug, Serialize)]
pub struct ProvinceResponse {
    pub postal_code: String,
    pub province: Province,
}

/// Resolve a postal code to its province
pub async fn get_province(Path(postal_code): Path<String>) -> Result<Json<ProvinceResponse>, ApiError> {
    let province = province_for(&postal_code)?;
    Ok(Json(ProvinceResponse {
        postal_code: postal_code.trim().to_string(),
        province,
    }))
}

/// Response for the postal code listing
#[derive(Debug, Serialize)]
pub struct PostcodesResponse {
    pub postcodes: Vec<String>,
}

/// Postal codes present in the income table, ascending
pub async fn list_postcodes(State(state): State<Arc<AppState>>) -> Json<PostcodesResponse> {
    let postcodes = state
        .estimator
        .income()
        .postal_codes()
        .map(str::to_string)
        .collect();
    Json(PostcodesResponse { postcodes })
}

/// A subtype label and the group it is scored as
#[derive(Debug, Serialize)]
pub struct SubtypeSummary {
    pub subtype: &'static str,
    pub group: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SubtypesResponse {
    pub subtypes: Vec<SubtypeSummary>,
}

pub async fn list_subtypes() -> Json<SubtypesResponse> {
    let subtypes = PropertySubtype::ALL
        .iter()
        .map(|s| SubtypeSummary {
            subtype: s.label(),
            group: s.group().label(),
        })
        .collect();
    Json(SubtypesResponse { subtypes })
}

#[derive(Debug, Serialize)]
pub struct ConditionsResponse {
    pub conditions: Vec<&'static str>,
}

pub async fn list_conditions() -> Json<ConditionsResponse> {
    let conditions = BuildingCondition::ALL.iter().map(|c| c.label()).collect();
    Json(ConditionsResponse { conditions })
}

/// Request body for `/features` and `/predict`
#[derive(Debug, Clone, Deserialize)]
pub struct EstimateRequest {
    pub livable_space: i64,
    pub subtype: String,
    pub postal_code: PostalCodeInput,
    pub condition: String,
}

impl EstimateRequest {
    pub fn into_input(self) -> CoreResult<PropertyInput> {
        Ok(PropertyInput {
            livable_space: self.livable_space,
            subtype: self.subtype,
            postal_code: PostalCode::try_from(self.postal_code)?,
            condition: self.condition.parse()?,
        })
    }
}

/// Assemble the model input row without scoring it
pub async fn build_features(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<Json<FeatureRow>, ApiError> {
    let Json(request) = payload?;
    let input = request.into_input()?;
    let row = state.estimator.features(&input)?;
    Ok(Json(row))
}

/// Response for a price estimate
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub price: f64,
    pub formatted: String,
    pub province: Province,
    pub features: FeatureRow,
}

/// Estimate the price of one property
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = payload?;
    let input = request.into_input()?;
    let estimate = state.estimator.estimate(&input)?;

    Ok(Json(PredictResponse {
        price: estimate.price.value(),
        formatted: estimate.price.formatted(),
        province: estimate.province,
        features: estimate.features,
    }))
}
