//! Mapping of library errors to HTTP responses

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use estimo_core::{EstimoError, Stage};
use estimo_model::ModelError;

/// An error response: `{"error": <message>, "stage": <stage>}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub stage: Stage,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            stage,
            message: message.into(),
        }
    }
}

fn status_for(err: &EstimoError) -> StatusCode {
    match err {
        EstimoError::MissingIncomeData(_) => StatusCode::NOT_FOUND,
        EstimoError::Table(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EstimoError::InvalidPostalCode(_)
        | EstimoError::UnknownSubtype(_)
        | EstimoError::UnknownCondition(_)
        | EstimoError::UnknownProvince(_)
        | EstimoError::InvalidLivableSpace(_)
        | EstimoError::RowMismatch { .. } => StatusCode::BAD_REQUEST,
    }
}

impl From<EstimoError> for ApiError {
    fn from(err: EstimoError) -> Self {
        Self {
            status: status_for(&err),
            stage: err.stage(),
            message: err.to_string(),
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Features(inner) => inner.into(),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                stage: other.stage(),
                message: other.to_string(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(Stage::Features, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{} failed: {}", self.stage, self.message);
        } else {
            tracing::debug!("Rejected request at {}: {}", self.stage, self.message);
        }
        let body = json!({
            "error": self.message,
            "stage": self.stage.as_str(),
        });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = ApiError::from(EstimoError::InvalidPostalCode("5800".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.stage, Stage::Lookup);

        let err = ApiError::from(ModelError::from(EstimoError::MissingIncomeData("1020".into())));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.stage, Stage::Features);

        let err = ApiError::from(ModelError::SchemaMismatch("column 2".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.stage, Stage::Inference);
    }
}
