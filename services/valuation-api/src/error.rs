use crate::cagr::CagrError;
use crate::prediction::PredictError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Domain failures reported in the response body. The status stays 200 so
/// clients branch on the `error` tag alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("model_not_ready")]
    ModelNotReady,
    #[error("invalid_features")]
    InvalidFeatures,
    #[error("no_current_value")]
    NoCurrentValue,
    #[error("rppi_unavailable")]
    RppiUnavailable,
    #[error("region_not_found")]
    RegionNotFound { available: Vec<String> },
    #[error("insufficient_history")]
    InsufficientHistory,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<Vec<String>>,
}

impl ApiError {
    pub fn body(&self) -> ErrorBody {
        let available = match self {
            Self::RegionNotFound { available } => Some(available.clone()),
            _ => None,
        };
        ErrorBody { error: self.to_string(), available }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response { (StatusCode::OK, Json(self.body())).into_response() }
}

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        match e {
            PredictError::ModelNotReady => Self::ModelNotReady,
            PredictError::InvalidFeatures => Self::InvalidFeatures,
        }
    }
}

impl From<CagrError> for ApiError {
    fn from(e: CagrError) -> Self {
        match e {
            CagrError::InsufficientHistory => Self::InsufficientHistory,
        }
    }
}
