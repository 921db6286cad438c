//! HTTP surface of the valuation service.

use crate::cagr::{self, CagrParams, IndexPoint, DEFAULT_LOOKBACK_YEARS};
use crate::error::ApiError;
use crate::growth::{self, GrowthForecast, YearValue, DEFAULT_ANNUAL_GROWTH_PCT, DEFAULT_YEARS};
use crate::prediction;
use crate::regions::candidate_labels;
use crate::rppi::IndexObservation;
use crate::state::{AppState, Snapshot};
use axum::extract::{Query, State};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Datelike, NaiveDate};
use propval_core::SERVICE_METRICS;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tracing::{debug, info, warn};

pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/columns", get(columns))
        .route("/predict", post(predict))
        .route("/predict_many", post(predict_many))
        .route("/forecast", post(forecast))
        .route("/rppi/history", get(rppi_history))
        .route("/rppi/forecast", post(rppi_forecast))
        .route("/rppi/regions", get(rppi_regions))
        .route("/rppi/reload", post(rppi_reload))
        .with_state(state)
}

/// `*` anywhere in the list allows every origin without credentials. An
/// explicit list allows credentials, so methods and headers are mirrored
/// from the preflight instead of wildcarded.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o.trim() == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid cors origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

struct HandlerTimer {
    route: &'static str,
    start: Instant,
}

impl HandlerTimer {
    fn start(route: &'static str) -> Self { Self { route, start: Instant::now() } }
}

impl Drop for HandlerTimer {
    fn drop(&mut self) {
        SERVICE_METRICS
            .handler_latency_ms
            .with_label_values(&[self.route])
            .observe(self.start.elapsed().as_secs_f64() * 1000.0);
    }
}

fn count_failure(e: &ApiError) {
    let reason = e.to_string();
    SERVICE_METRICS.prediction_failures_total.with_label_values(&[reason.as_str()]).inc();
}

// ---- prediction ----

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_ready: bool,
    pub num_columns: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snap = state.snapshot();
    Json(HealthResponse {
        status: "ok".into(),
        model_ready: snap.model().is_some(),
        num_columns: snap.model().map(|m| m.columns().len()).unwrap_or(0),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ColumnsResponse {
    pub columns: Vec<String>,
}

pub async fn columns(State(state): State<AppState>) -> Json<ColumnsResponse> {
    let snap = state.snapshot();
    Json(ColumnsResponse { columns: snap.model().map(|m| m.columns().to_vec()).unwrap_or_default() })
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub features: Value,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: f64,
}

pub async fn predict(State(state): State<AppState>, Json(req): Json<PredictRequest>) -> ApiResult<PredictResponse> {
    let _t = HandlerTimer::start("predict");
    let snap = state.snapshot();
    let prediction = prediction::predict_one(snap.model(), &req.features)
        .map_err(ApiError::from)
        .inspect_err(count_failure)?;
    SERVICE_METRICS.predictions_total.with_label_values(&["single"]).inc();
    Ok(Json(PredictResponse { prediction }))
}

#[derive(Debug, Deserialize)]
pub struct PredictManyRequest {
    pub records: Vec<Value>,
}

/// `NaN` slots serialize as `null`.
#[derive(Debug, Serialize)]
pub struct PredictManyResponse {
    pub predictions: Vec<f64>,
}

pub async fn predict_many(State(state): State<AppState>, Json(req): Json<PredictManyRequest>) -> ApiResult<PredictManyResponse> {
    let _t = HandlerTimer::start("predict_many");
    let snap = state.snapshot();
    let predictions = prediction::predict_many(snap.model(), &req.records)
        .map_err(ApiError::from)
        .inspect_err(count_failure)?;
    let failed = predictions.iter().filter(|p| p.is_nan()).count();
    if failed > 0 {
        debug!(failed, total = predictions.len(), "batch records failed alignment");
        SERVICE_METRICS.prediction_failures_total.with_label_values(&["invalid_features"]).inc_by(failed as u64);
    }
    SERVICE_METRICS.predictions_total.with_label_values(&["batch"]).inc_by((predictions.len() - failed) as u64);
    Ok(Json(PredictManyResponse { predictions }))
}

// ---- growth forecast ----

fn default_years() -> i64 { DEFAULT_YEARS }
fn default_growth_pct() -> f64 { DEFAULT_ANNUAL_GROWTH_PCT }
fn default_lookback() -> i64 { DEFAULT_LOOKBACK_YEARS }

#[derive(Debug, Deserialize)]
pub struct ForecastRequest {
    #[serde(default)]
    pub features: Option<Value>,
    #[serde(default)]
    pub current_value: Option<f64>,
    #[serde(default = "default_years")]
    pub years: i64,
    #[serde(default = "default_growth_pct")]
    pub annual_growth_pct: f64,
}

/// An explicit `current_value` wins; otherwise the features are priced by the
/// model. Prediction failures surface as `no_current_value`.
pub async fn forecast(State(state): State<AppState>, Json(req): Json<ForecastRequest>) -> ApiResult<GrowthForecast> {
    let _t = HandlerTimer::start("forecast");
    let current = match req.current_value {
        Some(v) => Some(v),
        None => {
            let snap = state.snapshot();
            req.features.as_ref().and_then(|f| prediction::predict_one(snap.model(), f).ok())
        }
    };
    let current = current.ok_or(ApiError::NoCurrentValue)?;
    SERVICE_METRICS.forecasts_total.with_label_values(&["growth"]).inc();
    Ok(Json(growth::project(current, req.years, req.annual_growth_pct, chrono::Local::now().year())))
}

// ---- region index ----

fn region_history(snap: &Snapshot, region: &str) -> Result<Vec<IndexObservation>, ApiError> {
    let Some(series) = snap.rppi() else {
        SERVICE_METRICS.region_lookups_total.with_label_values(&["unavailable"]).inc();
        return Err(ApiError::RppiUnavailable);
    };
    let hits = series.filter(&candidate_labels(region));
    if hits.is_empty() {
        SERVICE_METRICS.region_lookups_total.with_label_values(&["not_found"]).inc();
        debug!(region, "no index rows for region");
        return Err(ApiError::RegionNotFound { available: series.labels().to_vec() });
    }
    SERVICE_METRICS.region_lookups_total.with_label_values(&["found"]).inc();
    Ok(hits)
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub region: String,
}

#[derive(Debug, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub index: f64,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub region: String,
    pub series: Vec<SeriesPoint>,
}

pub async fn rppi_history(State(state): State<AppState>, Query(q): Query<HistoryQuery>) -> ApiResult<HistoryResponse> {
    let _t = HandlerTimer::start("rppi_history");
    let snap = state.snapshot();
    let series = region_history(&snap, &q.region)?
        .into_iter()
        .map(|o| SeriesPoint { date: o.date, index: o.index })
        .collect();
    Ok(Json(HistoryResponse { region: q.region, series }))
}

#[derive(Debug, Deserialize)]
pub struct RppiForecastRequest {
    pub region: String,
    #[serde(default = "default_years")]
    pub years: i64,
    #[serde(default = "default_lookback")]
    pub lookback_years: i64,
    #[serde(default)]
    pub current_value: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct RppiForecastResponse {
    pub region: String,
    pub as_of: NaiveDate,
    pub index_current: f64,
    /// Percent, two decimals.
    pub cagr: f64,
    pub index_forecast: Vec<IndexPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_forecast: Option<Vec<YearValue>>,
}

pub async fn rppi_forecast(State(state): State<AppState>, Json(req): Json<RppiForecastRequest>) -> ApiResult<RppiForecastResponse> {
    let _t = HandlerTimer::start("rppi_forecast");
    let snap = state.snapshot();
    let history = region_history(&snap, &req.region)?;
    let params = CagrParams { years: req.years, lookback_years: req.lookback_years, current_value: req.current_value };
    let f = cagr::forecast(&history, &params)?;
    SERVICE_METRICS.forecasts_total.with_label_values(&["cagr"]).inc();
    Ok(Json(RppiForecastResponse {
        region: req.region,
        as_of: f.as_of,
        index_current: f.index_current,
        cagr: f.cagr_pct(),
        index_forecast: f.index_forecast,
        value_forecast: f.value_forecast,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegionsResponse {
    pub regions: Vec<String>,
}

pub async fn rppi_regions(State(state): State<AppState>) -> ApiResult<RegionsResponse> {
    let snap = state.snapshot();
    let series = snap.rppi().ok_or(ApiError::RppiUnavailable)?;
    Ok(Json(RegionsResponse { regions: series.labels().to_vec() }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub status: String,
    pub observations: usize,
    pub regions: usize,
}

pub async fn rppi_reload(State(state): State<AppState>) -> ApiResult<ReloadResponse> {
    let _t = HandlerTimer::start("rppi_reload");
    let observations = state.reload_rppi().await.ok_or(ApiError::RppiUnavailable)?;
    let regions = state.snapshot().rppi().map(|s| s.labels().len()).unwrap_or(0);
    info!(observations, regions, "region index reloaded on request");
    Ok(Json(ReloadResponse { status: "ok".into(), observations, regions }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_layers_apply_cleanly() {
        // tower-http rejects wildcard + credentials when the layer is applied
        let _ = Router::<()>::new().layer(cors_layer(&["*".into()]));
        let _ = Router::<()>::new().layer(cors_layer(&["http://localhost:5173".into(), "http://127.0.0.1:5173".into()]));
        let _ = Router::<()>::new().layer(cors_layer(&[]));
    }

    #[test]
    fn forecast_request_defaults() {
        let req: ForecastRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.years, 3);
        assert_eq!(req.annual_growth_pct, 4.0);
        assert!(req.features.is_none() && req.current_value.is_none());
        let req: RppiForecastRequest = serde_json::from_str(r#"{"region":"Perth"}"#).unwrap();
        assert_eq!((req.years, req.lookback_years), (3, 5));
    }

    #[test]
    fn nan_predictions_serialize_as_null() {
        let body = serde_json::to_value(PredictManyResponse { predictions: vec![1.5, f64::NAN] }).unwrap();
        assert_eq!(body, serde_json::json!({"predictions": [1.5, null]}));
    }
}
