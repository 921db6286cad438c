//! Service metric groups registered on the default prometheus registry.
//!
//! Label values are kept to small fixed sets (route names, outcome tags).

use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

pub struct ServiceMetrics {
    pub predictions_total: IntCounterVec,
    pub prediction_failures_total: IntCounterVec,
    pub forecasts_total: IntCounterVec,
    pub region_lookups_total: IntCounterVec,
    pub reloads_total: IntCounterVec,
    pub handler_latency_ms: HistogramVec,
}

pub static SERVICE_METRICS: Lazy<ServiceMetrics> = Lazy::new(|| {
    ServiceMetrics {
        predictions_total: register_int_counter_vec!("propval_predictions_total", "Predictions served", &["mode"])
            .expect("register propval_predictions_total"),
        prediction_failures_total: register_int_counter_vec!("propval_prediction_failures_total", "Predictions rejected before reaching the model", &["reason"])
            .expect("register propval_prediction_failures_total"),
        forecasts_total: register_int_counter_vec!("propval_forecasts_total", "Forecasts computed", &["kind"])
            .expect("register propval_forecasts_total"),
        region_lookups_total: register_int_counter_vec!("propval_region_lookups_total", "Region index lookups by outcome", &["outcome"])
            .expect("register propval_region_lookups_total"),
        reloads_total: register_int_counter_vec!("propval_rppi_reloads_total", "Region index reload attempts", &["outcome"])
            .expect("register propval_rppi_reloads_total"),
        handler_latency_ms: register_histogram_vec!(
            "propval_handler_latency_ms",
            "Handler latency (ms)",
            &["route"],
            vec![0.1, 0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 500.0]
        )
        .expect("register propval_handler_latency_ms"),
    }
});
