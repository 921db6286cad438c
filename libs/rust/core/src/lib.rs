//! Core shared utilities for PropVal services.

use anyhow::Result;
use axum::{routing::get, Router};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod metrics_ext;
pub use metrics_ext::{ServiceMetrics, SERVICE_METRICS};

static TRACING_INIT: OnceCell<()> = OnceCell::new();
static CONFIG_CACHE: OnceCell<RwLock<ServiceConfig>> = OnceCell::new();
static NODE_LIVENESS: AtomicBool = AtomicBool::new(true);
static NODE_READINESS: AtomicBool = AtomicBool::new(false);

pub fn mark_ready() { NODE_READINESS.store(true, Ordering::SeqCst); }
pub fn clear_ready() { NODE_READINESS.store(false, Ordering::SeqCst); }
pub fn mark_not_live() { NODE_LIVENESS.store(false, Ordering::SeqCst); }
pub fn is_ready() -> bool { NODE_READINESS.load(Ordering::SeqCst) }
pub fn is_live() -> bool { NODE_LIVENESS.load(Ordering::SeqCst) }

/// Installs the global subscriber once. `RUST_LOG` wins over `default_level`;
/// `PROPVAL_JSON_LOG=1|true` switches to flattened JSON lines.
pub fn init_tracing(service: &str, default_level: &str) -> Result<()> {
    TRACING_INIT.get_or_try_init(|| {
        let json = std::env::var("PROPVAL_JSON_LOG").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        let fmt_layer = if json {
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true)
                .boxed()
        };
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},tower_http=info")));
        tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init()?;
        Ok::<(), anyhow::Error>(())
    })?;
    info!(target: "propval_core", service, "tracing initialized");
    Ok(())
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServiceConfig {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    pub health_port: u16,
    pub dataset_path: PathBuf,
    pub rppi_path: PathBuf,
    pub rppi_url: Option<String>,
    pub watch_rppi: bool,
    pub cors_origins: Vec<String>,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "propval".into(),
            host: "0.0.0.0".into(),
            port: 8000,
            health_port: 9091,
            dataset_path: PathBuf::from("house_prices.csv"),
            rppi_path: PathBuf::from("rppi.csv"),
            rppi_url: None,
            watch_rppi: false,
            cors_origins: vec!["*".into()],
            log_level: "info".into(),
        }
    }
}

impl ServiceConfig {
    /// Remote index URL, ignoring blank values left behind by empty env vars.
    pub fn rppi_url(&self) -> Option<&str> {
        self.rppi_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Layers defaults, the optional `PROPVAL_CONFIG_FILE`, then `PROPVAL__*` env vars.
pub fn load_config(service: &str) -> Result<ServiceConfig> {
    let defaults = ServiceConfig::default();
    let mut builder = config::Config::builder()
        .set_default("service_name", service)?
        .set_default("host", defaults.host.clone())?
        .set_default("port", defaults.port as i64)?
        .set_default("health_port", defaults.health_port as i64)?
        .set_default("dataset_path", defaults.dataset_path.to_string_lossy().to_string())?
        .set_default("rppi_path", defaults.rppi_path.to_string_lossy().to_string())?
        .set_default("watch_rppi", defaults.watch_rppi)?
        .set_default("cors_origins", defaults.cors_origins.clone())?
        .set_default("log_level", defaults.log_level.clone())?;

    if let Ok(file) = std::env::var("PROPVAL_CONFIG_FILE") {
        builder = builder.add_source(config::File::with_name(&file).required(false));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("PROPVAL")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("cors_origins"),
    );
    let cfg: ServiceConfig = builder.build()?.try_deserialize()?;
    let lock = CONFIG_CACHE.get_or_init(|| RwLock::new(cfg.clone()));
    *lock.write() = cfg.clone();
    Ok(cfg)
}

pub fn health_router() -> Router {
    Router::new()
        .route("/live", get(|| async { axum::Json(serde_json::json!({"live": is_live()})) }))
        .route("/ready", get(|| async { axum::Json(serde_json::json!({"ready": is_ready()})) }))
        .route("/status", get(|| async {
            axum::Json(serde_json::json!({
                "live": is_live(),
                "ready": is_ready(),
                "service": CONFIG_CACHE.get().map(|c| c.read().service_name.clone()),
                "version": env!("CARGO_PKG_VERSION"),
            }))
        }))
        .route("/metrics", get(metrics_handler))
}

/// Binds the probe listener before returning so port clashes surface at startup.
pub async fn start_health_server(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(?addr, "health server listening");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_router()).await {
            tracing::error!(error=?e, "health server failed");
            mark_not_live();
        }
    });
    Ok(())
}

async fn metrics_handler() -> axum::response::Response {
    use axum::response::IntoResponse;
    once_cell::sync::Lazy::force(&SERVICE_METRICS);
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&metric_families, &mut buf) {
        return (axum::http::StatusCode::INTERNAL_SERVER_ERROR, format!("encode error: {e}")).into_response();
    }
    ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], buf).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_flags_toggle() {
        mark_ready();
        assert!(is_ready());
        clear_ready();
        assert!(!is_ready());
    }

    #[test]
    fn liveness_drops_once() {
        mark_not_live();
        assert!(!is_live());
    }

    #[test]
    fn blank_url_is_ignored() {
        let cfg = ServiceConfig { rppi_url: Some("  ".into()), ..Default::default() };
        assert_eq!(cfg.rppi_url(), None);
        let cfg = ServiceConfig { rppi_url: Some("https://example.org/rppi.csv".into()), ..Default::default() };
        assert_eq!(cfg.rppi_url(), Some("https://example.org/rppi.csv"));
    }

    #[tokio::test]
    async fn metrics_render_as_text() {
        SERVICE_METRICS.reloads_total.with_label_values(&["ok"]).inc();
        let resp = metrics_handler().await;
        assert_eq!(resp.status(), axum::http::StatusCode::OK);
    }
}
