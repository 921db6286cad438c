use anyhow::Result;
use propval_core::{clear_ready, init_tracing, load_config, mark_not_live, mark_ready, start_health_server};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use valuation_api::{cors_layer, router, state::spawn_rppi_watcher, AppState};

const SERVICE: &str = "valuation-api";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cfg = load_config(SERVICE)?;
    init_tracing(SERVICE, &cfg.log_level)?;
    info!(?cfg, "config loaded");

    start_health_server(cfg.health_port).await?;

    let state = AppState::bootstrap(cfg.clone()).await;
    {
        let snap = state.snapshot();
        info!(
            model_ready = snap.model().is_some(),
            columns = snap.model().map(|m| m.columns().len()).unwrap_or(0),
            rppi_regions = snap.rppi().map(|s| s.labels().len()).unwrap_or(0),
            "startup state built"
        );
    }
    if cfg.watch_rppi { spawn_rppi_watcher(state.clone()); }

    let app = router(state).layer(cors_layer(&cfg.cors_origins)).layer(TraceLayer::new_for_http());
    let listener = TcpListener::bind((cfg.host.as_str(), cfg.port)).await?;
    info!(addr = %listener.local_addr()?, "valuation api listening");
    mark_ready();

    let served = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await;
    clear_ready();
    if let Err(e) = served {
        mark_not_live();
        tracing::error!(error = %e, "valuation api server failed");
        return Err(e.into());
    }
    info!("shutdown");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler failed");
    }
    clear_ready();
    info!("shutdown_signal_received");
}
