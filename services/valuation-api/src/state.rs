//! Process-wide model and index snapshot.
//!
//! Handlers load the current [`Snapshot`] without locking; reloads build a new
//! snapshot and swap it in atomically.

use crate::rppi::{load_region_index, RegionIndexSeries};
use crate::trainer::{train_from_path, TrainedModel, TrainerConfig, TrainingOutcome};
use anyhow::Result;
use arc_swap::ArcSwap;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use propval_core::{ServiceConfig, SERVICE_METRICS};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub model: Option<Arc<TrainedModel>>,
    pub rppi: Option<Arc<RegionIndexSeries>>,
}

impl Snapshot {
    pub fn model(&self) -> Option<&TrainedModel> { self.model.as_deref() }
    pub fn rppi(&self) -> Option<&RegionIndexSeries> { self.rppi.as_deref() }
}

#[derive(Clone)]
pub struct AppState {
    snapshot: Arc<ArcSwap<Snapshot>>,
    config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(config: ServiceConfig, model: Option<TrainedModel>, rppi: Option<RegionIndexSeries>) -> Self {
        let snapshot = Snapshot { model: model.map(Arc::new), rppi: rppi.map(Arc::new) };
        Self { snapshot: Arc::new(ArcSwap::from_pointee(snapshot)), config: Arc::new(config) }
    }

    /// Trains the model and loads the region index; either may end up absent.
    pub async fn bootstrap(config: ServiceConfig) -> Self {
        let dataset = config.dataset_path.clone();
        let model = match tokio::task::spawn_blocking(move || train_from_path(&dataset, &TrainerConfig::default())).await {
            Ok(TrainingOutcome::Ready(m)) => Some(m),
            Ok(TrainingOutcome::NotReady(reason)) => {
                info!(%reason, "serving without a model");
                None
            }
            Err(e) => {
                warn!(error = %e, "training task aborted");
                None
            }
        };
        let rppi = load_region_index(&config.rppi_path, config.rppi_url()).await;
        Self::new(config, model, rppi)
    }

    pub fn snapshot(&self) -> Arc<Snapshot> { self.snapshot.load_full() }
    pub fn config(&self) -> &ServiceConfig { &self.config }

    /// Swaps in a new region index, keeping the current model.
    pub fn replace_rppi(&self, rppi: Option<RegionIndexSeries>) {
        let rppi = rppi.map(Arc::new);
        self.snapshot.rcu(|cur| Snapshot { model: cur.model.clone(), rppi: rppi.clone() });
    }

    /// Re-reads the region index from its configured sources. A failed reload
    /// leaves the index unavailable rather than serving stale data.
    pub async fn reload_rppi(&self) -> Option<usize> {
        let series = load_region_index(&self.config.rppi_path, self.config.rppi_url()).await;
        let observations = series.as_ref().map(RegionIndexSeries::len);
        SERVICE_METRICS.reloads_total.with_label_values(&[if observations.is_some() { "ok" } else { "unavailable" }]).inc();
        self.replace_rppi(series);
        observations
    }
}

/// Reloads the region index whenever the local file changes.
pub fn spawn_rppi_watcher(state: AppState) {
    let path = state.config().rppi_path.clone();
    tokio::spawn(async move {
        if let Err(e) = watch_loop(state, path).await { warn!(error = ?e, "rppi watch loop exited"); }
    });
}

async fn watch_loop(state: AppState, path: PathBuf) -> Result<()> {
    use tokio::sync::mpsc;
    let (tx, mut rx) = mpsc::channel::<notify::Result<notify::Event>>(8);
    let mut watcher = RecommendedWatcher::new(move |res: notify::Result<notify::Event>| { let _ = tx.blocking_send(res); }, notify::Config::default())?;
    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    info!(path = %path.display(), "watching region index file");
    while let Some(evt) = rx.recv().await {
        if let Ok(ev) = evt {
            if matches!(ev.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                let observations = state.reload_rppi().await;
                info!(?observations, "region index reloaded after file change");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rppi::IndexObservation;
    use chrono::NaiveDate;

    fn series(index: f64) -> RegionIndexSeries {
        RegionIndexSeries::from_observations(vec![IndexObservation {
            date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            region: "Perth".into(),
            index,
        }])
    }

    #[test]
    fn swap_leaves_old_snapshot_intact() {
        let state = AppState::new(ServiceConfig::default(), None, Some(series(1.0)));
        let before = state.snapshot();
        state.replace_rppi(Some(series(2.0)));
        assert_eq!(before.rppi().unwrap().observations()[0].index, 1.0);
        assert_eq!(state.snapshot().rppi().unwrap().observations()[0].index, 2.0);
    }

    #[tokio::test]
    async fn reload_picks_up_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rppi.csv");
        let cfg = ServiceConfig { rppi_path: path.clone(), ..Default::default() };
        let state = AppState::new(cfg, None, None);
        assert_eq!(state.reload_rppi().await, None);
        std::fs::write(&path, "date,region,index\n2024Q1,Perth,150\n2024Q2,Perth,152\n").unwrap();
        assert_eq!(state.reload_rppi().await, Some(2));
        assert!(state.snapshot().rppi().is_some());
    }

    #[tokio::test]
    async fn bootstrap_without_sources_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ServiceConfig {
            dataset_path: dir.path().join("missing.csv"),
            rppi_path: dir.path().join("missing-rppi.csv"),
            ..Default::default()
        };
        let state = AppState::bootstrap(cfg).await;
        let snap = state.snapshot();
        assert!(snap.model().is_none());
        assert!(snap.rppi().is_none());
    }
}
