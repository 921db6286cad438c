//! One-shot model training over the sale-record dataset.
//!
//! Training never fails loudly: every precondition miss is reported as a
//! [`NotReadyReason`] and the service keeps running without a model.

use crate::dataset::{ColumnData, DatasetError, SaleTable, TARGET_COLUMN};
use crate::encoding::{indicator_name, FeatureSchema, FeatureVector};
use crate::regression::LinearModel;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub target: String,
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self { Self { target: TARGET_COLUMN.into(), test_fraction: 0.2, seed: 42 } }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotReadyReason {
    DatasetMissing,
    DatasetUnreadable(String),
    TargetMissing,
    EmptyFeatures,
    EmptyTrainingSplit,
    FitFailed(String),
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DatasetMissing => write!(f, "dataset file missing"),
            Self::DatasetUnreadable(e) => write!(f, "dataset unreadable: {e}"),
            Self::TargetMissing => write!(f, "target column missing or not numeric"),
            Self::EmptyFeatures => write!(f, "feature matrix empty after cleaning"),
            Self::EmptyTrainingSplit => write!(f, "training split empty"),
            Self::FitFailed(e) => write!(f, "fit failed: {e}"),
        }
    }
}

/// Fitted model plus the schema its coefficients are laid out against.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    schema: FeatureSchema,
    model: LinearModel,
    training_rows: usize,
}

impl TrainedModel {
    pub fn schema(&self) -> &FeatureSchema { &self.schema }
    pub fn columns(&self) -> &[String] { self.schema.columns() }
    pub fn model(&self) -> &LinearModel { &self.model }
    pub fn training_rows(&self) -> usize { self.training_rows }
    pub fn predict(&self, features: &FeatureVector) -> f64 { self.model.predict(features.values()) }
}

#[derive(Debug, Clone)]
pub enum TrainingOutcome {
    Ready(TrainedModel),
    NotReady(NotReadyReason),
}

impl TrainingOutcome {
    pub fn into_model(self) -> Option<TrainedModel> {
        match self {
            Self::Ready(m) => Some(m),
            Self::NotReady(_) => None,
        }
    }
}

pub fn train_from_path(path: &Path, cfg: &TrainerConfig) -> TrainingOutcome {
    let table = match SaleTable::load(path) {
        Ok(t) => t,
        Err(DatasetError::NotFound(p)) => {
            info!(path = %p, "no dataset, model stays unavailable");
            return TrainingOutcome::NotReady(NotReadyReason::DatasetMissing);
        }
        Err(e) => {
            warn!(error = %e, "dataset load failed");
            return TrainingOutcome::NotReady(NotReadyReason::DatasetUnreadable(e.to_string()));
        }
    };
    train(&table, cfg)
}

pub fn train(table: &SaleTable, cfg: &TrainerConfig) -> TrainingOutcome {
    let outcome = (|| -> Result<TrainedModel, NotReadyReason> {
        let (schema, x, y) = clean_and_encode(table, &cfg.target)?;
        let (_test, train_idx) = split_indices(x.len(), cfg.test_fraction, cfg.seed);
        if train_idx.is_empty() { return Err(NotReadyReason::EmptyTrainingSplit); }
        let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| x[i].clone()).collect();
        let y_train: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();
        let model = LinearModel::fit(&x_train, &y_train).map_err(|e| NotReadyReason::FitFailed(e.to_string()))?;
        Ok(TrainedModel { schema, model, training_rows: train_idx.len() })
    })();
    match outcome {
        Ok(m) => {
            info!(columns = m.schema.len(), training_rows = m.training_rows, "model trained");
            TrainingOutcome::Ready(m)
        }
        Err(reason) => {
            warn!(%reason, "model not ready");
            TrainingOutcome::NotReady(reason)
        }
    }
}

/// Median-fills numeric columns and expands categoricals into indicators.
/// Numeric features come first in file order, then each categorical's
/// indicators with values sorted.
pub(crate) fn clean_and_encode(table: &SaleTable, target: &str) -> Result<(FeatureSchema, Vec<Vec<f64>>, Vec<f64>), NotReadyReason> {
    let y = match table.column(target).map(|c| &c.data) {
        Some(ColumnData::Numeric(values)) => fill_median(values),
        _ => return Err(NotReadyReason::TargetMissing),
    };
    let rows = table.rows();
    if rows == 0 { return Err(NotReadyReason::EmptyFeatures); }

    let mut names = Vec::new();
    let mut cols: Vec<Vec<f64>> = Vec::new();
    for c in table.columns().iter().filter(|c| c.name != target) {
        if let ColumnData::Numeric(values) = &c.data {
            names.push(c.name.clone());
            cols.push(fill_median(values));
        }
    }
    for c in table.columns().iter().filter(|c| c.name != target) {
        if let ColumnData::Categorical(values) = &c.data {
            let categories: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
            for cat in categories {
                names.push(indicator_name(&c.name, cat));
                cols.push(values.iter().map(|v| if v.as_deref() == Some(cat) { 1.0 } else { 0.0 }).collect());
            }
        }
    }
    if names.is_empty() { return Err(NotReadyReason::EmptyFeatures); }

    let x = (0..rows).map(|i| cols.iter().map(|col| col[i]).collect()).collect();
    Ok((FeatureSchema::new(names), x, y))
}

fn fill_median(values: &[Option<f64>]) -> Vec<f64> {
    let m = median(values).unwrap_or(0.0);
    values.iter().map(|v| v.unwrap_or(m)).collect()
}

fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() { return None; }
    present.sort_by(|a, b| a.total_cmp(b));
    let n = present.len();
    Some(if n % 2 == 0 { (present[n / 2 - 1] + present[n / 2]) / 2.0 } else { present[n / 2] })
}

/// Seeded shuffle split; returns `(test, train)` with `ceil(n * test_fraction)` test rows.
pub(crate) fn split_indices(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    idx.shuffle(&mut StdRng::seed_from_u64(seed));
    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    let train = idx.split_off(n_test.min(n));
    (idx, train)
}
