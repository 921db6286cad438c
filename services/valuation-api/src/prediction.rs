//! Model pricing for single records and batches.

use crate::encoding::FeatureVector;
use crate::trainer::TrainedModel;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PredictError {
    #[error("model_not_ready")]
    ModelNotReady,
    #[error("invalid_features")]
    InvalidFeatures,
}

/// Aligns a raw record to the loaded model's schema.
pub fn prepare_features(model: Option<&TrainedModel>, record: &Value) -> Result<FeatureVector, PredictError> {
    let model = model.ok_or(PredictError::ModelNotReady)?;
    model.schema().project(record).map_err(|e| {
        debug!(error = %e, "feature alignment failed");
        PredictError::InvalidFeatures
    })
}

pub fn predict_one(model: Option<&TrainedModel>, record: &Value) -> Result<f64, PredictError> {
    let model = model.ok_or(PredictError::ModelNotReady)?;
    let fv = prepare_features(Some(model), record)?;
    Ok(model.predict(&fv))
}

/// One output per record; records that fail alignment yield `NaN` in their slot.
pub fn predict_many(model: Option<&TrainedModel>, records: &[Value]) -> Result<Vec<f64>, PredictError> {
    let model = model.ok_or(PredictError::ModelNotReady)?;
    Ok(records
        .iter()
        .map(|r| match prepare_features(Some(model), r) {
            Ok(fv) => model.predict(&fv),
            Err(_) => f64::NAN,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::SaleTable;
    use crate::trainer::{train, TrainerConfig};
    use serde_json::json;

    fn model() -> TrainedModel {
        let mut csv = String::from("Rooms,Suburb,SalePrice\n");
        for i in 0..10 {
            let suburb = if i % 2 == 0 { "North" } else { "South" };
            let price = 100_000 + 25_000 * i + if suburb == "North" { 10_000 } else { 0 };
            csv.push_str(&format!("{i},{suburb},{price}\n"));
        }
        train(&SaleTable::from_reader(csv.as_bytes()).unwrap(), &TrainerConfig::default()).into_model().unwrap()
    }

    #[test]
    fn no_model_is_reported_first() {
        assert_eq!(predict_one(None, &json!({"Rooms": 3})), Err(PredictError::ModelNotReady));
        assert_eq!(predict_many(None, &[json!({})]), Err(PredictError::ModelNotReady));
    }

    #[test]
    fn single_prediction_uses_aligned_features() {
        let m = model();
        let p = predict_one(Some(&m), &json!({"Rooms": 4, "Suburb": "North", "Pool": "yes"})).unwrap();
        assert!((p - 210_000.0).abs() < 1e-4);
        assert_eq!(predict_one(Some(&m), &json!({"Rooms": {"n": 4}})), Err(PredictError::InvalidFeatures));
    }

    #[test]
    fn batch_isolates_malformed_records() {
        let m = model();
        let out = predict_many(Some(&m), &[json!({"Rooms": 2, "Suburb": "South"}), json!("not a record"), json!({"Rooms": 6})]).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out[0].is_finite());
        assert!(out[1].is_nan());
        assert!(out[2].is_finite());
    }
}
