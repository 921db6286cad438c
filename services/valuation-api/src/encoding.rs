//! One-hot feature encoding and projection onto the training schema.
//!
//! A single request record is encoded on its own, so a categorical value only
//! yields the `<field>_<value>` indicator for the value it carries. Projecting
//! onto the schema then zero-fills every training column the record did not
//! produce and drops every column the schema does not know. Categorical values
//! never seen in training therefore contribute nothing to the prediction.

use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignError {
    #[error("record must be a JSON object")]
    NotAnObject,
    #[error("field `{0}` holds a nested value that cannot be encoded")]
    Unencodable(String),
}

pub fn indicator_name(field: &str, value: &str) -> String { format!("{field}_{value}") }

/// Ordered list of model input columns fixed at training time.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Later duplicates of a name resolve to the first position.
    pub fn new(columns: Vec<String>) -> Self {
        let mut positions = HashMap::with_capacity(columns.len());
        for (i, c) in columns.iter().enumerate() {
            positions.entry(c.clone()).or_insert(i);
        }
        Self { columns, positions }
    }

    pub fn columns(&self) -> &[String] { &self.columns }
    pub fn len(&self) -> usize { self.columns.len() }
    pub fn is_empty(&self) -> bool { self.columns.is_empty() }
    pub fn position(&self, column: &str) -> Option<usize> { self.positions.get(column).copied() }

    pub fn project(&self, record: &Value) -> Result<FeatureVector, AlignError> {
        let obj = record.as_object().ok_or(AlignError::NotAnObject)?;
        let mut values = vec![0.0; self.columns.len()];
        for (column, v) in encode_record(obj)? {
            if let Some(i) = self.position(&column) {
                values[i] = v;
            }
        }
        Ok(FeatureVector(values))
    }
}

/// Model input aligned to a [`FeatureSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn values(&self) -> &[f64] { &self.0 }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

/// Encodes one record: numbers pass through, booleans become 1.0/0.0, strings
/// become a single indicator column and nulls are dropped.
pub fn encode_record(record: &Map<String, Value>) -> Result<Vec<(String, f64)>, AlignError> {
    let mut out = Vec::with_capacity(record.len());
    for (field, value) in record {
        match value {
            Value::Null => {}
            Value::Number(n) => {
                if let Some(v) = n.as_f64() { out.push((field.clone(), v)); }
            }
            Value::Bool(b) => out.push((field.clone(), if *b { 1.0 } else { 0.0 })),
            Value::String(s) => out.push((indicator_name(field, s), 1.0)),
            Value::Array(_) | Value::Object(_) => return Err(AlignError::Unencodable(field.clone())),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec![
            "LotArea".into(),
            "YearBuilt".into(),
            "Street_Grvl".into(),
            "Street_Pave".into(),
        ])
    }

    #[test]
    fn projection_keeps_schema_order_and_length() {
        let s = schema();
        let fv = s.project(&json!({"Street": "Pave", "LotArea": 8450})).unwrap();
        assert_eq!(fv.len(), s.len());
        assert_eq!(fv.values(), &[8450.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn subsets_of_the_schema_always_align() {
        let s = schema();
        let records = [
            json!({}),
            json!({"YearBuilt": 2003}),
            json!({"Street": "Grvl", "YearBuilt": 1999, "LotArea": 1.5}),
        ];
        for r in &records {
            assert_eq!(s.project(r).unwrap().len(), s.columns().len());
        }
    }

    #[test]
    fn unseen_categories_and_extra_fields_vanish() {
        let fv = schema().project(&json!({"Street": "Dirt", "PoolQC": "Ex", "Garage": 2})).unwrap();
        assert_eq!(fv.values(), &[0.0; 4]);
    }

    #[test]
    fn numeric_strings_are_categorical() {
        let fv = schema().project(&json!({"LotArea": "8450"})).unwrap();
        assert_eq!(fv.values()[0], 0.0);
    }

    #[test]
    fn nulls_read_as_absent_and_bools_as_indicators() {
        let s = FeatureSchema::new(vec!["HasPool".into(), "LotArea".into()]);
        let fv = s.project(&json!({"HasPool": true, "LotArea": null})).unwrap();
        assert_eq!(fv.values(), &[1.0, 0.0]);
    }

    #[test]
    fn nested_values_fail_alignment() {
        assert_eq!(schema().project(&json!({"LotArea": [1, 2]})), Err(AlignError::Unencodable("LotArea".into())));
        assert_eq!(schema().project(&json!(["LotArea"])), Err(AlignError::NotAnObject));
    }
}
