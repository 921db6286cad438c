//! Compound annual growth projection from a region's index history.

use crate::growth::{clamp_horizon, round_value, YearValue};
use crate::rppi::IndexObservation;
use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use thiserror::Error;

pub const MIN_OBSERVATIONS: usize = 4;
pub const DEFAULT_LOOKBACK_YEARS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CagrError {
    #[error("insufficient_history")]
    InsufficientHistory,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CagrParams {
    pub years: i64,
    pub lookback_years: i64,
    pub current_value: Option<f64>,
}

impl Default for CagrParams {
    fn default() -> Self {
        Self { years: crate::growth::DEFAULT_YEARS, lookback_years: DEFAULT_LOOKBACK_YEARS, current_value: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexPoint {
    pub year: i32,
    pub index: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CagrForecast {
    pub as_of: NaiveDate,
    pub index_current: f64,
    /// Unrounded growth rate as a fraction.
    pub rate: f64,
    pub index_forecast: Vec<IndexPoint>,
    pub value_forecast: Option<Vec<YearValue>>,
}

impl CagrForecast {
    /// Rate as a percentage with two decimals.
    pub fn cagr_pct(&self) -> f64 { round2(self.rate * 100.0) }
}

pub fn round2(v: f64) -> f64 { (v * 100.0).round() / 100.0 }

/// `history` must already be filtered to one region and sorted by date.
pub fn forecast(history: &[IndexObservation], params: &CagrParams) -> Result<CagrForecast, CagrError> {
    if history.len() < MIN_OBSERVATIONS { return Err(CagrError::InsufficientHistory); }
    let (first, last) = match (history.first(), history.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return Err(CagrError::InsufficientHistory),
    };
    let lookback = clamp_horizon(params.lookback_years);
    let years = clamp_horizon(params.years) as i32;
    let (end_index, end_date) = (last.index, last.date);

    let cutoff = end_date
        .checked_sub_months(Months::new(lookback as u32 * 12))
        .unwrap_or(NaiveDate::MIN);
    let (baseline, span) = match history.iter().rev().find(|o| o.date <= cutoff) {
        Some(b) => (b.index, lookback),
        None => (first.index, i64::from(end_date.year() - first.date.year()).max(1)),
    };
    if baseline <= 0.0 || end_index <= 0.0 { return Err(CagrError::InsufficientHistory); }

    let rate = (end_index / baseline).powf(1.0 / span as f64) - 1.0;
    let raw: Vec<(i32, f64)> = (1..=years)
        .map(|i| (end_date.year().saturating_add(i), end_index * (1.0 + rate).powi(i)))
        .collect();
    let value_forecast = params.current_value.map(|current| {
        raw.iter()
            .map(|&(year, idx)| YearValue { year, value: round_value(current * idx / end_index) })
            .collect()
    });
    Ok(CagrForecast {
        as_of: end_date,
        index_current: round2(end_index),
        rate,
        index_forecast: raw.iter().map(|&(year, idx)| IndexPoint { year, index: round2(idx) }).collect(),
        value_forecast,
    })
}
