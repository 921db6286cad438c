//! Fixed-rate compound growth projection.

use serde::Serialize;

pub const DEFAULT_YEARS: i64 = 3;
pub const DEFAULT_ANNUAL_GROWTH_PCT: f64 = 4.0;
/// Longest projection served; larger requests are clamped.
pub const MAX_HORIZON_YEARS: i64 = 100;

/// Clamps a requested horizon into `1..=MAX_HORIZON_YEARS`.
pub fn clamp_horizon(years: i64) -> i64 { years.clamp(1, MAX_HORIZON_YEARS) }

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearValue {
    pub year: i32,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthForecast {
    pub current_value: i64,
    pub forecast: Vec<YearValue>,
    pub annual_growth_pct: f64,
}

/// Rounds to the nearest integer, ties to even.
pub fn round_value(v: f64) -> i64 { v.round_ties_even() as i64 }

/// Projects `current` for `years` (clamped to `1..=MAX_HORIZON_YEARS`) years
/// after `base_year`.
pub fn project(current: f64, years: i64, annual_growth_pct: f64, base_year: i32) -> GrowthForecast {
    let years = clamp_horizon(years) as i32;
    let rate = annual_growth_pct / 100.0;
    let forecast = (1..=years)
        .map(|i| YearValue {
            year: base_year.saturating_add(i),
            value: round_value(current * (1.0 + rate).powi(i)),
        })
        .collect();
    GrowthForecast { current_value: round_value(current), forecast, annual_growth_pct }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compounds_each_year() {
        let f = project(500_000.0, 3, 4.0, 2026);
        assert_eq!(f.current_value, 500_000);
        assert_eq!(f.forecast, vec![
            YearValue { year: 2027, value: 520_000 },
            YearValue { year: 2028, value: 540_800 },
            YearValue { year: 2029, value: 562_432 },
        ]);
        for (i, p) in f.forecast.iter().enumerate() {
            assert_eq!(p.value, round_value(500_000.0 * 1.04f64.powi(i as i32 + 1)));
        }
    }

    #[test]
    fn horizon_is_at_least_one_year() {
        assert_eq!(project(100.0, 0, 4.0, 2026).forecast.len(), 1);
        assert_eq!(project(100.0, -5, 4.0, 2026).forecast.len(), 1);
        assert_eq!(project(100.0, i64::MIN, 4.0, 2026).forecast.len(), 1);
    }

    #[test]
    fn huge_horizons_are_capped() {
        let f = project(100.0, i64::MAX, 4.0, 2026);
        assert_eq!(f.forecast.len(), MAX_HORIZON_YEARS as usize);
        assert_eq!(f.forecast.last().unwrap().year, 2026 + MAX_HORIZON_YEARS as i32);
        assert_eq!(project(100.0, 1_000_000_000_000, 4.0, 2026).forecast.len(), MAX_HORIZON_YEARS as usize);
        assert_eq!(project(100.0, 1, 4.0, i32::MAX).forecast[0].year, i32::MAX);
    }

    #[test]
    fn negative_growth_and_ties() {
        let f = project(1000.0, 1, -10.0, 2026);
        assert_eq!(f.forecast[0].value, 900);
        assert_eq!(round_value(2.5), 2);
        assert_eq!(round_value(3.5), 4);
    }

    #[test]
    fn identical_inputs_identical_output() {
        assert_eq!(project(321_987.5, 5, 3.3, 2030), project(321_987.5, 5, 3.3, 2030));
    }
}
