//! Ordinary least squares with intercept.
//!
//! Solved on centered data through the SVD pseudo-inverse, which returns the
//! minimum-norm coefficients when columns are collinear (full one-hot blocks
//! always are once an intercept is fitted).

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RegressionError {
    #[error("no training rows")]
    Empty,
    #[error("no feature columns")]
    NoFeatures,
    #[error("row {row} has {got} features, expected {expected}")]
    DimensionMismatch { row: usize, expected: usize, got: usize },
    #[error("target has {got} values for {expected} rows")]
    TargetMismatch { expected: usize, got: usize },
    #[error("least squares solve failed: {0}")]
    Solve(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    pub fn fit(x: &[Vec<f64>], y: &[f64]) -> Result<Self, RegressionError> {
        let n = x.len();
        if n == 0 { return Err(RegressionError::Empty); }
        if y.len() != n { return Err(RegressionError::TargetMismatch { expected: n, got: y.len() }); }
        let p = x[0].len();
        if p == 0 { return Err(RegressionError::NoFeatures); }
        if let Some((row, r)) = x.iter().enumerate().find(|(_, r)| r.len() != p) {
            return Err(RegressionError::DimensionMismatch { row, expected: p, got: r.len() });
        }

        let x_mean: Vec<f64> = (0..p).map(|j| x.iter().map(|r| r[j]).sum::<f64>() / n as f64).collect();
        let y_mean = y.iter().sum::<f64>() / n as f64;
        let xc = DMatrix::from_fn(n, p, |i, j| x[i][j] - x_mean[j]);
        let yc = DVector::from_fn(n, |i, _| y[i] - y_mean);

        let svd = xc.svd(true, true);
        // Same relative cutoff numpy's lstsq applies to small singular values.
        let eps = svd.singular_values.max() * f64::EPSILON * n.max(p) as f64;
        let coef = svd.solve(&yc, eps).map_err(RegressionError::Solve)?;

        let coefficients: Vec<f64> = coef.iter().copied().collect();
        let intercept = y_mean - coefficients.iter().zip(&x_mean).map(|(c, m)| c * m).sum::<f64>();
        Ok(Self { coefficients, intercept })
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        self.intercept + self.coefficients.iter().zip(features).map(|(c, v)| c * v).sum::<f64>()
    }

    pub fn coefficients(&self) -> &[f64] { &self.coefficients }
    pub fn intercept(&self) -> f64 { self.intercept }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_linear_relation() {
        let x: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64, ((i * 7) % 5) as f64]).collect();
        let y: Vec<f64> = x.iter().map(|r| 3.0 + 2.0 * r[0] - r[1]).collect();
        let m = LinearModel::fit(&x, &y).unwrap();
        assert!((m.intercept() - 3.0).abs() < 1e-8);
        assert!((m.coefficients()[0] - 2.0).abs() < 1e-8);
        assert!((m.coefficients()[1] + 1.0).abs() < 1e-8);
        assert!((m.predict(&[10.0, 4.0]) - 19.0).abs() < 1e-8);
    }

    #[test]
    fn collinear_one_hot_block_still_fits() {
        // a + b == 1 on every row: rank deficient with an intercept.
        let x = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let y = vec![10.0, 20.0, 10.0, 20.0];
        let m = LinearModel::fit(&x, &y).unwrap();
        assert!((m.predict(&[1.0, 0.0]) - 10.0).abs() < 1e-8);
        assert!((m.predict(&[0.0, 1.0]) - 20.0).abs() < 1e-8);
    }

    #[test]
    fn constant_features_fall_back_to_mean() {
        let x = vec![vec![5.0], vec![5.0], vec![5.0]];
        let m = LinearModel::fit(&x, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(m.coefficients(), &[0.0]);
        assert!((m.intercept() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        assert_eq!(LinearModel::fit(&[], &[]), Err(RegressionError::Empty));
        assert_eq!(LinearModel::fit(&[vec![]], &[1.0]), Err(RegressionError::NoFeatures));
        assert!(matches!(
            LinearModel::fit(&[vec![1.0, 2.0], vec![1.0]], &[1.0, 2.0]),
            Err(RegressionError::DimensionMismatch { row: 1, .. })
        ));
    }
}
