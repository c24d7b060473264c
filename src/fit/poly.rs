//! Polynomial least-squares fit
//!
//! Coefficients are ordered highest power first. The fit runs on
//! `t = (x - center) / half_width` so the design matrix stays well
//! conditioned for bin centers far from zero, then maps coefficients and
//! covariance back to powers of `x`. The least-squares solve is an SVD.

use nalgebra::{DMatrix, DVector};
use ndarray::Array2;

use super::{scaled_covariance, to_array};
use crate::traits::{HistError, Result};

/// Singular values below this fraction of the largest count as zero
const RANK_TOLERANCE: f64 = 1e-12;

/// Evaluate polynomial `coeffs` (highest power first) at `x`
pub fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// Fit a polynomial of `degree` to `(x, y)`; returns coefficients and covariance
pub(crate) fn fit(degree: usize, x: &[f64], y: &[f64]) -> Result<(Vec<f64>, Array2<f64>)> {
    let order = degree + 1;
    let n = x.len();
    if n < order {
        return Err(HistError::InsufficientData {
            required: order,
            found: n,
        });
    }

    let (lo, hi) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let center = (lo + hi) / 2.0;
    let half_width = if hi > lo { (hi - lo) / 2.0 } else { 1.0 };

    // Ascending powers of t
    let design = DMatrix::from_fn(n, order, |i, k| ((x[i] - center) / half_width).powi(k as i32));
    let rhs = DVector::from_column_slice(y);

    let svd = design.clone().svd(true, true);
    let cutoff = RANK_TOLERANCE * svd.singular_values.max();
    if svd.rank(cutoff) < order {
        return Err(HistError::FitDivergence(format!(
            "singular design matrix for degree {degree}"
        )));
    }
    let local = svd
        .solve(&rhs, cutoff)
        .map_err(|e| HistError::FitDivergence(e.to_string()))?;

    let ssr = (&rhs - &design * &local).norm_squared();
    let local_cov = scaled_covariance((design.transpose() * &design).try_inverse(), ssr, n, order);

    // Row i maps local coefficients onto the coefficient of x^(degree - i)
    let to_x = change_of_basis(degree, center, half_width);
    let coeffs: Vec<f64> = (&to_x * &local).iter().copied().collect();
    let covariance = if local_cov.iter().all(|v| v.is_finite()) {
        &to_x * &local_cov * to_x.transpose()
    } else {
        local_cov
    };

    tracing::debug!(degree, ?coeffs, residual = ssr, "polynomial fit");

    Ok((coeffs, to_array(&covariance)))
}

/// Linear map from ascending coefficients in `t = (x - m) / s` to
/// descending coefficients in `x`
fn change_of_basis(degree: usize, m: f64, s: f64) -> DMatrix<f64> {
    let order = degree + 1;
    let mut map = DMatrix::zeros(order, order);
    for k in 0..order {
        // t^k = s^-k * sum_i C(k, i) x^i (-m)^(k-i)
        let mut binomial = 1.0;
        for i in 0..=k {
            if i > 0 {
                binomial = binomial * (k + 1 - i) as f64 / i as f64;
            }
            map[(degree - i, k)] = binomial * (-m).powi((k - i) as i32) / s.powi(k as i32);
        }
    }
    map
}
