//! Gaussian least-squares fit
//!
//! The area-normalized model `scalar / sqrt(2πσ²) · exp(-(x-μ)² / 2σ²)` is
//! handed to the `levenberg-marquardt` solver over `(mu, ln sigma, scalar)`,
//! which keeps sigma positive through every step. The starting point comes
//! from the height-weighted moments of the bin centers.

use std::f64::consts::PI;

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::storage::Owned;
use nalgebra::{DMatrix, DVector, Dyn, OMatrix, Vector3, U3};
use ndarray::Array2;

use super::moments::WeightedMoments;
use super::{scaled_covariance, to_array, CurveFitter};
use crate::traits::{HistError, Result};

const PARAMS: usize = 3;

/// Residual, relative to the data's own sum of squares, at which the curve
/// reproduces the data whatever the solver's stopping reason
const EXACT_FIT: f64 = 1e-12;

/// Evaluate the Gaussian model at `x`
pub fn gaussian(x: f64, mu: f64, sigma: f64, scalar: f64) -> f64 {
    let variance = sigma * sigma;
    let exponent = -(x - mu).powi(2) / (2.0 * variance);
    scalar / (2.0 * PI * variance).sqrt() * exponent.exp()
}

/// Fit a Gaussian to `(x, y)`; returns parameters, covariance and model evaluations used
pub(crate) fn fit(fitter: &CurveFitter, x: &[f64], y: &[f64]) -> Result<(Vec<f64>, Array2<f64>, usize)> {
    let n = x.len();
    if n < PARAMS {
        return Err(HistError::InsufficientData {
            required: PARAMS,
            found: n,
        });
    }
    if fitter.max_iterations == 0 {
        return Err(HistError::FitDivergence("iteration budget is zero".into()));
    }

    let (mu, sigma, scalar) = initial_guess(x, y)?;
    let problem = GaussianProblem {
        x,
        y,
        params: Vector3::new(mu, sigma.ln(), scalar),
    };

    let (problem, report) = LevenbergMarquardt::new()
        .with_ftol(fitter.ftol)
        .with_xtol(fitter.xtol)
        .with_patience(fitter.max_iterations)
        .minimize(problem);

    let (mu, sigma, scalar) = (problem.params[0], problem.sigma(), problem.params[2]);
    if ![mu, sigma, scalar].iter().all(|p| p.is_finite()) || sigma == 0.0 {
        return Err(HistError::FitDivergence(format!(
            "non-finite parameters ({:?})",
            report.termination
        )));
    }

    let ssr = sum_squares(x, y, mu, sigma, scalar);
    let signal: f64 = y.iter().map(|v| v * v).sum();
    if !report.termination.was_successful() && ssr > EXACT_FIT * signal {
        return Err(HistError::FitDivergence(format!(
            "{:?} after {} evaluations (residual {ssr:.3e})",
            report.termination, report.number_of_evaluations
        )));
    }

    let jac = model_jacobian(x, mu, sigma, scalar);
    let covariance = scaled_covariance((jac.transpose() * &jac).try_inverse(), ssr, n, PARAMS);

    tracing::debug!(
        mu,
        sigma,
        scalar,
        evaluations = report.number_of_evaluations,
        residual = ssr,
        termination = ?report.termination,
        "gaussian fit converged"
    );

    Ok((vec![mu, sigma, scalar], to_array(&covariance), report.number_of_evaluations))
}

/// Residuals `f(x) - y` over the parameters `(mu, ln sigma, scalar)`
struct GaussianProblem<'a> {
    x: &'a [f64],
    y: &'a [f64],
    params: Vector3<f64>,
}

impl GaussianProblem<'_> {
    fn sigma(&self) -> f64 {
        self.params[1].exp()
    }
}

impl LeastSquaresProblem<f64, Dyn, U3> for GaussianProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, U3>;
    type ParameterStorage = Owned<f64, U3>;

    fn set_params(&mut self, params: &Vector3<f64>) {
        self.params.copy_from(params);
    }

    fn params(&self) -> Vector3<f64> {
        self.params
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let (mu, sigma, scalar) = (self.params[0], self.sigma(), self.params[2]);
        let residuals = DVector::from_iterator(
            self.x.len(),
            self.x
                .iter()
                .zip(self.y)
                .map(|(&xi, &yi)| gaussian(xi, mu, sigma, scalar) - yi),
        );
        residuals.iter().all(|r| r.is_finite()).then_some(residuals)
    }

    fn jacobian(&self) -> Option<OMatrix<f64, Dyn, U3>> {
        let sigma = self.sigma();
        let mut jac = model_jacobian(self.x, self.params[0], sigma, self.params[2])
            .fixed_columns::<3>(0)
            .into_owned();
        // d/d(ln σ) = σ · d/dσ
        jac.column_mut(1).scale_mut(sigma);
        jac.iter().all(|v| v.is_finite()).then_some(jac)
    }
}

/// Seed `(mu, sigma, scalar)` from the positive part of the histogram
fn initial_guess(x: &[f64], y: &[f64]) -> Result<(f64, f64, f64)> {
    let mut moments = WeightedMoments::new();
    for (&xi, &yi) in x.iter().zip(y) {
        moments.add(xi, yi);
    }
    if moments.is_empty() {
        return Err(HistError::FitDivergence(
            "no positive bins to seed a gaussian".into(),
        ));
    }

    let spacing = (x[x.len() - 1] - x[0]).abs() / (x.len() - 1) as f64;
    let spacing = if spacing > 0.0 { spacing } else { 1.0 };
    let sigma = match moments.stddev() {
        s if s > 0.0 => s,
        _ => spacing / 2.0,
    };

    Ok((moments.mean(), sigma, moments.total_weight() * spacing))
}

fn sum_squares(x: &[f64], y: &[f64], mu: f64, sigma: f64, scalar: f64) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&xi, &yi)| (yi - gaussian(xi, mu, sigma, scalar)).powi(2))
        .sum()
}

/// Model derivatives by `(mu, sigma, scalar)`, one row per point
fn model_jacobian(x: &[f64], mu: f64, sigma: f64, scalar: f64) -> DMatrix<f64> {
    let mut jac = DMatrix::zeros(x.len(), PARAMS);
    for (i, &xi) in x.iter().enumerate() {
        // Unit-area shape; f = scalar * shape
        let shape = gaussian(xi, mu, sigma, 1.0);
        let f = scalar * shape;
        let d = xi - mu;
        jac[(i, 0)] = f * d / (sigma * sigma);
        jac[(i, 1)] = f * (d * d / sigma.powi(3) - 1.0 / sigma);
        jac[(i, 2)] = shape;
    }
    jac
}
