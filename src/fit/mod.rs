//! Parametric curve fits over histogram bins
//!
//! A [`CurveFitter`] takes bin centers and heights from a computed histogram
//! and fits either a Gaussian (nonlinear least squares) or a low-degree
//! polynomial (linear least squares). Covariances follow the usual
//! convention of scaling `(JᵀJ)⁻¹` by the residual variance; they are all
//! `+inf` when there are no spare degrees of freedom.
//!
//! # Example
//!
//! ```
//! use rapidhist::fit::{gaussian, CurveFitter, FitModel};
//!
//! let x: Vec<f64> = (0..21).map(|i| i as f64 * 0.5 - 5.0).collect();
//! let y: Vec<f64> = x.iter().map(|&v| gaussian(v, 1.0, 1.5, 40.0)).collect();
//!
//! let fit = CurveFitter::default().fit(FitModel::Gaussian, &x, &y).unwrap();
//! assert!((fit.parameters[0] - 1.0).abs() < 1e-4);
//! assert!((fit.peak().unwrap() - 1.0).abs() < 1e-4);
//! ```

mod gaussian;
mod moments;
mod poly;

pub use gaussian::gaussian;
pub use moments::WeightedMoments;
pub use poly::polyval;

use nalgebra::DMatrix;
use ndarray::Array2;

use crate::histogram::HistogramResult;
use crate::traits::{HistError, Result};

/// Which curve to fit, as named in configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum FitType {
    #[default]
    Gaussian,
    Poly,
}

/// A concrete model with its shape parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FitModel {
    /// Parameters `(mu, sigma, scalar)`
    Gaussian,
    /// Coefficients, highest power first
    Polynomial { degree: usize },
}

/// Fitted parameters and their covariance
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitResult {
    pub model: FitModel,
    /// X positions the fit was run against
    pub centers: Vec<f64>,
    pub parameters: Vec<f64>,
    pub covariance: Array2<f64>,
}

impl FitResult {
    /// Evaluate the fitted curve at `x`
    pub fn evaluate(&self, x: f64) -> f64 {
        match self.model {
            FitModel::Gaussian => gaussian(x, self.parameters[0], self.parameters[1], self.parameters[2]),
            FitModel::Polynomial { .. } => polyval(&self.parameters, x),
        }
    }

    /// Sample the curve at `points` evenly spaced positions across the centers
    pub fn curve(&self, points: usize) -> (Vec<f64>, Vec<f64>) {
        let (Some(&lo), Some(&hi)) = (self.centers.first(), self.centers.last()) else {
            return (Vec::new(), Vec::new());
        };
        let xs: Vec<f64> = match points {
            0 => Vec::new(),
            1 => vec![(lo + hi) / 2.0],
            _ => {
                let step = (hi - lo) / (points - 1) as f64;
                (0..points).map(|i| lo + step * i as f64).collect()
            }
        };
        let ys = xs.iter().map(|&x| self.evaluate(x)).collect();
        (xs, ys)
    }

    /// Location of the peak
    ///
    /// `mu` for a Gaussian, the vertex `-c1 / 2c0` for a quadratic. Other
    /// polynomial degrees, and flat quadratics, have no single peak.
    pub fn peak(&self) -> Option<f64> {
        match self.model {
            FitModel::Gaussian => Some(self.parameters[0]),
            FitModel::Polynomial { degree: 2 } if self.parameters[0] != 0.0 => {
                Some(-self.parameters[1] / (2.0 * self.parameters[0]))
            }
            FitModel::Polynomial { .. } => None,
        }
    }

    /// One-standard-deviation parameter errors from the covariance diagonal
    pub fn std_errors(&self) -> Vec<f64> {
        self.covariance.diag().iter().map(|v| v.sqrt()).collect()
    }
}

/// Gaussian and polynomial least-squares fitter
#[derive(Clone, Debug)]
pub struct CurveFitter {
    /// Degree used for [`FitType::Poly`]
    pub(crate) poly_degree: usize,
    /// Levenberg-Marquardt patience, in model evaluations per parameter
    pub(crate) max_iterations: usize,
    /// Relative reduction in the residual below which the fit has converged
    pub(crate) ftol: f64,
    /// Relative step size below which the fit has converged
    pub(crate) xtol: f64,
}

impl Default for CurveFitter {
    fn default() -> Self {
        Self {
            poly_degree: 2,
            max_iterations: 200,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
        }
    }
}

impl CurveFitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics if `degree` is zero.
    pub fn with_poly_degree(mut self, degree: usize) -> Self {
        assert!(degree > 0, "polynomial degree must be positive");
        self.poly_degree = degree;
        self
    }

    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn poly_degree(&self) -> usize {
        self.poly_degree
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// The model a configured fit type maps to
    pub fn model(&self, fit_type: FitType) -> FitModel {
        match fit_type {
            FitType::Gaussian => FitModel::Gaussian,
            FitType::Poly => FitModel::Polynomial {
                degree: self.poly_degree,
            },
        }
    }

    /// Fit `model` to the points `(x, y)`
    pub fn fit(&self, model: FitModel, x: &[f64], y: &[f64]) -> Result<FitResult> {
        if x.len() != y.len() {
            return Err(HistError::FitDivergence(format!(
                "{} x values for {} y values",
                x.len(),
                y.len()
            )));
        }
        if x.iter().chain(y).any(|v| !v.is_finite()) {
            return Err(HistError::FitDivergence("non-finite input".into()));
        }

        let (parameters, covariance) = match model {
            FitModel::Gaussian => {
                let (params, cov, _) = gaussian::fit(self, x, y)?;
                (params, cov)
            }
            FitModel::Polynomial { degree } => poly::fit(degree, x, y)?,
        };

        Ok(FitResult {
            model,
            centers: x.to_vec(),
            parameters,
            covariance,
        })
    }

    /// Fit the bins of a one-axis histogram at their centers
    pub fn fit_histogram(&self, result: &HistogramResult, fit_type: FitType) -> Result<FitResult> {
        let (Some(centers), Some(heights)) = (result.centers(), result.heights_1d()) else {
            return Err(HistError::FitDimension {
                axes: result.axis_count(),
            });
        };
        self.fit(self.model(fit_type), &centers, &heights)
    }
}

/// `inverse · ssr / (n - p)`, or all `+inf` when that is undefined
pub(crate) fn scaled_covariance(inverse: Option<DMatrix<f64>>, ssr: f64, n: usize, p: usize) -> DMatrix<f64> {
    match inverse {
        Some(inv) if n > p => inv * (ssr / (n - p) as f64),
        _ => DMatrix::from_element(p, p, f64::INFINITY),
    }
}

pub(crate) fn to_array(matrix: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn(matrix.shape(), |(i, j)| matrix[(i, j)])
}
