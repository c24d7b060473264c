//! Core traits for the histogram engines
//!
//! Every engine is a composition of three capabilities: it accepts samples
//! ([`SampleSink`]), it bins its current window on demand ([`Histogrammable`]),
//! and it summarizes the last binning with a parametric curve ([`Fittable`]).
//! The error taxonomy shared by all of them lives here as well.

use core::fmt::Debug;

use crate::fit::FitType;
use crate::histogram::BinSpec;

/// Errors produced by buffers, histogram engines and the curve fitter
#[derive(Debug, thiserror::Error)]
pub enum HistError {
    /// An axis holds fewer samples than the engine's `minimum_required`
    #[error("insufficient data: {found} samples, need at least {required}")]
    InsufficientData { required: usize, found: usize },

    /// A push supplied a different number of axes than the buffer holds
    #[error("axis count mismatch: expected {expected}, found {found}")]
    AxisCountMismatch { expected: usize, found: usize },

    /// Per-axis values in one push have different lengths
    #[error("ragged push: axis {axis} has {found} values, axis 0 has {expected}")]
    RaggedAxes {
        axis: usize,
        expected: usize,
        found: usize,
    },

    /// Data and weights in one push have different lengths
    #[error("axis {axis} has {data} values but {weights} weights were supplied")]
    AxisWeightLengthMismatch {
        axis: usize,
        data: usize,
        weights: usize,
    },

    /// A push supplied a different number of weight series than the sink takes
    #[error("weight series mismatch: sink takes {expected}, found {found}")]
    WeightSeriesMismatch { expected: usize, found: usize },

    /// Bin specification cannot be turned into edges
    #[error("invalid bins: {0}")]
    InvalidBins(String),

    /// A fit was requested before a histogram was computed for the current window
    #[error("no histogram computed since the last push")]
    FitNotReady,

    /// Fits only work on one-axis histograms
    #[error("cannot fit a {axes}-axis histogram")]
    FitDimension { axes: usize },

    /// The optimizer did not converge
    #[error("fit diverged: {0}")]
    FitDivergence(String),

    /// Configuration could not be parsed or is inconsistent
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl HistError {
    /// Whether the failure is expected to clear up on a later tick
    ///
    /// Monitors use this to decide between a quiet skip and a warning.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HistError::InsufficientData { .. } | HistError::FitDivergence(_)
        )
    }
}

pub type Result<T, E = HistError> = std::result::Result<T, E>;

/// Where an engine is in its push/hist cycle
///
/// `Empty → Accumulating → Ready → Accumulating → …`. Fits are only valid
/// from `Ready`, so stale results are never handed out after a push.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum HistState<T> {
    #[default]
    Empty,
    Accumulating,
    Ready(T),
}

impl<T> HistState<T> {
    /// The stored result, if the engine is `Ready`
    pub fn ready(&self) -> Option<&T> {
        match self {
            HistState::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Same as [`ready`](Self::ready) but fails with [`HistError::FitNotReady`]
    pub fn require(&self) -> Result<&T> {
        self.ready().ok_or(HistError::FitNotReady)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, HistState::Ready(_))
    }
}

/// Anything that accepts aligned multi-axis samples
///
/// `data` holds one slice per axis; `weights` holds one slice per weight
/// series the sink carries (none for a plain histogram). A push either
/// succeeds completely or leaves the sink untouched.
pub trait SampleSink {
    /// Append a batch of samples
    fn push_batch(&mut self, data: &[&[f64]], weights: &[&[f64]]) -> Result<()>;

    /// Number of samples currently held on every axis
    fn current_length(&self) -> usize;

    /// Maximum number of samples retained per axis
    fn capacity(&self) -> usize;

    /// Number of data axes
    fn axis_count(&self) -> usize;

    /// Number of weight series expected by [`push_batch`](Self::push_batch)
    fn weight_series(&self) -> usize {
        0
    }

    /// Check if the sink holds no samples
    fn is_empty(&self) -> bool {
        self.current_length() == 0
    }

    /// Check if the window is saturated and the next push evicts
    fn is_full(&self) -> bool {
        self.current_length() >= self.capacity()
    }
}

/// Engines that bin their current window on demand
pub trait Histogrammable {
    /// The snapshot produced by one binning pass
    type Output: Clone + Debug;

    /// Bin the current window
    ///
    /// `bins = None` falls back to the specification fixed at construction.
    /// Fails with [`HistError::InsufficientData`] before doing any work when
    /// the window is shorter than `minimum_required`.
    fn hist(&mut self, bins: Option<&BinSpec>, density: bool) -> Result<Self::Output>;

    /// The result of the last successful `hist()`, unless a push happened since
    fn latest(&self) -> Option<&Self::Output>;
}

/// Engines that can fit a curve to their last histogram
pub trait Fittable {
    /// Fit output; transmission engines return one fit per height array
    type Fit: Clone + Debug;

    /// Fit the given model to the histogram computed by the last `hist()`
    fn fit(&self, fit_type: FitType) -> Result<Self::Fit>;

    fn gaussian_fit(&self) -> Result<Self::Fit> {
        self.fit(FitType::Gaussian)
    }

    fn poly_fit(&self) -> Result<Self::Fit> {
        self.fit(FitType::Poly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(HistError::InsufficientData {
            required: 3,
            found: 1
        }
        .is_recoverable());
        assert!(HistError::FitDivergence("stalled".into()).is_recoverable());
        assert!(!HistError::FitNotReady.is_recoverable());
        assert!(!HistError::AxisCountMismatch {
            expected: 2,
            found: 1
        }
        .is_recoverable());
    }

    #[test]
    fn test_state_require() {
        let empty: HistState<u32> = HistState::Empty;
        assert!(matches!(empty.require(), Err(HistError::FitNotReady)));

        let accumulating: HistState<u32> = HistState::Accumulating;
        assert!(accumulating.ready().is_none());

        let ready = HistState::Ready(7);
        assert_eq!(*ready.require().unwrap(), 7);
        assert!(ready.is_ready());
    }

    #[test]
    fn test_error_display() {
        let err = HistError::AxisWeightLengthMismatch {
            axis: 0,
            data: 5,
            weights: 4,
        };
        assert_eq!(
            err.to_string(),
            "axis 0 has 5 values but 4 weights were supplied"
        );

        let err = HistError::WeightSeriesMismatch {
            expected: 2,
            found: 1,
        };
        assert_eq!(err.to_string(), "weight series mismatch: sink takes 2, found 1");
    }
}
