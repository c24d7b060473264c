//! Count histogram over a sliding window

use super::bins::resolve_requested;
use super::{bin_samples, BinEdges, BinSpec, HistogramResult};
use crate::buffer::SlidingSampleBuffer;
use crate::fit::{CurveFitter, FitResult, FitType};
use crate::traits::{Fittable, HistState, Histogrammable, Result, SampleSink};

/// Rapidly regenerated histogram of the most recent samples
///
/// Pushing is cheap; binning happens only when `hist()` is called, against
/// whatever the window holds at that moment.
///
/// # Example
///
/// ```
/// use rapidhist::histogram::{BinSpec, Histogrammer};
/// use rapidhist::traits::{Fittable, Histogrammable};
///
/// let mut hist = Histogrammer::new(1000, 1);
/// let samples: Vec<f64> = (0..500).map(|i| ((i * 37) % 101) as f64 / 10.0).collect();
/// hist.push(&[samples]).unwrap();
///
/// // A fit needs a fresh histogram first
/// assert!(hist.gaussian_fit().is_err());
///
/// let result = hist.hist(Some(&BinSpec::Count(20)), false).unwrap();
/// assert_eq!(result.heights.len(), 20);
/// assert_eq!(result.total(), 500.0);
/// ```
#[derive(Clone, Debug)]
pub struct Histogrammer {
    buffer: SlidingSampleBuffer,
    /// Binning used when `hist()` is called without one
    bins: Option<BinSpec>,
    fitter: CurveFitter,
    state: HistState<HistogramResult>,
}

impl Histogrammer {
    /// Create a histogram over a window of `capacity` samples on `axis_count` axes
    ///
    /// # Panics
    ///
    /// Panics if `capacity` or `axis_count` is zero.
    pub fn new(capacity: usize, axis_count: usize) -> Self {
        Self {
            buffer: SlidingSampleBuffer::new(capacity, axis_count),
            bins: None,
            fitter: CurveFitter::default(),
            state: HistState::Empty,
        }
    }

    /// Build from a monitor configuration
    #[cfg(feature = "config")]
    pub fn from_config(config: &crate::config::MonitorConfig, axis_count: usize) -> Result<Self> {
        config.validate()?;
        let mut hist = Self::new(config.capacity, axis_count)
            .with_minimum(config.minimum_required)
            .with_fitter(config.fitter());
        hist.bins = config.bins.clone();
        Ok(hist)
    }

    /// Refuse to histogram windows shorter than `minimum`
    pub fn with_minimum(mut self, minimum: Option<usize>) -> Self {
        self.buffer = self.buffer.with_minimum(minimum);
        self
    }

    /// Default binning for calls that pass `bins = None`
    pub fn with_bins(mut self, bins: BinSpec) -> Self {
        self.bins = Some(bins);
        self
    }

    pub fn with_fitter(mut self, fitter: CurveFitter) -> Self {
        self.fitter = fitter;
        self
    }

    /// Append one batch of values per axis
    pub fn push<S: AsRef<[f64]>>(&mut self, data: &[S]) -> Result<()> {
        let axes: Vec<&[f64]> = data.iter().map(AsRef::as_ref).collect();
        let len = self.buffer.validate(&axes)?;
        self.append(&axes, len);
        Ok(())
    }

    /// Append a single sample given as one scalar per axis
    pub fn push_point(&mut self, point: &[f64]) -> Result<()> {
        self.buffer.push_point(point)?;
        self.invalidate();
        Ok(())
    }

    pub(crate) fn validate(&self, data: &[&[f64]]) -> Result<usize> {
        self.buffer.validate(data)
    }

    pub(crate) fn append(&mut self, data: &[&[f64]], len: usize) {
        if len == 0 {
            return;
        }
        self.buffer.append(data, len);
        self.invalidate();
    }

    fn invalidate(&mut self) {
        if self.state.is_ready() {
            tracing::trace!("histogram invalidated by push");
        }
        self.state = HistState::Accumulating;
    }

    /// Bin the current window into edges chosen elsewhere
    ///
    /// The minimum-length check is the caller's responsibility.
    pub(crate) fn hist_on(&mut self, edges: &BinEdges, density: bool) -> HistogramResult {
        let result = bin_samples(self.buffer.axes(), None, edges, density);
        self.state = HistState::Ready(result.clone());
        result
    }

    /// Resolve `bins` (or the default) against the current window
    pub(crate) fn resolve_bins(&self, bins: Option<&BinSpec>) -> Result<BinEdges> {
        resolve_requested(bins, self.bins.as_ref(), self.buffer.axes())
    }

    /// Get the sample window
    pub fn buffer(&self) -> &SlidingSampleBuffer {
        &self.buffer
    }

    /// Get the default binning
    pub fn bins(&self) -> Option<&BinSpec> {
        self.bins.as_ref()
    }

    pub fn fitter(&self) -> &CurveFitter {
        &self.fitter
    }

    pub fn state(&self) -> &HistState<HistogramResult> {
        &self.state
    }

    /// Copy of every axis, oldest first
    pub fn snapshot(&self) -> Vec<Vec<f64>> {
        self.buffer.snapshot()
    }

    pub fn current_length(&self) -> usize {
        self.buffer.current_length()
    }
}

impl SampleSink for Histogrammer {
    fn push_batch(&mut self, data: &[&[f64]], weights: &[&[f64]]) -> Result<()> {
        if !weights.is_empty() {
            return Err(crate::traits::HistError::WeightSeriesMismatch {
                expected: 0,
                found: weights.len(),
            });
        }
        let len = self.validate(data)?;
        self.append(data, len);
        Ok(())
    }

    fn current_length(&self) -> usize {
        self.buffer.current_length()
    }

    fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    fn axis_count(&self) -> usize {
        self.buffer.axis_count()
    }
}

impl Histogrammable for Histogrammer {
    type Output = HistogramResult;

    fn hist(&mut self, bins: Option<&BinSpec>, density: bool) -> Result<HistogramResult> {
        self.buffer.ensure_minimum()?;
        let edges = self.resolve_bins(bins)?;
        Ok(self.hist_on(&edges, density))
    }

    fn latest(&self) -> Option<&HistogramResult> {
        self.state.ready()
    }
}

impl Fittable for Histogrammer {
    type Fit = FitResult;

    fn fit(&self, fit_type: FitType) -> Result<FitResult> {
        let result = self.state.require()?;
        self.fitter.fit_histogram(result, fit_type)
    }
}
