//! Weighted histogram over a sliding window

use super::bins::resolve_requested;
use super::{bin_samples, BinEdges, BinSpec, HistogramResult};
use crate::buffer::WeightedBuffer;
use crate::fit::{CurveFitter, FitResult, FitType};
use crate::traits::{Fittable, HistState, Histogrammable, Result, SampleSink};

/// Histogram where every sample contributes its weight instead of a unit count
///
/// # Example
///
/// ```
/// use rapidhist::histogram::{BinSpec, WeightedHistogrammer};
/// use rapidhist::traits::Histogrammable;
///
/// let mut hist = WeightedHistogrammer::new(5, 1)
///     .with_bins(BinSpec::edges([vec![0.0, 1.0, 2.0, 3.0, 4.0]]));
///
/// hist.push(&[[1.0, 1.0, 1.0, 2.0, 3.0]], &[3.0, 8.0, 1.0, 2.0, 4.0]).unwrap();
///
/// let result = hist.hist(None, false).unwrap();
/// assert_eq!(result.heights_1d().unwrap(), vec![0.0, 12.0, 2.0, 4.0]);
/// ```
#[derive(Clone, Debug)]
pub struct WeightedHistogrammer {
    buffer: WeightedBuffer,
    bins: Option<BinSpec>,
    fitter: CurveFitter,
    state: HistState<HistogramResult>,
}

impl WeightedHistogrammer {
    /// Create a weighted histogram over `capacity` samples on `axis_count` axes
    ///
    /// # Panics
    ///
    /// Panics if `capacity` or `axis_count` is zero.
    pub fn new(capacity: usize, axis_count: usize) -> Self {
        Self {
            buffer: WeightedBuffer::new(capacity, axis_count),
            bins: None,
            fitter: CurveFitter::default(),
            state: HistState::Empty,
        }
    }

    #[cfg(feature = "config")]
    pub fn from_config(config: &crate::config::MonitorConfig, axis_count: usize) -> Result<Self> {
        config.validate()?;
        let mut hist = Self::new(config.capacity, axis_count)
            .with_minimum(config.minimum_required)
            .with_fitter(config.fitter());
        hist.bins = config.bins.clone();
        Ok(hist)
    }

    /// Refuse to histogram windows whose data axes are shorter than `minimum`
    pub fn with_minimum(mut self, minimum: Option<usize>) -> Self {
        self.buffer = self.buffer.with_minimum(minimum);
        self
    }

    pub fn with_bins(mut self, bins: BinSpec) -> Self {
        self.bins = Some(bins);
        self
    }

    pub fn with_fitter(mut self, fitter: CurveFitter) -> Self {
        self.fitter = fitter;
        self
    }

    /// Append samples and weights atomically
    ///
    /// Every data axis must carry exactly `weights.len()` values; otherwise
    /// the push fails and neither store changes.
    pub fn push<S: AsRef<[f64]>>(&mut self, data: &[S], weights: &[f64]) -> Result<()> {
        let axes: Vec<&[f64]> = data.iter().map(AsRef::as_ref).collect();
        self.validate(&axes, weights)?;
        self.append(&axes, weights);
        Ok(())
    }

    /// Append one weighted sample given as one scalar per axis
    pub fn push_point(&mut self, point: &[f64], weight: f64) -> Result<()> {
        self.buffer.push_point(point, weight)?;
        self.state = HistState::Accumulating;
        Ok(())
    }

    pub(crate) fn validate(&self, data: &[&[f64]], weights: &[f64]) -> Result<()> {
        self.buffer.validate(data, weights)
    }

    pub(crate) fn append(&mut self, data: &[&[f64]], weights: &[f64]) {
        if weights.is_empty() {
            return;
        }
        self.buffer.append(data, weights);
        self.state = HistState::Accumulating;
    }

    /// Bin the current window into edges chosen elsewhere
    pub(crate) fn hist_on(&mut self, edges: &BinEdges, density: bool) -> HistogramResult {
        let data = self.buffer.data();
        let result = bin_samples(data.axes(), Some(self.buffer.weights()), edges, density);
        self.state = HistState::Ready(result.clone());
        result
    }

    pub fn buffer(&self) -> &WeightedBuffer {
        &self.buffer
    }

    pub fn bins(&self) -> Option<&BinSpec> {
        self.bins.as_ref()
    }

    pub fn state(&self) -> &HistState<HistogramResult> {
        &self.state
    }

    /// Copy of every data axis, oldest first
    pub fn snapshot(&self) -> Vec<Vec<f64>> {
        self.buffer.snapshot()
    }

    /// Copy of the weight series, oldest first
    pub fn weights_snapshot(&self) -> Vec<f64> {
        self.buffer.weights_snapshot()
    }

    pub fn current_length(&self) -> usize {
        self.buffer.current_length()
    }
}

impl SampleSink for WeightedHistogrammer {
    fn push_batch(&mut self, data: &[&[f64]], weights: &[&[f64]]) -> Result<()> {
        let [series] = weights else {
            return Err(crate::traits::HistError::WeightSeriesMismatch {
                expected: 1,
                found: weights.len(),
            });
        };
        self.validate(data, series)?;
        self.append(data, series);
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

    fn weight_series(&self) -> usize {
        1
    }
}

impl Histogrammable for WeightedHistogrammer {
    type Output = HistogramResult;

    fn hist(&mut self, bins: Option<&BinSpec>, density: bool) -> Result<HistogramResult> {
        self.buffer.ensure_minimum()?;
        let edges = resolve_requested(bins, self.bins.as_ref(), self.buffer.data().axes())?;
        Ok(self.hist_on(&edges, density))
    }

    fn latest(&self) -> Option<&HistogramResult> {
        self.state.ready()
    }
}

impl Fittable for WeightedHistogrammer {
    type Fit = FitResult;

    fn fit(&self, fit_type: FitType) -> Result<FitResult> {
        let result = self.state.require()?;
        self.fitter.fit_histogram(result, fit_type)
    }
}
