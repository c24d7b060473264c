//! Count-based transmission: hits in, weighted signal out

use super::{fit_all, TransmissionFit, TransmissionResult};
use crate::fit::{CurveFitter, FitType};
use crate::histogram::{BinSpec, Histogrammer, WeightedHistogrammer};
use crate::traits::{Fittable, HistError, HistState, Histogrammable, Result, SampleSink};

/// Incident hit counts paired with an outgoing weighted histogram
///
/// Every sample is pushed to both sides at once: the incident side counts it,
/// the outgoing side sums its weight.
#[derive(Clone, Debug)]
pub struct TransmissionHistogrammer {
    incident: Histogrammer,
    outgoing: WeightedHistogrammer,
    bins: Option<BinSpec>,
    fitter: CurveFitter,
    state: HistState<TransmissionResult>,
}

impl TransmissionHistogrammer {
    /// # Panics
    ///
    /// Panics if `capacity` or `axis_count` is zero.
    pub fn new(capacity: usize, axis_count: usize) -> Self {
        Self {
            incident: Histogrammer::new(capacity, axis_count),
            outgoing: WeightedHistogrammer::new(capacity, axis_count),
            bins: None,
            fitter: CurveFitter::default(),
            state: HistState::Empty,
        }
    }

    #[cfg(feature = "config")]
    pub fn from_config(config: &crate::config::MonitorConfig, axis_count: usize) -> Result<Self> {
        config.validate()?;
        let mut trans = Self::new(config.capacity, axis_count)
            .with_minimum(config.minimum_required)
            .with_fitter(config.fitter());
        trans.bins = config.bins.clone();
        Ok(trans)
    }

    /// Refuse to histogram while the incident window is shorter than `minimum`
    pub fn with_minimum(mut self, minimum: Option<usize>) -> Self {
        self.incident = self.incident.with_minimum(minimum);
        self.outgoing = self.outgoing.with_minimum(minimum);
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

    /// Append samples with the outgoing weight each one carried
    ///
    /// Both sides are validated before either is touched, so a rejected push
    /// leaves incident and outgoing windows aligned.
    pub fn push<S: AsRef<[f64]>>(&mut self, data: &[S], weights: &[f64]) -> Result<()> {
        let axes: Vec<&[f64]> = data.iter().map(AsRef::as_ref).collect();
        self.outgoing.validate(&axes, weights)?;
        let len = self.incident.validate(&axes)?;
        self.append(&axes, weights, len);
        Ok(())
    }

    pub fn push_point(&mut self, point: &[f64], weight: f64) -> Result<()> {
        let axes: Vec<&[f64]> = point.iter().map(std::slice::from_ref).collect();
        self.push(&axes, &[weight])
    }

    fn append(&mut self, data: &[&[f64]], weights: &[f64], len: usize) {
        if len == 0 {
            return;
        }
        self.incident.append(data, len);
        self.outgoing.append(data, weights);
        self.state = HistState::Accumulating;
    }

    /// The incident (count) engine
    pub fn incident(&self) -> &Histogrammer {
        &self.incident
    }

    /// The outgoing (weighted) engine
    pub fn outgoing(&self) -> &WeightedHistogrammer {
        &self.outgoing
    }

    pub fn bins(&self) -> Option<&BinSpec> {
        self.bins.as_ref()
    }

    pub fn state(&self) -> &HistState<TransmissionResult> {
        &self.state
    }

    pub fn snapshot(&self) -> Vec<Vec<f64>> {
        self.incident.snapshot()
    }

    pub fn weights_snapshot(&self) -> Vec<f64> {
        self.outgoing.weights_snapshot()
    }

    pub fn current_length(&self) -> usize {
        self.incident.current_length()
    }
}

impl SampleSink for TransmissionHistogrammer {
    fn push_batch(&mut self, data: &[&[f64]], weights: &[&[f64]]) -> Result<()> {
        let [series] = weights else {
            return Err(HistError::WeightSeriesMismatch {
                expected: 1,
                found: weights.len(),
            });
        };
        self.push(data, series)
    }

    fn current_length(&self) -> usize {
        self.incident.current_length()
    }

    fn capacity(&self) -> usize {
        self.incident.buffer().capacity()
    }

    fn axis_count(&self) -> usize {
        self.incident.buffer().axis_count()
    }

    fn weight_series(&self) -> usize {
        1
    }
}

impl Histogrammable for TransmissionHistogrammer {
    type Output = TransmissionResult;

    fn hist(&mut self, bins: Option<&BinSpec>, density: bool) -> Result<TransmissionResult> {
        self.incident.buffer().ensure_minimum()?;
        let edges = self.incident.resolve_bins(bins.or(self.bins.as_ref()))?;

        let incident = self.incident.hist_on(&edges, density);
        let outgoing = self.outgoing.hist_on(&edges, density);
        let result = TransmissionResult::compose(incident, outgoing, None);
        self.state = HistState::Ready(result.clone());
        Ok(result)
    }

    fn latest(&self) -> Option<&TransmissionResult> {
        self.state.ready()
    }
}

impl Fittable for TransmissionHistogrammer {
    type Fit = TransmissionFit;

    fn fit(&self, fit_type: FitType) -> Result<TransmissionFit> {
        let result = self.state.require()?;
        fit_all(&self.fitter, result, fit_type)
    }
}
