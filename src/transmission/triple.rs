//! Transmission where the incident side is itself weighted

use super::{fit_all, TransmissionFit, TransmissionResult};
use crate::fit::{CurveFitter, FitType};
use crate::histogram::{BinSpec, Histogrammer, WeightedHistogrammer};
use crate::traits::{Fittable, HistError, HistState, Histogrammable, Result, SampleSink};

/// Hit counts plus incident and outgoing weight sums over one window
///
/// The yield is `outgoing / incident` using the weighted incident sums; the
/// raw hit counts are carried along in [`TransmissionResult::hits`].
///
/// # Example
///
/// ```
/// use rapidhist::histogram::BinSpec;
/// use rapidhist::transmission::WeightedTransmissionHistogrammer;
/// use rapidhist::traits::Histogrammable;
///
/// let mut trans = WeightedTransmissionHistogrammer::new(8, 1)
///     .with_bins(BinSpec::edges([vec![0.0, 1.0, 2.0]]));
/// trans.push(&[[0.5, 0.5, 1.5]], &[2.0, 2.0, 4.0], &[1.0, 3.0, 1.0]).unwrap();
///
/// let result = trans.hist(None, false).unwrap();
/// assert_eq!(result.fractional_yield.as_slice().unwrap(), &[1.0, 0.25]);
/// assert_eq!(result.hits.unwrap().as_slice().unwrap(), &[2.0, 1.0]);
/// ```
#[derive(Clone, Debug)]
pub struct WeightedTransmissionHistogrammer {
    hits: Histogrammer,
    incident: WeightedHistogrammer,
    outgoing: WeightedHistogrammer,
    bins: Option<BinSpec>,
    fitter: CurveFitter,
    state: HistState<TransmissionResult>,
}

impl WeightedTransmissionHistogrammer {
    /// # Panics
    ///
    /// Panics if `capacity` or `axis_count` is zero.
    pub fn new(capacity: usize, axis_count: usize) -> Self {
        Self {
            hits: Histogrammer::new(capacity, axis_count),
            incident: WeightedHistogrammer::new(capacity, axis_count),
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

    pub fn with_minimum(mut self, minimum: Option<usize>) -> Self {
        self.hits = self.hits.with_minimum(minimum);
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

    /// Append samples with their incident and outgoing weights
    ///
    /// All three stores take the push or none of them do.
    pub fn push<S: AsRef<[f64]>>(
        &mut self,
        data: &[S],
        incident_weights: &[f64],
        outgoing_weights: &[f64],
    ) -> Result<()> {
        let axes: Vec<&[f64]> = data.iter().map(AsRef::as_ref).collect();
        self.incident.validate(&axes, incident_weights)?;
        self.outgoing.validate(&axes, outgoing_weights)?;
        let len = self.hits.validate(&axes)?;
        if len == 0 {
            return Ok(());
        }

        self.hits.append(&axes, len);
        self.incident.append(&axes, incident_weights);
        self.outgoing.append(&axes, outgoing_weights);
        self.state = HistState::Accumulating;
        Ok(())
    }

    pub fn push_point(&mut self, point: &[f64], incident_weight: f64, outgoing_weight: f64) -> Result<()> {
        let axes: Vec<&[f64]> = point.iter().map(std::slice::from_ref).collect();
        self.push(&axes, &[incident_weight], &[outgoing_weight])
    }

    /// The unweighted count engine
    pub fn hits(&self) -> &Histogrammer {
        &self.hits
    }

    pub fn incident(&self) -> &WeightedHistogrammer {
        &self.incident
    }

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
        self.hits.snapshot()
    }

    pub fn current_length(&self) -> usize {
        self.hits.current_length()
    }
}

impl SampleSink for WeightedTransmissionHistogrammer {
    /// `weights` is `[incident, outgoing]`
    fn push_batch(&mut self, data: &[&[f64]], weights: &[&[f64]]) -> Result<()> {
        let [incident, outgoing] = weights else {
            return Err(HistError::WeightSeriesMismatch {
                expected: 2,
                found: weights.len(),
            });
        };
        self.push(data, incident, outgoing)
    }

    fn current_length(&self) -> usize {
        self.hits.current_length()
    }

    fn capacity(&self) -> usize {
        self.hits.buffer().capacity()
    }

    fn axis_count(&self) -> usize {
        self.hits.buffer().axis_count()
    }

    fn weight_series(&self) -> usize {
        2
    }
}

impl Histogrammable for WeightedTransmissionHistogrammer {
    type Output = TransmissionResult;

    fn hist(&mut self, bins: Option<&BinSpec>, density: bool) -> Result<TransmissionResult> {
        self.hits.buffer().ensure_minimum()?;
        let edges = self.hits.resolve_bins(bins.or(self.bins.as_ref()))?;

        let hits = self.hits.hist_on(&edges, density);
        let incident = self.incident.hist_on(&edges, density);
        let outgoing = self.outgoing.hist_on(&edges, density);
        let result = TransmissionResult::compose(incident, outgoing, Some(hits));
        self.state = HistState::Ready(result.clone());
        Ok(result)
    }

    fn latest(&self) -> Option<&TransmissionResult> {
        self.state.ready()
    }
}

impl Fittable for WeightedTransmissionHistogrammer {
    type Fit = TransmissionFit;

    fn fit(&self, fit_type: FitType) -> Result<TransmissionFit> {
        let result = self.state.require()?;
        fit_all(&self.fitter, result, fit_type)
    }
}
