//! Transmission (fractional yield) histograms
//!
//! A transmission engine bins the same incoming samples twice: once as an
//! incident population and once weighted by what survived to the outgoing
//! measurement. The per-bin ratio is the fractional yield.
//!
//! Both histograms always use the same edges. The incident pass resolves
//! them and the outgoing pass is handed those exact edges. The inner
//! engines are only reachable through shared references, so the outgoing
//! histogram cannot be rebinned independently.
//!
//! # Example
//!
//! ```
//! use rapidhist::histogram::BinSpec;
//! use rapidhist::transmission::TransmissionHistogrammer;
//! use rapidhist::traits::Histogrammable;
//!
//! let mut trans = TransmissionHistogrammer::new(5, 1)
//!     .with_minimum(Some(3))
//!     .with_bins(BinSpec::edges([vec![0.0, 1.0, 2.0, 3.0, 4.0]]));
//!
//! // Bin each hit falls into, and the power it carried out
//! trans.push(&[[1.0, 1.0, 1.0, 2.0, 3.0]], &[3.0, 8.0, 1.0, 2.0, 4.0]).unwrap();
//!
//! let result = trans.hist(None, false).unwrap();
//! assert_eq!(result.fractional_yield.as_slice().unwrap(), &[0.0, 4.0, 2.0, 4.0]);
//! ```

mod single;
mod triple;

pub use single::TransmissionHistogrammer;
pub use triple::WeightedTransmissionHistogrammer;

use ndarray::{ArrayD, Zip};

use crate::fit::{CurveFitter, FitResult, FitType};
use crate::histogram::{BinEdges, HistogramResult};
use crate::traits::{HistError, Result};

/// Incident, outgoing and yield heights over one shared set of edges
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransmissionResult {
    /// Incident population (hit counts, or incident weight sums)
    pub incident: ArrayD<f64>,
    /// Outgoing weight sums
    pub outgoing: ArrayD<f64>,
    /// `outgoing / incident`, zero wherever that is undefined
    pub fractional_yield: ArrayD<f64>,
    /// Bins with no incident population but a nonzero outgoing sum
    ///
    /// Their yield is reported as zero; the flag keeps the anomaly visible.
    pub anomalous: ArrayD<bool>,
    /// Unweighted hit counts, when the incident side is itself weighted
    pub hits: Option<ArrayD<f64>>,
    pub edges: BinEdges,
    pub density: bool,
}

impl TransmissionResult {
    pub(crate) fn compose(
        incident: HistogramResult,
        outgoing: HistogramResult,
        hits: Option<HistogramResult>,
    ) -> Self {
        debug_assert_eq!(incident.edges, outgoing.edges);
        let (fractional_yield, anomalous) = fractional_yield(&incident.heights, &outgoing.heights);
        let flagged = anomalous.iter().filter(|&&a| a).count();
        if flagged > 0 {
            tracing::debug!(flagged, "bins with outgoing signal but no incident population");
        }

        Self {
            fractional_yield,
            anomalous,
            hits: hits.map(|h| h.heights),
            density: incident.density,
            edges: incident.edges,
            incident: incident.heights,
            outgoing: outgoing.heights,
        }
    }

    pub fn axis_count(&self) -> usize {
        self.edges.axis_count()
    }

    /// Number of bins flagged in [`anomalous`](Self::anomalous)
    pub fn anomalous_count(&self) -> usize {
        self.anomalous.iter().filter(|&&a| a).count()
    }

    /// The incident heights as a standalone histogram
    pub fn incident_hist(&self) -> HistogramResult {
        self.as_hist(&self.incident)
    }

    pub fn outgoing_hist(&self) -> HistogramResult {
        self.as_hist(&self.outgoing)
    }

    pub fn yield_hist(&self) -> HistogramResult {
        self.as_hist(&self.fractional_yield)
    }

    fn as_hist(&self, heights: &ArrayD<f64>) -> HistogramResult {
        HistogramResult {
            heights: heights.clone(),
            edges: self.edges.clone(),
            density: self.density,
        }
    }
}

/// One fit per height array, all against the same bin centers
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransmissionFit {
    pub incident: FitResult,
    pub outgoing: FitResult,
    pub fractional_yield: FitResult,
}

/// Per-bin `outgoing / incident`, clamped to zero where it is not finite
///
/// Also returns the mask of bins where incident is zero but outgoing is not.
pub fn fractional_yield(incident: &ArrayD<f64>, outgoing: &ArrayD<f64>) -> (ArrayD<f64>, ArrayD<bool>) {
    let ratio = Zip::from(incident).and(outgoing).map_collect(|&inc, &out| {
        if inc == 0.0 {
            return 0.0;
        }
        let r = out / inc;
        if r.is_finite() {
            r
        } else {
            0.0
        }
    });
    let anomalous = Zip::from(incident)
        .and(outgoing)
        .map_collect(|&inc, &out| inc == 0.0 && out != 0.0);
    (ratio, anomalous)
}

/// Fit incident, outgoing and yield heights from one result
pub(crate) fn fit_all(fitter: &CurveFitter, result: &TransmissionResult, fit_type: FitType) -> Result<TransmissionFit> {
    let centers = match result.axis_count() {
        1 => result.edges.centers(0).unwrap_or_default(),
        axes => return Err(HistError::FitDimension { axes }),
    };
    let model = fitter.model(fit_type);
    let fit_one = |heights: &ArrayD<f64>| {
        let heights: Vec<f64> = heights.iter().copied().collect();
        fitter.fit(model, &centers, &heights)
    };

    Ok(TransmissionFit {
        incident: fit_one(&result.incident)?,
        outgoing: fit_one(&result.outgoing)?,
        fractional_yield: fit_one(&result.fractional_yield)?,
    })
}
