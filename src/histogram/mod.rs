//! On-demand histograms over sliding windows
//!
//! This module provides the binning engines: [`Histogrammer`] counts
//! samples, [`WeightedHistogrammer`] sums one weight per sample. Both bin
//! the window's current contents on every `hist()` call and keep the
//! result until the next push, which is what their fits run against.
//!
//! # Example
//!
//! ```
//! use rapidhist::histogram::{BinSpec, Histogrammer};
//! use rapidhist::traits::Histogrammable;
//!
//! let mut hist = Histogrammer::new(5, 1)
//!     .with_minimum(Some(3))
//!     .with_bins(BinSpec::edges([vec![0.0, 1.0, 2.0, 3.0, 4.0]]));
//!
//! let values: Vec<f64> = (0..30).map(|i| (i % 3) as f64).collect();
//! hist.push(&[values]).unwrap();
//!
//! let result = hist.hist(None, false).unwrap();
//! assert_eq!(result.heights_1d().unwrap(), vec![1.0, 2.0, 2.0, 0.0]);
//! ```

mod bins;
mod rapid;
mod result;
mod weighted;

pub use bins::{AxisBins, BinEdges, BinSpec, DEFAULT_BIN_COUNT, MAX_TOTAL_BINS};
pub use rapid::Histogrammer;
pub use result::{HistogramResult, QuadBoxes};
pub use weighted::WeightedHistogrammer;

use std::collections::VecDeque;

use ndarray::{ArrayD, IxDyn};

/// Bin every aligned sample of `axes` into `edges`
///
/// Each sample contributes its weight, or 1 without weights. Samples that
/// fall outside the edges on any axis are dropped from every axis.
pub(crate) fn bin_samples(
    axes: &[VecDeque<f64>],
    weights: Option<&VecDeque<f64>>,
    edges: &BinEdges,
    density: bool,
) -> HistogramResult {
    let mut heights = ArrayD::<f64>::zeros(IxDyn(&edges.shape()));
    let samples = axes.first().map_or(0, VecDeque::len);
    let mut index = vec![0usize; axes.len()];
    let mut dropped = 0usize;

    'samples: for i in 0..samples {
        for (axis, values) in axes.iter().enumerate() {
            match edges.locate(axis, values[i]) {
                Some(bin) => index[axis] = bin,
                None => {
                    dropped += 1;
                    continue 'samples;
                }
            }
        }
        let weight = weights.map_or(1.0, |w| w[i]);
        heights[index.as_slice()] += weight;
    }

    if density {
        normalize_density(&mut heights, edges);
    }

    tracing::trace!(samples, dropped, shape = ?edges.shape(), density, "binned window");

    HistogramResult {
        heights,
        edges: edges.clone(),
        density,
    }
}

/// Divide by the total and by each cell's volume
///
/// Empty histograms and zero-volume cells stay at zero instead of turning
/// into NaN.
fn normalize_density(heights: &mut ArrayD<f64>, edges: &BinEdges) {
    let total = heights.sum();
    if total == 0.0 {
        return;
    }
    let widths: Vec<Vec<f64>> = edges
        .axes()
        .iter()
        .map(|e| e.windows(2).map(|w| w[1] - w[0]).collect())
        .collect();

    for (cell, height) in heights.indexed_iter_mut() {
        let volume: f64 = (0..widths.len()).map(|axis| widths[axis][cell[axis]]).product();
        *height = if volume > 0.0 {
            *height / (total * volume)
        } else {
            0.0
        };
    }
}
