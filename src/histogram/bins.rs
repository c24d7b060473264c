//! Bin specifications and resolved bin edges
//!
//! A [`BinSpec`] is what callers ask for; [`BinEdges`] is what a binning
//! pass actually used. Count-based axes are resolved against the data in
//! the window at the time of the call, the same way numpy's `histogramdd`
//! does it.

use std::collections::VecDeque;

use crate::traits::{HistError, Result};

/// Bin count used when neither the call nor the engine names a specification
pub const DEFAULT_BIN_COUNT: usize = 10;

/// Largest number of cells a histogram may have across all axes
pub const MAX_TOTAL_BINS: usize = 1 << 24;

/// Binning for a single axis
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
pub enum AxisBins {
    /// Uniform bins spanning the data range on this axis
    Count(usize),
    /// Explicit, non-decreasing bin boundaries
    Edges(Vec<f64>),
}

/// Binning request for a whole histogram
///
/// # Example
///
/// ```
/// use rapidhist::histogram::{AxisBins, BinSpec};
///
/// // Ten uniform bins on every axis
/// let uniform = BinSpec::Count(10);
///
/// // Fixed edges on the first axis, data-driven bins on the second
/// let mixed = BinSpec::PerAxis(vec![
///     AxisBins::Edges(vec![0.0, 1.0, 2.0]),
///     AxisBins::Count(4),
/// ]);
/// # let _ = (uniform, mixed);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
pub enum BinSpec {
    /// The same number of uniform bins on every axis
    Count(usize),
    /// One entry per axis
    PerAxis(Vec<AxisBins>),
}

impl BinSpec {
    /// Explicit edges for every axis
    pub fn edges<I, E>(axes: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Vec<f64>>,
    {
        BinSpec::PerAxis(
            axes.into_iter()
                .map(|edges| AxisBins::Edges(edges.into()))
                .collect(),
        )
    }

    /// Turn the request into concrete edges for the given window contents
    pub fn resolve(&self, axes: &[VecDeque<f64>]) -> Result<BinEdges> {
        let per_axis: Vec<AxisBins> = match self {
            BinSpec::Count(n) => vec![AxisBins::Count(*n); axes.len()],
            BinSpec::PerAxis(spec) => {
                if spec.len() != axes.len() {
                    return Err(HistError::InvalidBins(format!(
                        "{} axis specifications for {} axes",
                        spec.len(),
                        axes.len()
                    )));
                }
                spec.clone()
            }
        };

        let counts: Vec<usize> = per_axis
            .iter()
            .map(|spec| match spec {
                AxisBins::Count(n) => *n,
                AxisBins::Edges(edges) => edges.len().saturating_sub(1),
            })
            .collect();
        match counts.iter().try_fold(1usize, |total, &n| total.checked_mul(n)) {
            Some(total) if total <= MAX_TOTAL_BINS => {}
            _ => {
                return Err(HistError::InvalidBins(format!(
                    "{counts:?} bins exceed the limit of {MAX_TOTAL_BINS} cells"
                )))
            }
        }

        let edges = per_axis
            .into_iter()
            .zip(axes)
            .map(|(spec, values)| match spec {
                AxisBins::Count(0) => Err(HistError::InvalidBins(
                    "bin count must be positive".into(),
                )),
                AxisBins::Count(n) => {
                    let (lo, hi) = data_range(values);
                    Ok(linspace(lo, hi, n + 1))
                }
                AxisBins::Edges(edges) => {
                    check_edges(&edges)?;
                    Ok(edges)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(BinEdges(edges))
    }
}

impl From<usize> for BinSpec {
    fn from(n: usize) -> Self {
        BinSpec::Count(n)
    }
}

impl From<BinEdges> for BinSpec {
    fn from(edges: BinEdges) -> Self {
        BinSpec::edges(edges.0)
    }
}

/// Resolve the call's request, else the engine's default, else
/// [`DEFAULT_BIN_COUNT`] uniform bins per axis
pub(crate) fn resolve_requested(
    requested: Option<&BinSpec>,
    engine_default: Option<&BinSpec>,
    axes: &[VecDeque<f64>],
) -> Result<BinEdges> {
    match requested.or(engine_default) {
        Some(spec) => spec.resolve(axes),
        None => BinSpec::Count(DEFAULT_BIN_COUNT).resolve(axes),
    }
}

/// Finite `[min, max]` of an axis, widened like numpy for empty or constant data
fn data_range(values: &VecDeque<f64>) -> (f64, f64) {
    let (lo, hi) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    if lo > hi {
        (0.0, 1.0)
    } else if lo == hi {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    }
}

fn linspace(lo: f64, hi: f64, points: usize) -> Vec<f64> {
    let step = (hi - lo) / (points - 1) as f64;
    let mut edges: Vec<f64> = (0..points).map(|i| lo + step * i as f64).collect();
    // Pin the last edge so the max sample always lands in the closed last bin
    edges[points - 1] = hi;
    edges
}

fn check_edges(edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(HistError::InvalidBins(format!(
            "need at least 2 edges, found {}",
            edges.len()
        )));
    }
    if edges.iter().any(|e| !e.is_finite()) {
        return Err(HistError::InvalidBins("edges must be finite".into()));
    }
    if edges.windows(2).any(|pair| pair[1] < pair[0]) {
        return Err(HistError::InvalidBins(
            "edges must increase monotonically".into(),
        ));
    }
    Ok(())
}

/// Bin boundaries actually used by one binning pass, one sequence per axis
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinEdges(Vec<Vec<f64>>);

impl BinEdges {
    /// Validate explicit per-axis edges
    pub fn new(axes: Vec<Vec<f64>>) -> Result<Self> {
        if axes.is_empty() {
            return Err(HistError::InvalidBins("no axes".into()));
        }
        for edges in &axes {
            check_edges(edges)?;
        }
        Ok(Self(axes))
    }

    /// Number of axes
    pub fn axis_count(&self) -> usize {
        self.0.len()
    }

    /// Edges of one axis
    pub fn axis(&self, index: usize) -> Option<&[f64]> {
        self.0.get(index).map(Vec::as_slice)
    }

    /// All axes
    pub fn axes(&self) -> &[Vec<f64>] {
        &self.0
    }

    /// Number of bins on every axis
    pub fn shape(&self) -> Vec<usize> {
        self.0.iter().map(|edges| edges.len() - 1).collect()
    }

    /// Midpoints of consecutive edges on one axis
    pub fn centers(&self, index: usize) -> Option<Vec<f64>> {
        self.axis(index)
            .map(|edges| edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect())
    }

    /// Bin index of `value` on one axis
    ///
    /// Bins are half-open except the last, which includes its right edge.
    /// Out-of-range and non-finite values have no bin.
    pub fn locate(&self, axis: usize, value: f64) -> Option<usize> {
        let edges = &self.0[axis];
        let first = edges[0];
        let last = edges[edges.len() - 1];
        if !(value >= first && value <= last) {
            return None;
        }
        if value == last {
            return Some(edges.len() - 2);
        }
        Some(edges.partition_point(|&e| e <= value) - 1)
    }

    pub fn into_inner(self) -> Vec<Vec<f64>> {
        self.0
    }
}
