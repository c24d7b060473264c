//! Sliding window with one weight per sample
//!
//! The weight series is a bounded FIFO of the same capacity as the data
//! axes, so evictions keep it aligned sample for sample.

use std::collections::VecDeque;

use super::{extend_window, SlidingSampleBuffer};
use crate::traits::{HistError, Result, SampleSink};

/// Multi-axis sliding window paired with a weight series
///
/// # Example
///
/// ```
/// use rapidhist::buffer::WeightedBuffer;
///
/// let mut buffer = WeightedBuffer::new(4, 1);
/// buffer.push(&[[1.0, 2.0]], &[0.5, 0.25]).unwrap();
///
/// // Mismatched lengths are rejected without touching either store
/// assert!(buffer.push(&[[3.0, 4.0]], &[1.0]).is_err());
/// assert_eq!(buffer.current_length(), 2);
/// assert_eq!(buffer.weights_snapshot(), vec![0.5, 0.25]);
/// ```
#[derive(Clone, Debug)]
pub struct WeightedBuffer {
    data: SlidingSampleBuffer,
    weights: VecDeque<f64>,
}

impl WeightedBuffer {
    /// Create a weighted window of `capacity` samples over `axis_count` axes
    ///
    /// # Panics
    ///
    /// Panics if `capacity` or `axis_count` is zero.
    pub fn new(capacity: usize, axis_count: usize) -> Self {
        Self {
            data: SlidingSampleBuffer::new(capacity, axis_count),
            weights: VecDeque::with_capacity(capacity),
        }
    }

    /// Require at least `minimum` samples on the data axes before histogramming
    pub fn with_minimum(mut self, minimum: Option<usize>) -> Self {
        self.data = self.data.with_minimum(minimum);
        self
    }

    /// Append samples and their weights atomically
    ///
    /// Every data axis must hold exactly `weights.len()` values.
    pub fn push<S: AsRef<[f64]>>(&mut self, data: &[S], weights: &[f64]) -> Result<()> {
        let axes: Vec<&[f64]> = data.iter().map(AsRef::as_ref).collect();
        self.validate(&axes, weights)?;
        self.append(&axes, weights);
        Ok(())
    }

    /// Append a single weighted sample given as one scalar per axis
    pub fn push_point(&mut self, point: &[f64], weight: f64) -> Result<()> {
        self.data.push_point(point)?;
        extend_window(&mut self.weights, &[weight], self.data.capacity());
        Ok(())
    }

    pub(crate) fn validate(&self, data: &[&[f64]], weights: &[f64]) -> Result<()> {
        if data.len() != self.data.axis_count() {
            return Err(HistError::AxisCountMismatch {
                expected: self.data.axis_count(),
                found: data.len(),
            });
        }
        for (axis, values) in data.iter().enumerate() {
            if values.len() != weights.len() {
                return Err(HistError::AxisWeightLengthMismatch {
                    axis,
                    data: values.len(),
                    weights: weights.len(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn append(&mut self, data: &[&[f64]], weights: &[f64]) {
        self.data.append(data, weights.len());
        extend_window(&mut self.weights, weights, self.data.capacity());
        debug_assert_eq!(self.weights.len(), self.data.current_length());
    }

    /// Get the underlying data window
    pub fn data(&self) -> &SlidingSampleBuffer {
        &self.data
    }

    /// Weight series, oldest first
    pub fn weights(&self) -> &VecDeque<f64> {
        &self.weights
    }

    /// Copy of the weight series, oldest first
    pub fn weights_snapshot(&self) -> Vec<f64> {
        self.weights.iter().copied().collect()
    }

    /// Copy of every data axis, oldest first
    pub fn snapshot(&self) -> Vec<Vec<f64>> {
        self.data.snapshot()
    }

    pub fn ensure_minimum(&self) -> Result<()> {
        self.data.ensure_minimum()
    }

    pub fn current_length(&self) -> usize {
        self.data.current_length()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn axis_count(&self) -> usize {
        self.data.axis_count()
    }
}

impl SampleSink for WeightedBuffer {
    fn push_batch(&mut self, data: &[&[f64]], weights: &[&[f64]]) -> Result<()> {
        let [series] = weights else {
            return Err(HistError::WeightSeriesMismatch {
                expected: 1,
                found: weights.len(),
            });
        };
        self.validate(data, series)?;
        self.append(data, series);
        Ok(())
    }

    fn current_length(&self) -> usize {
        self.data.current_length()
    }

    fn capacity(&self) -> usize {
        self.data.capacity()
    }

    fn axis_count(&self) -> usize {
        self.data.axis_count()
    }

    fn weight_series(&self) -> usize {
        1
    }
}
